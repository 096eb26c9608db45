//! Run settings: defaults, optional TOML file, command-line overrides.

use crate::args::RenderArgs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use stepwise_core::comparison::ComparisonConfig;
use stepwise_core::equation_engine::{ExpressionField, ExpressionSolution};
use stepwise_core::region::Region;
use stepwise_core::solvers::Method;
use stepwise_core::trajectory::TraceLimits;
use stepwise_core::Point;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Right-hand side f(x, y).
    pub field: String,
    /// Closed-form solution y(x); empty disables deviation scoring.
    pub reference: String,
    pub params: BTreeMap<String, f64>,
    pub initial: [f64; 2],
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub methods: Vec<Method>,
    pub max_steps: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            field: "x^3*y^3 - x*y".to_string(),
            reference: "1/sqrt(x^2+1)".to_string(),
            params: BTreeMap::new(),
            initial: [0.0, 1.0],
            x_range: [0.0, 8.0],
            y_range: [-0.1, 2.0],
            methods: vec![Method::Euler, Method::Heun, Method::RungeKutta4],
            max_steps: TraceLimits::default().max_steps,
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Applies command-line overrides.
    pub fn apply(&mut self, args: &RenderArgs) {
        if let Some(x_min) = args.x_min {
            self.x_range[0] = x_min;
        }
        if let Some(x_max) = args.x_max {
            self.x_range[1] = x_max;
        }
        if let Some(y_min) = args.y_min {
            self.y_range[0] = y_min;
        }
        if let Some(y_max) = args.y_max {
            self.y_range[1] = y_max;
        }
        if let Some(methods) = &args.methods {
            self.methods = methods.clone();
        }
    }

    fn param_lists(&self) -> (Vec<String>, Vec<f64>) {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .unzip()
    }

    pub fn field(&self) -> Result<ExpressionField> {
        let (names, values) = self.param_lists();
        ExpressionField::new(&self.field, &names, &values)
            .with_context(|| format!("invalid field expression \"{}\"", self.field))
    }

    pub fn reference(&self) -> Result<Option<ExpressionSolution>> {
        if self.reference.trim().is_empty() {
            return Ok(None);
        }
        let (names, values) = self.param_lists();
        ExpressionSolution::new(&self.reference, &names, &values)
            .map(Some)
            .with_context(|| format!("invalid reference expression \"{}\"", self.reference))
    }

    /// Bounding region of the plot; traces stop when they leave it.
    pub fn region(&self) -> Result<Region> {
        let region = Region::new(self.x_range[0], self.x_range[1])
            .context("range arguments have to be ordered correctly")?;
        region
            .with_y(self.y_range[0], self.y_range[1])
            .context("range arguments have to be ordered correctly")
    }

    pub fn comparison(&self, step: f64) -> Result<ComparisonConfig> {
        let config = ComparisonConfig {
            initial: Point::new(self.initial[0], self.initial[1]),
            step: step.abs(),
            region: self.region()?,
            methods: self.methods.clone(),
            limits: TraceLimits {
                max_steps: self.max_steps,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn defaults_reproduce_the_cubic_problem() {
        let settings = Settings::default();
        let config = settings.comparison(-0.1).expect("config");
        assert_eq!(config.step, 0.1);
        assert_eq!(config.initial, Point::new(0.0, 1.0));
        assert_eq!(config.methods.len(), 3);
        assert!(settings.reference().expect("reference").is_some());
    }

    #[test]
    fn toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            field = "k*y"
            reference = "exp(k*x)"
            methods = ["heun", "runge_kutta_4_38"]
            x_range = [-1.0, 1.0]

            [params]
            k = -2.0
            "#,
        )
        .expect("settings");
        assert_eq!(settings.methods, vec![Method::Heun, Method::RungeKutta38]);
        assert_eq!(settings.y_range, [-0.1, 2.0]);

        let field = settings.field().expect("field");
        assert_eq!(field.source(), "k*y");
        let config = settings.comparison(0.5).expect("config");
        assert_eq!(config.region.x.min(), -1.0);
    }

    #[test]
    fn command_line_wins_over_file() {
        let mut settings = Settings::default();
        settings.apply(&RenderArgs {
            step: 0.1,
            x_min: Some(-8.0),
            methods: Some(vec![Method::RungeKutta5]),
            ..RenderArgs::default()
        });
        assert_eq!(settings.x_range, [-8.0, 8.0]);
        assert_eq!(settings.methods, vec![Method::RungeKutta5]);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = Settings::default();
        settings.x_range = [3.0, 1.0];
        assert_err_contains(settings.comparison(0.1), "ordered correctly");

        let settings = Settings::default();
        assert_err_contains(settings.comparison(0.0), "step distance");

        let settings = Settings {
            field: "x + w".to_string(),
            ..Settings::default()
        };
        assert_err_contains(settings.field(), "unknown variable or parameter: w");

        assert_err_contains(Settings::from_toml("colour = 3"), "invalid settings file");
        assert_err_contains(
            Settings::from_toml("methods = [\"midpoint\"]"),
            "invalid settings file",
        );
    }

    #[test]
    fn empty_reference_disables_scoring() {
        let settings = Settings {
            reference: " ".to_string(),
            ..Settings::default()
        };
        assert!(settings.reference().expect("reference").is_none());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "initial = [1.0, 0.5]").expect("write");
        let settings = Settings::load(file.path()).expect("load");
        assert_eq!(settings.initial, [1.0, 0.5]);
    }
}
