//! Browser bridge for the stepwise core.

use js_sys::Float64Array;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use stepwise_core::comparison::{run_comparison, ComparisonConfig};
use stepwise_core::equation_engine::{ExpressionField, ExpressionSolution};
use stepwise_core::region::Region;
use stepwise_core::solvers::Method;
use stepwise_core::trajectory::{Termination, TraceLimits, Tracer};
use stepwise_core::Point;
use wasm_bindgen::prelude::*;

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{context}: {err}"))
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| js_error("Serialization error", e))
}

#[wasm_bindgen]
pub struct WasmComparison {
    field: ExpressionField,
    reference: Option<ExpressionSolution>,
}

#[wasm_bindgen]
impl WasmComparison {
    /// An empty `reference_expr` skips deviation scoring.
    #[wasm_bindgen(constructor)]
    pub fn new(
        field_expr: &str,
        reference_expr: &str,
        param_names: Vec<String>,
        params: Vec<f64>,
    ) -> Result<WasmComparison, JsValue> {
        console_error_panic_hook::set_once();

        let field = ExpressionField::new(field_expr, &param_names, &params)
            .map_err(|e| js_error("Invalid field expression", e))?;
        let reference = if reference_expr.trim().is_empty() {
            None
        } else {
            Some(
                ExpressionSolution::new(reference_expr, &param_names, &params)
                    .map_err(|e| js_error("Invalid reference expression", e))?,
            )
        };
        Ok(WasmComparison { field, reference })
    }

    /// Runs every configured method; `config_val` is a serialized
    /// `ComparisonConfig`.
    pub fn run(&self, config_val: JsValue) -> Result<JsValue, JsValue> {
        let config: ComparisonConfig =
            from_value(config_val).map_err(|e| js_error("Invalid comparison config", e))?;
        let comparison = run_comparison(&self.field, self.reference.as_ref(), &config)
            .map_err(|e| js_error("Comparison failed", e))?;
        serialize(&comparison)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceProgress {
    pub done: bool,
    pub steps: usize,
    pub termination: Option<Termination>,
    /// Points recorded since the previous call.
    pub points: Vec<Point>,
}

#[wasm_bindgen]
pub struct WasmTraceRunner {
    field: ExpressionField,
    method: Method,
    region: Region,
    tracer: Tracer,
    emitted: usize,
}

#[wasm_bindgen]
impl WasmTraceRunner {
    /// `step` is signed: negative values trace towards smaller x.
    #[wasm_bindgen(constructor)]
    pub fn new(
        field_expr: &str,
        param_names: Vec<String>,
        params: Vec<f64>,
        method: &str,
        x0: f64,
        y0: f64,
        step: f64,
        region_val: JsValue,
    ) -> Result<WasmTraceRunner, JsValue> {
        console_error_panic_hook::set_once();

        let field = ExpressionField::new(field_expr, &param_names, &params)
            .map_err(|e| js_error("Invalid field expression", e))?;
        let method: Method = method.parse().map_err(|e| js_error("Invalid method", e))?;
        let region: Region =
            from_value(region_val).map_err(|e| js_error("Invalid region", e))?;
        let tracer = Tracer::new(Point::new(x0, y0), step, TraceLimits::default())
            .map_err(|e| js_error("Invalid step", e))?;

        Ok(WasmTraceRunner {
            field,
            method,
            region,
            tracer,
            emitted: 0,
        })
    }

    pub fn is_done(&self) -> bool {
        self.tracer.is_done()
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let termination = self.tracer.advance(
            self.method.stepper::<f64, ExpressionField>(),
            &self.field,
            self.region.predicate(),
            batch_size as usize,
        );

        let points = self.tracer.points()[self.emitted..].to_vec();
        self.emitted = self.tracer.points().len();

        serialize(&TraceProgress {
            done: termination.is_some(),
            steps: self.tracer.steps(),
            termination,
            points,
        })
    }

    /// All recorded points so far, interleaved as `[x0, y0, x1, y1, ...]`.
    pub fn get_points(&self) -> Float64Array {
        let flat: Vec<f64> = self
            .tracer
            .points()
            .iter()
            .flat_map(|p| [p.x, p.y])
            .collect();
        Float64Array::from(flat.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_core::trajectory::Direction;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[derive(Deserialize)]
    struct RunSummary {
        method: Method,
        direction: Direction,
    }

    #[derive(Deserialize)]
    struct ComparisonSummary {
        step: f64,
        runs: Vec<RunSummary>,
    }

    fn region_value(x_min: f64, x_max: f64) -> JsValue {
        let region = Region::new(x_min, x_max)
            .and_then(|r| r.with_y(-0.1, 2.0))
            .expect("region");
        to_value(&region).expect("region value")
    }

    fn message(err: JsValue) -> String {
        err.as_string().unwrap_or_default()
    }

    #[wasm_bindgen_test]
    fn comparison_rejects_bad_expression() {
        let result = WasmComparison::new("x +* y", "", vec![], vec![]);
        let err = result.err().map(message).unwrap_or_default();
        assert!(err.contains("Invalid field expression"));
    }

    #[wasm_bindgen_test]
    fn comparison_round_trips_through_js() {
        let comparison = WasmComparison::new("x^3*y^3 - x*y", "1/sqrt(x^2+1)", vec![], vec![])
            .expect("comparison");
        let config = ComparisonConfig {
            initial: Point::new(0.0, 1.0),
            step: 0.1,
            region: Region::new(-8.0, 8.0)
                .and_then(|r| r.with_y(-0.1, 2.0))
                .expect("region"),
            methods: vec![Method::RungeKutta4],
            limits: TraceLimits::default(),
        };
        let value = comparison
            .run(to_value(&config).expect("config value"))
            .expect("run");
        let result: ComparisonSummary = from_value(value).expect("summary");
        assert_eq!(result.step, 0.1);
        assert_eq!(result.runs.len(), 2);
        assert_eq!(result.runs[0].method, Method::RungeKutta4);
        assert_eq!(result.runs[0].direction, Direction::Forward);
        assert_eq!(result.runs[1].direction, Direction::Backward);
    }

    #[wasm_bindgen_test]
    fn runner_streams_points_in_batches() {
        let mut runner = WasmTraceRunner::new(
            "k*y",
            vec!["k".to_string()],
            vec![-1.0],
            "heun",
            0.0,
            1.0,
            0.25,
            region_value(0.0, 2.0),
        )
        .expect("runner");

        let first: TraceProgress =
            from_value(runner.run_steps(3).expect("steps")).expect("progress");
        assert!(!first.done);
        assert_eq!(first.points.len(), 3);
        assert_eq!(first.points[0], Point::new(0.0, 1.0));

        let rest: TraceProgress =
            from_value(runner.run_steps(100).expect("steps")).expect("progress");
        assert!(rest.done);
        assert!(runner.is_done());
        assert_eq!(rest.termination, Some(Termination::LeftRegion));
        assert_eq!(first.points.len() + rest.points.len(), 10);
        assert_eq!(runner.get_points().length(), 20);
    }

    #[wasm_bindgen_test]
    fn runner_rejects_unknown_method_and_zero_step() {
        let err = WasmTraceRunner::new(
            "y",
            vec![],
            vec![],
            "midpoint",
            0.0,
            1.0,
            0.1,
            region_value(0.0, 1.0),
        )
        .err()
        .map(message)
        .unwrap_or_default();
        assert!(err.contains("unknown method"));

        let err = WasmTraceRunner::new(
            "y",
            vec![],
            vec![],
            "euler",
            0.0,
            1.0,
            0.0,
            region_value(0.0, 1.0),
        )
        .err()
        .map(message)
        .unwrap_or_default();
        assert!(err.contains("step distance"));
    }
}
