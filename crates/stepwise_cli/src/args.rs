use crate::batch::Animation;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;
use stepwise_core::solvers::Method;

pub const USAGE: &str = "\
usage:
  stepwise [render] <step> [-x_min v] [-x_max v] [-y_min v] [-y_max v]
                           [-methods m ...] [-out file] [--delta]
  stepwise animate <standard|delta> [--dir dir]

common options:
  --config file.toml   settings file (field, reference, initial point, ranges, ...)
  -v                   debug logging
  -h, --help           show this message

methods: euler, heun, runge_kutta_4, runge_kutta_4_38, runge_kutta_5";

/// Overrides for a single rendered comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderArgs {
    pub step: f64,
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub methods: Option<Vec<Method>>,
    pub out: Option<PathBuf>,
    pub delta: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimateArgs {
    pub animation: Animation,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Render(RenderArgs),
    Animate(AnimateArgs),
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub command: Command,
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

fn value<I: Iterator<Item = String>>(args: &mut std::iter::Peekable<I>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("missing value after {flag}"))
}

fn number<I: Iterator<Item = String>>(args: &mut std::iter::Peekable<I>, flag: &str) -> Result<f64> {
    let raw = value(args, flag)?;
    raw.parse()
        .with_context(|| format!("{flag} expects a number, got \"{raw}\""))
}

fn is_number(arg: &str) -> bool {
    arg.parse::<f64>().is_ok()
}

/// Parses command-line arguments (without the binary name).
///
/// The first positional argument selects the subcommand; a bare number is
/// shorthand for `render <step>`.
pub fn parse_cli<I>(args: I) -> Result<Cli>
where
    I: Iterator<Item = String>,
{
    let mut args = args.peekable();
    let mut config = None;
    let mut verbose = false;
    let mut render = RenderArgs::default();
    let mut dir = None;
    let mut positional: Vec<String> = Vec::new();
    let mut help = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => help = true,
            "-v" | "--verbose" => verbose = true,
            "--config" => config = Some(PathBuf::from(value(&mut args, &arg)?)),
            "--dir" => dir = Some(PathBuf::from(value(&mut args, &arg)?)),
            "-x_min" | "--x-min" => render.x_min = Some(number(&mut args, &arg)?),
            "-x_max" | "--x-max" => render.x_max = Some(number(&mut args, &arg)?),
            "-y_min" | "--y-min" => render.y_min = Some(number(&mut args, &arg)?),
            "-y_max" | "--y-max" => render.y_max = Some(number(&mut args, &arg)?),
            "-out" | "--out" => render.out = Some(PathBuf::from(value(&mut args, &arg)?)),
            "--delta" => render.delta = true,
            "-methods" | "--methods" => {
                let mut methods = Vec::new();
                while let Some(next) = args.peek() {
                    if next.starts_with('-') {
                        break;
                    }
                    methods.push(next.parse::<Method>()?);
                    args.next();
                }
                if methods.is_empty() {
                    bail!("{arg} expects at least one method");
                }
                render.methods = Some(methods);
            }
            other if other.starts_with('-') && !is_number(other) => {
                bail!("unknown option {other}\n\n{USAGE}")
            }
            _ => positional.push(arg),
        }
    }

    if help {
        return Ok(Cli {
            command: Command::Help,
            config,
            verbose,
        });
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("animate") => {
            let animation = positional
                .next()
                .ok_or_else(|| anyhow!("animate expects standard or delta"))?
                .parse()?;
            Command::Animate(AnimateArgs {
                animation,
                dir: dir.unwrap_or_else(|| PathBuf::from(".")),
            })
        }
        Some("render") => {
            let raw = positional
                .next()
                .ok_or_else(|| anyhow!("render expects a step\n\n{USAGE}"))?;
            render.step = raw
                .parse()
                .with_context(|| format!("step must be a number, got \"{raw}\""))?;
            Command::Render(render)
        }
        Some(raw) if is_number(raw) => {
            render.step = raw.parse()?;
            Command::Render(render)
        }
        Some(other) => bail!("unknown command \"{other}\"\n\n{USAGE}"),
        None => Command::Help,
    };

    if let Some(extra) = positional.next() {
        bail!("unexpected argument \"{extra}\"");
    }

    Ok(Cli {
        command,
        config,
        verbose,
    })
}

/// Convenience wrapper that parses arguments from the current process
/// (skipping the binary name).
pub fn parse_env() -> Result<Cli> {
    parse_cli(env::args().skip(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Cli> {
        parse_cli(line.split_whitespace().map(String::from))
    }

    #[test]
    fn bare_step_renders_with_defaults() {
        let cli = parse("0.1").expect("parse");
        assert_eq!(
            cli.command,
            Command::Render(RenderArgs {
                step: 0.1,
                ..RenderArgs::default()
            })
        );
        assert!(!cli.verbose);
    }

    #[test]
    fn render_flags_are_collected() {
        let cli = parse("render 0.25 -x_min -8.0 -x_max 8 -methods euler runge_kutta_5 -out a.png --delta -v")
            .expect("parse");
        let Command::Render(render) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(render.step, 0.25);
        assert_eq!(render.x_min, Some(-8.0));
        assert_eq!(render.x_max, Some(8.0));
        assert_eq!(
            render.methods,
            Some(vec![Method::Euler, Method::RungeKutta5])
        );
        assert_eq!(render.out, Some(PathBuf::from("a.png")));
        assert!(render.delta);
        assert!(cli.verbose);
    }

    #[test]
    fn negative_step_is_positional() {
        let cli = parse("-0.5 --config run.toml").expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("run.toml")));
        let Command::Render(render) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(render.step, -0.5);
    }

    #[test]
    fn animate_takes_kind_and_dir() {
        let cli = parse("animate delta --dir frames").expect("parse");
        assert_eq!(
            cli.command,
            Command::Animate(AnimateArgs {
                animation: Animation::Delta,
                dir: PathBuf::from("frames"),
            })
        );
    }

    #[test]
    fn invalid_input_is_reported() {
        let message = |line: &str| format!("{:#}", parse(line).expect_err(line));
        assert!(message("0.1 -methods midpoint").contains("unknown method"));
        assert!(message("0.1 -x_min").contains("missing value after -x_min"));
        assert!(message("0.1 -x_max abc").contains("expects a number"));
        assert!(message("0.1 --frobnicate").contains("unknown option"));
        assert!(message("launch").contains("unknown command"));
        assert!(message("animate sideways").contains("unknown animation"));
        assert!(message("0.1 0.2").contains("unexpected argument"));
    }

    #[test]
    fn empty_arguments_show_help() {
        assert_eq!(parse("").expect("parse").command, Command::Help);
        assert_eq!(parse("0.1 -h").expect("parse").command, Command::Help);
    }
}
