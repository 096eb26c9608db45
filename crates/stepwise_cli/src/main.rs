mod args;
mod batch;
mod render;
mod report;
mod settings;

use anyhow::Result;
use args::{Cli, Command, USAGE};
use log::{debug, info, LevelFilter};
use settings::Settings;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use stepwise_core::comparison::run_comparison;

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(err) = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]) {
        eprintln!("logging disabled: {err}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Help => println!("{USAGE}"),
        Command::Render(args) => {
            settings.apply(&args);
            debug!("settings: {settings:?}");
            match &args.out {
                Some(out) => {
                    let comparison = render::render(&settings, args.step, args.delta, out)?;
                    info!("\n{}", report::summary_table(&comparison));
                }
                None => {
                    let field = settings.field()?;
                    let reference = settings.reference()?;
                    let config = settings.comparison(args.step)?;
                    let comparison = run_comparison(&field, reference.as_ref(), &config)?;
                    println!("{}", report::summary_table(&comparison));
                }
            }
        }
        Command::Animate(args) => batch::animate(&settings, args.animation, &args.dir)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = args::parse_env()?;
    init_logging(cli.verbose);
    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_logging_init_is_reported_not_fatal() {
        init_logging(false);
        init_logging(true);
        assert!(log::max_level() >= LevelFilter::Info);
    }
}
