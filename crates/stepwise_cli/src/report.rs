//! Text summary of a comparison.

use stepwise_core::comparison::{Comparison, Run};
use stepwise_core::deviation::RelativeDeviation;
use stepwise_core::trajectory::{Direction, Termination};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct SummaryRow {
    method: &'static str,
    order: usize,
    direction: &'static str,
    points: usize,
    #[tabled(rename = "last x")]
    last_x: String,
    stop: String,
    #[tabled(rename = "max |dy|")]
    max_absolute: String,
    #[tabled(rename = "max rel")]
    max_relative: String,
}

fn direction_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Backward => "backward",
    }
}

fn termination_name(termination: Termination) -> &'static str {
    match termination {
        Termination::LeftRegion => "left region",
        Termination::Diverged => "diverged",
        Termination::Stalled => "stalled",
        Termination::StepLimit => "step limit",
    }
}

fn row(run: &Run) -> SummaryRow {
    let method = run.method.name();
    let order = run.method.order();
    let direction = direction_name(run.direction);
    match &run.output {
        Err(err) => SummaryRow {
            method,
            order,
            direction,
            points: 0,
            last_x: "-".to_string(),
            stop: format!("error: {err}"),
            max_absolute: "-".to_string(),
            max_relative: "-".to_string(),
        },
        Ok(output) => {
            let trajectory = &output.trajectory;
            let (max_absolute, max_relative) = match &output.deviation {
                None => ("-".to_string(), "-".to_string()),
                Some(Err(err)) => (format!("error: {err}"), "-".to_string()),
                Some(Ok(deviation)) => (
                    format!("{:.6e}", deviation.absolute),
                    match &deviation.relative {
                        RelativeDeviation::Defined { value } => format!("{value:.6e}"),
                        RelativeDeviation::Undefined { .. } => "undefined".to_string(),
                    },
                ),
            };
            SummaryRow {
                method,
                order,
                direction,
                points: trajectory.len(),
                last_x: trajectory
                    .points
                    .last()
                    .map_or_else(|| "-".to_string(), |p| format!("{:.6}", p.x)),
                stop: termination_name(trajectory.termination).to_string(),
                max_absolute,
                max_relative,
            }
        }
    }
}

pub fn summary_rows(comparison: &Comparison) -> Vec<SummaryRow> {
    comparison.runs.iter().map(row).collect()
}

pub fn summary_table(comparison: &Comparison) -> String {
    let rows = summary_rows(comparison);
    let mut table = Table::new(&rows);
    table.with(Style::modern_rounded());
    table.to_string()
}
