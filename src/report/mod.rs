//! Presentation of engine output. Nothing here feeds back into the numbers.

pub mod formatter;
pub mod output;

pub use formatter::{leg_rows, render_summary, stake_amount, LegRow};
pub use output::{print_report, OutputMode};
