//! Stdout rendering for CLI commands: a table view by default, JSON with
//! `--json`. Warnings go to stderr alongside the tracing output.

use rust_decimal::Decimal;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::formatter::{leg_rows, render_summary, stake_amount};
use crate::analytics::StakeRecommendation;
use crate::engine::EvaluationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_rows<T: Tabled + Serialize>(rows: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => print_json(rows),
        OutputMode::Table if rows.is_empty() => {
            println!("(nothing to show)");
            Ok(())
        }
        OutputMode::Table => {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
            Ok(())
        }
    }
}

/// Summary block followed by the leg table, or the whole report as JSON
pub fn print_report(
    report: &EvaluationReport,
    mode: OutputMode,
    bankroll: Option<Decimal>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => print_json(report),
        OutputMode::Table => {
            println!("{}", render_summary(report, bankroll));
            print_rows(&leg_rows(report), mode)
        }
    }
}

pub fn print_stake(
    rec: &StakeRecommendation,
    mode: OutputMode,
    bankroll: Option<Decimal>,
) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        return print_json(rec);
    }
    print_kv("decimal odds", &format!("{:.4}", rec.decimal_odds));
    print_kv("breakeven", &format!("{:.2}%", rec.breakeven_probability * 100.0));
    print_kv("edge", &format!("{:+.2} pts", rec.edge() * 100.0));
    print_kv("full kelly", &format!("{:.4}", rec.full_kelly));
    print_kv("EV per $100", &format!("{:+.2}", rec.expected_value * 100.0));
    if rec.no_edge() {
        print_warn("no edge at this price, stake 0");
        return Ok(());
    }
    print_kv("stake", &format!("{:.2}%", rec.stake_fraction * 100.0));
    if let Some(bankroll) = bankroll {
        print_kv(
            "amount",
            &format!("${}", stake_amount(bankroll, rec.stake_fraction)),
        );
    }
    Ok(())
}

pub fn print_kv(key: &str, value: &str) {
    println!("{key:>14}: {value}");
}

pub fn print_warn(msg: &str) {
    eprintln!("\x1b[33mwarning:\x1b[0m {msg}");
}
