//! Human-readable rendering of an `EvaluationReport`.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;
use tabled::Tabled;

use crate::analytics::{ConfidenceTier, Interval, ParlayTier};
use crate::engine::{EvaluationReport, LegOutcome, RecoveryNote};

pub const GREEN: &str = "#28a745";
pub const YELLOW: &str = "#ffc107";
pub const RED: &str = "#dc3545";

pub fn confidence_color(tier: ConfidenceTier) -> &'static str {
    match tier {
        ConfidenceTier::High => GREEN,
        ConfidenceTier::Moderate => YELLOW,
        ConfidenceTier::Low => RED,
    }
}

pub fn parlay_color(tier: ParlayTier) -> &'static str {
    match tier {
        ParlayTier::StrongPlay => GREEN,
        ParlayTier::Viable => YELLOW,
        ParlayTier::HighRisk => RED,
    }
}

/// Bankroll share rounded to cents
pub fn stake_amount(bankroll: Decimal, fraction: f64) -> Decimal {
    let fraction = Decimal::try_from(fraction.max(0.0)).unwrap_or(Decimal::ZERO);
    (bankroll * fraction).round_dp(2)
}

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

/// Stat totals can't go below zero, even where a normal marginal's lower
/// quantile does
pub fn display_interval(interval: &Interval) -> String {
    format!(
        "{:.1}-{:.1} ({:.0}%)",
        interval.lower.max(0.0),
        interval.upper.max(0.0),
        interval.level * 100.0
    )
}

#[derive(Debug, Serialize, Tabled)]
pub struct LegRow {
    #[tabled(rename = "#")]
    pub index: usize,
    pub leg: String,
    pub projection: String,
    pub interval: String,
    #[tabled(rename = "p(hit)")]
    pub p_hit: String,
    pub edge: String,
    pub confidence: String,
    pub stake: String,
    pub status: String,
}

pub fn leg_rows(report: &EvaluationReport) -> Vec<LegRow> {
    report
        .legs
        .iter()
        .map(|l| match &l.outcome {
            LegOutcome::Priced(p) => LegRow {
                index: l.index,
                leg: l.label(),
                projection: format!("{:.1} ± {:.1}", p.leg.projected_mean, p.leg.projected_std),
                interval: display_interval(&p.simulation.interval),
                p_hit: pct(p.hit_probability),
                edge: format!("{:+.1}%", p.edge.edge_for(l.direction)),
                confidence: format!("{:.0}", p.leg.confidence),
                stake: if p.stake.no_edge() {
                    "no edge".to_string()
                } else {
                    pct(p.stake.stake_fraction)
                },
                status: "priced".to_string(),
            },
            LegOutcome::Rejected { reason } => LegRow {
                index: l.index,
                leg: l.label(),
                projection: "-".to_string(),
                interval: "-".to_string(),
                p_hit: "-".to_string(),
                edge: "-".to_string(),
                confidence: "-".to_string(),
                stake: "-".to_string(),
                status: format!("rejected: {reason}"),
            },
        })
        .collect()
}

pub fn describe_note(note: &RecoveryNote) -> String {
    match note {
        RecoveryNote::MetricClamped { metric } => format!("{metric} clamped to its valid range"),
        RecoveryNote::VarianceFallback { leg, games } => {
            format!("{leg}: {games} games of history, category default std used")
        }
        RecoveryNote::HistoryDiscarded { leg } => {
            format!("{leg}: history had non-finite values and was ignored")
        }
        RecoveryNote::InsufficientSample {
            first,
            second,
            available,
            required,
        } => format!("{first} / {second}: {available} paired games (< {required}), treated as independent"),
        RecoveryNote::PsdProjection {
            min_eigenvalue,
            clipped_eigenvalues,
        } => format!(
            "correlation matrix repaired ({clipped_eigenvalues} eigenvalue(s) clipped, min {min_eigenvalue:.4})"
        ),
        RecoveryNote::LegRejected { leg, reason } => format!("{leg} rejected: {reason}"),
        RecoveryNote::NoEdge { subject } => format!("{subject}: no edge at the offered price"),
        RecoveryNote::ParlayUnavailable { reason } => format!("parlay unavailable: {reason}"),
    }
}

/// Headline text around the leg table
pub fn render_summary(report: &EvaluationReport, bankroll: Option<Decimal>) -> String {
    let mut out = String::new();
    let c = &report.matchup_confidence;

    let _ = writeln!(out, "{} vs {} ({})", report.team, report.opponent, report.game_script);
    let _ = writeln!(
        out,
        "Matchup confidence: {:.0} [{} {}]  data {:.0}/40, clarity {:.0}/30, signal {:.0}/30",
        c.score,
        c.tier,
        confidence_color(c.tier),
        c.completeness_points,
        c.clarity_points,
        c.signal_points
    );

    if let Some(parlay) = &report.parlay {
        let comp = &parlay.composition;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Parlay ({} legs): {} [{}]",
            parlay.legs.len(),
            comp.tier,
            parlay_color(comp.tier)
        );
        let _ = writeln!(
            out,
            "  true {}  independent {}  correlation edge {:+.2} pts",
            pct(comp.true_probability),
            pct(comp.independent_probability),
            comp.correlation_edge * 100.0
        );
        let _ = writeln!(
            out,
            "  odds {:.2}  breakeven {}  full Kelly {:.3}",
            parlay.decimal_odds,
            pct(parlay.stake.breakeven_probability),
            parlay.stake.full_kelly
        );
        match (parlay.stake.no_edge(), bankroll) {
            (true, _) => {
                let _ = writeln!(out, "  stake: none (no edge)");
            }
            (false, Some(bankroll)) => {
                let _ = writeln!(
                    out,
                    "  stake: {} = ${} of ${}",
                    pct(parlay.stake.stake_fraction),
                    stake_amount(bankroll, parlay.stake.stake_fraction),
                    bankroll
                );
            }
            (false, None) => {
                let _ = writeln!(out, "  stake: {} of bankroll", pct(parlay.stake.stake_fraction));
            }
        }
        for pair in &parlay.significant_pairs {
            let _ = writeln!(
                out,
                "  correlated: {} ~ {} r={:+.2} (p={:.3}, n={})",
                pair.first, pair.second, pair.r, pair.p_value, pair.sample_size
            );
        }
    }

    for suggestion in &report.script_parlays {
        let plan = &suggestion.plan;
        let comp = &suggestion.composition;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} stack ({}, confidence {:.0}): {} [{}]",
            plan.script,
            plan.strength,
            plan.combined_confidence,
            comp.tier,
            parlay_color(comp.tier)
        );
        for leg in &plan.legs {
            let _ = writeln!(
                out,
                "  {} {} ({:+.1}%, p {})",
                leg.label,
                leg.direction,
                leg.edge_pct,
                pct(leg.hit_probability)
            );
        }
        let _ = writeln!(
            out,
            "  true {}  independent {}",
            pct(comp.true_probability),
            pct(comp.independent_probability)
        );
    }

    if !report.notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes:");
        for note in &report.notes {
            let _ = writeln!(out, "  - {}", describe_note(note));
        }
    }
    out
}
