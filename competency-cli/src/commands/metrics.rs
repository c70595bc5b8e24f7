use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color};
use competency_core::{
    BusFactorRisk, CategoryChanges, CategoryDistribution, CategoryGap, LevelDistribution,
    MetricDefinition, MetricTrend, MetricUnit, Severity, TOP_CHANGES, TeamMetricsReport,
    aggregate_team_metrics, bus_factor_risks, category_changes, category_distribution,
    find_period, level_distribution, prioritize_category_gaps, team_category_averages,
};
use serde::Serialize;

use super::{Context, CutoffArgs, format_instant, print_json, table};
use crate::dataset::Team;

#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[command(flatten)]
    pub cutoff: CutoffArgs,

    /// Compare against the end of this period (e.g. Q-2024-1)
    #[arg(long)]
    pub compare: Option<String>,
}

#[derive(Debug, Serialize)]
struct MetricsOutput {
    as_of: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    compared_to: Option<DateTime<Utc>>,
    metrics: TeamMetricsReport,
    distribution: LevelDistribution,
    category_gaps: Vec<CategoryGap>,
    category_distribution: Vec<CategoryDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_changes: Option<CategoryChanges>,
    bus_factor: Vec<BusFactorRisk>,
}

pub fn run(ctx: &Context, args: MetricsArgs) -> Result<()> {
    let mut team = ctx.load_team()?;
    let periods = ctx.periods(&team);
    let as_of = args.cutoff.resolve(ctx, &periods)?;
    let compared_to = match args.compare.as_deref() {
        Some(id) => match find_period(id, &periods) {
            Some(period) => Some(period.end),
            None => bail!("Unknown period '{id}'. Run `competency periods` to list them"),
        },
        None => None,
    };

    let current = team.snapshots(as_of);
    let previous = compared_to.map(|cutoff| team.snapshots(cutoff));

    let changes = previous.as_deref().map(|previous| {
        category_changes(
            &team_category_averages(&current, &team.catalog),
            &team_category_averages(previous, &team.catalog),
            TOP_CHANGES,
        )
    });

    let output = MetricsOutput {
        as_of,
        compared_to,
        metrics: aggregate_team_metrics(&current, previous.as_deref(), &team.catalog),
        distribution: level_distribution(&current),
        category_gaps: prioritize_category_gaps(&current, &team.catalog),
        category_distribution: category_distribution(&current, &team.catalog),
        category_changes: changes,
        bus_factor: bus_factor_risks(&current, &team.catalog),
    };

    if ctx.is_json() {
        return print_json(&output);
    }

    print_report(&output, &team);
    Ok(())
}

fn print_report(output: &MetricsOutput, team: &Team) {
    match output.compared_to {
        Some(previous) => println!(
            "Team as of {} compared to {}",
            format_instant(output.as_of),
            format_instant(previous)
        ),
        None => println!("Team as of {}", format_instant(output.as_of)),
    }

    let report = &output.metrics;
    if report.deltas.is_empty() {
        let mut table = table(&["Metric", "Value"]);
        for metric in MetricDefinition::ALL {
            table.add_row(vec![
                Cell::new(metric.description),
                Cell::new(format_value(&metric, report.current.value(&metric))),
            ]);
        }
        println!("{table}");
    } else {
        let mut table = table(&["Metric", "Current", "Previous", "Change", "Trend"]);
        for delta in &report.deltas {
            let (label, color) = match delta.trend {
                MetricTrend::Improved => ("improved", Color::Green),
                MetricTrend::Declined => ("declined", Color::Red),
                MetricTrend::Stable => ("stable", Color::Reset),
            };
            table.add_row(vec![
                Cell::new(delta.metric.description),
                Cell::new(format_value(&delta.metric, delta.current)),
                Cell::new(format_value(&delta.metric, delta.previous)),
                Cell::new(format!("{:+.2} ({:+.1}%)", delta.delta, delta.percent_change)),
                Cell::new(label).fg(color),
            ]);
        }
        println!("{table}");
    }

    let names = |ids: &[competency_core::CollaboratorId]| -> String {
        if ids.is_empty() {
            "-".to_string()
        } else {
            ids.iter().map(|id| team.name_of(*id)).collect::<Vec<_>>().join(", ")
        }
    };

    println!();
    println!("Beginners: {}", names(&output.distribution.beginners));
    println!("Competent: {}", names(&output.distribution.competent));
    println!("Experts:   {}", names(&output.distribution.experts));

    if !output.category_gaps.is_empty() {
        println!();
        let mut table = table(&["Category", "Gaps", "Affected", "Impact", "Severity"]);
        for gap in &output.category_gaps {
            let color = match gap.severity {
                Severity::Critical => Color::Red,
                Severity::Warning => Color::Yellow,
                Severity::Info => Color::Reset,
            };
            table.add_row(vec![
                Cell::new(&gap.name),
                Cell::new(gap.gap_count),
                Cell::new(names(&gap.affected)),
                Cell::new(format!("{:.1}", gap.impact_score)),
                Cell::new(gap.severity.as_str()).fg(color),
            ]);
        }
        println!("{table}");
    }

    let evaluated: Vec<&CategoryDistribution> = output
        .category_distribution
        .iter()
        .filter(|row| row.total > 0)
        .collect();
    if !evaluated.is_empty() {
        println!();
        let mut table = table(&["Category", "Gaps", "Competent", "Experts", "Evaluated"]);
        for row in evaluated {
            table.add_row(vec![
                Cell::new(&row.short_name),
                Cell::new(row.gaps).fg(Color::Red),
                Cell::new(row.competent),
                Cell::new(row.experts).fg(Color::Green),
                Cell::new(row.total),
            ]);
        }
        println!("{table}");
    }

    if let Some(changes) = &output.category_changes
        && !(changes.improvements.is_empty() && changes.regressions.is_empty())
    {
        println!();
        let mut table = table(&["Category", "Previous", "Current", "Change"]);
        let rows = changes
            .improvements
            .iter()
            .map(|c| (c, Color::Green))
            .chain(changes.regressions.iter().map(|c| (c, Color::Red)));
        for (change, color) in rows {
            table.add_row(vec![
                Cell::new(&change.name),
                Cell::new(format!("{:.2}", change.previous)),
                Cell::new(format!("{:.2}", change.current)),
                Cell::new(format!("{:+.2}", change.delta)).fg(color),
            ]);
        }
        println!("{table}");
    }

    if !output.bus_factor.is_empty() {
        println!();
        let mut table = table(&["Single-expert skill", "Holder", "Level"]);
        for risk in &output.bus_factor {
            table.add_row(vec![
                Cell::new(&risk.skill_name),
                Cell::new(team.name_of(risk.holder)),
                Cell::new(format!("{:.1}", risk.level)),
            ]);
        }
        println!("{table}");
    }
}

fn format_value(metric: &MetricDefinition, value: f64) -> String {
    match metric.unit {
        MetricUnit::Level => format!("{value:.2}"),
        MetricUnit::Count => format!("{value:.0}"),
        MetricUnit::Percentage => format!("{value:.1}%"),
    }
}
