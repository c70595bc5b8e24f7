use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color};
use competency_core::{
    EvolutionRange, EvolutionReport, EvolutionWindow, Status, Trend, parse_instant, team_evolution,
};

use super::{Context, format_instant, print_json, table};
use crate::dataset::Team;

#[derive(Args, Debug)]
pub struct EvolutionArgs {
    /// How far back to look from now
    #[arg(long, short, value_enum, default_value = "12m", conflicts_with = "from")]
    pub range: RangeArg,

    /// Custom window start (RFC 3339 or YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Custom window end (RFC 3339 or YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

/// Preset look-back window
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    #[value(name = "6m")]
    SixMonths,
    #[value(name = "12m")]
    TwelveMonths,
    #[value(name = "24m")]
    TwentyFourMonths,
    #[value(name = "ytd")]
    YearToDate,
    #[value(name = "all")]
    All,
}

impl From<RangeArg> for EvolutionRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::SixMonths => EvolutionRange::SixMonths,
            RangeArg::TwelveMonths => EvolutionRange::TwelveMonths,
            RangeArg::TwentyFourMonths => EvolutionRange::TwentyFourMonths,
            RangeArg::YearToDate => EvolutionRange::YearToDate,
            RangeArg::All => EvolutionRange::All,
        }
    }
}

pub fn run(ctx: &Context, args: EvolutionArgs) -> Result<()> {
    let window = resolve_window(&args, ctx.now)?;
    let team = ctx.load_team()?;
    let report = team_evolution(&team.log, &team.catalog, &window);

    if ctx.is_json() {
        return print_json(&report);
    }

    print_report(&report, &team);
    Ok(())
}

fn resolve_window(args: &EvolutionArgs, now: DateTime<Utc>) -> Result<EvolutionWindow> {
    let window = match (args.from.as_deref(), args.to.as_deref()) {
        (Some(from), Some(to)) => {
            let (Some(start), Some(end)) = (parse_instant(from), parse_instant(to)) else {
                bail!("Invalid window '{from}' .. '{to}'");
            };
            EvolutionWindow::new(start, end)
        }
        _ => match EvolutionWindow::for_range(args.range.into(), now) {
            Some(window) => window,
            None => bail!("Range {:?} does not fit before {now}", args.range),
        },
    };

    if window.start > window.end {
        bail!(
            "Window starts after it ends ({} > {})",
            format_instant(window.start),
            format_instant(window.end)
        );
    }
    Ok(window)
}

fn trend_cell(trend: Trend, text: String) -> Cell {
    match trend {
        Trend::Up => Cell::new(text).fg(Color::Green),
        Trend::Down => Cell::new(text).fg(Color::Red),
        Trend::Neutral => Cell::new(text),
    }
}

fn print_report(report: &EvolutionReport, team: &Team) {
    println!(
        "Evolution from {} to {}",
        format_instant(report.window.start),
        format_instant(report.window.end)
    );

    if report.collaborators.is_empty() {
        println!();
        println!("No scored evaluations in this window.");
        return;
    }

    match (report.maturity_index, report.velocity) {
        (Some(index), Some(velocity)) => println!("Maturity index: {index:.1} ({velocity:+.1})"),
        (Some(index), None) => println!("Maturity index: {index:.1}"),
        _ => {}
    }
    if let Some(top) = &report.top_improver {
        println!("Top improver:   {} ({:+.1})", top.name, top.growth);
    }

    println!();
    let mut table = table(&["Collaborator", "Start", "Current", "Growth", "Status", "Sessions", "Note"]);
    for growth in &report.collaborators {
        let status_color = match growth.status {
            Status::Attention => Color::Red,
            Status::Competent => Color::Reset,
            Status::Strength => Color::Green,
        };
        let note = if growth.is_new_hire {
            "new hire"
        } else if growth.insufficient_data {
            "single evaluation"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(&growth.name),
            Cell::new(format!("{:.1}", growth.start_score)),
            Cell::new(format!("{:.1}", growth.current_score)),
            trend_cell(growth.trend, format!("{:+.1}", growth.growth)),
            Cell::new(growth.status.as_str()).fg(status_color),
            Cell::new(growth.evaluations()),
            Cell::new(note),
        ]);
    }
    println!("{table}");

    println!();
    let mut table = super::table(&["Month", "Average", "Collaborators", "New hires"]);
    for month in &report.monthly {
        let average = if month.carried_over {
            format!("{:.1} (carried)", month.average)
        } else {
            format!("{:.1}", month.average)
        };
        table.add_row(vec![
            Cell::new(&month.label),
            Cell::new(average),
            Cell::new(month.collaborators),
            Cell::new(month.new_hires.join(", ")),
        ]);
    }
    println!("{table}");

    if !report.support.is_empty() {
        println!();
        let mut table = super::table(&["Needs support", "Critical gaps", "Current"]);
        for case in &report.support {
            let skills: Vec<String> = case
                .critical_gaps
                .iter()
                .map(|id| {
                    team.catalog
                        .skill(*id)
                        .map_or_else(|| format!("#{id}"), |s| s.name.clone())
                })
                .collect();
            table.add_row(vec![
                Cell::new(&case.name),
                Cell::new(skills.join(", ")).fg(Color::Red),
                Cell::new(format!("{:.1}", case.current_score)),
            ]);
        }
        println!("{table}");
    }
}
