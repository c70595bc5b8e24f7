use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use competency_core::{Granularity, TimePeriod};

use super::{Context, GranularityArg, format_instant, print_json, table};

#[derive(Args, Debug)]
pub struct PeriodsArgs {
    /// Only list periods of this granularity
    #[arg(long, short, value_enum, ignore_case = true)]
    pub granularity: Option<GranularityArg>,
}

pub fn run(ctx: &Context, args: PeriodsArgs) -> Result<()> {
    let team = ctx.load_team()?;
    let periods = filter(ctx.periods(&team), args.granularity.map(Granularity::from));

    if ctx.is_json() {
        return print_json(&periods);
    }

    if periods.is_empty() {
        println!("No periods: the dataset has no evaluations with a usable date.");
        return Ok(());
    }

    let mut table = table(&["Id", "Label", "Granularity", "Start", "End"]);
    for period in &periods {
        table.add_row(vec![
            Cell::new(&period.id),
            Cell::new(&period.label),
            Cell::new(period.granularity),
            Cell::new(format_instant(period.start)),
            Cell::new(format_instant(period.end)),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn filter(periods: Vec<TimePeriod>, granularity: Option<Granularity>) -> Vec<TimePeriod> {
    match granularity {
        Some(granularity) => periods
            .into_iter()
            .filter(|p| p.granularity == granularity)
            .collect(),
        None => periods,
    }
}
