use anyhow::Result;
use clap::Args;
use competency_core::{Granularity, match_period};

use super::{Context, GranularityArg, format_instant, print_json};

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Currently viewed period id (e.g. M-2024-02)
    pub period: String,

    /// Granularity to switch to
    #[arg(value_enum, ignore_case = true)]
    pub granularity: GranularityArg,
}

pub fn run(ctx: &Context, args: MatchArgs) -> Result<()> {
    let target = Granularity::from(args.granularity);

    let team = ctx.load_team()?;
    let periods = ctx.periods(&team);
    let matched = match_period(Some(&args.period), target, &periods);

    if ctx.is_json() {
        return print_json(&matched);
    }

    match matched {
        Some(period) => println!(
            "{} ({}) {} .. {}",
            period.id,
            period.label,
            format_instant(period.start),
            format_instant(period.end)
        ),
        None => println!("No {target} period matches '{}'", args.period),
    }
    Ok(())
}
