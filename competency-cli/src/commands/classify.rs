use anyhow::Result;
use clap::{Args, ValueEnum};
use comfy_table::Cell;
use competency_core::{ClassificationResult, Criticality, Frequency, Level, classify};

use super::{Context, print_json, table};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Level on the 0-5 scale
    pub level: f64,

    /// Usage frequency
    #[arg(value_enum, ignore_case = true)]
    pub frequency: FrequencyArg,

    /// Criticality for the role
    #[arg(value_enum, ignore_case = true)]
    pub criticality: CriticalityArg,
}

/// How often a skill is used, by name or letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrequencyArg {
    #[value(alias = "d")]
    Daily,
    #[value(alias = "w", alias = "s")]
    Weekly,
    #[value(alias = "m")]
    Monthly,
    #[value(alias = "q", alias = "t")]
    Quarterly,
    #[value(alias = "n")]
    Never,
}

impl From<FrequencyArg> for Frequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Daily => Frequency::Daily,
            FrequencyArg::Weekly => Frequency::Weekly,
            FrequencyArg::Monthly => Frequency::Monthly,
            FrequencyArg::Quarterly => Frequency::Quarterly,
            FrequencyArg::Never => Frequency::Never,
        }
    }
}

/// How much a skill matters for the role, by name or letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CriticalityArg {
    #[value(alias = "c")]
    Critical,
    #[value(alias = "i")]
    Important,
    #[value(alias = "d")]
    Desirable,
    #[value(alias = "n", alias = "na")]
    NotApplicable,
}

impl From<CriticalityArg> for Criticality {
    fn from(arg: CriticalityArg) -> Self {
        match arg {
            CriticalityArg::Critical => Criticality::Critical,
            CriticalityArg::Important => Criticality::Important,
            CriticalityArg::Desirable => Criticality::Desirable,
            CriticalityArg::NotApplicable => Criticality::NotApplicable,
        }
    }
}

pub fn run(ctx: &Context, args: ClassifyArgs) -> Result<()> {
    let result = evaluate(&args);

    if ctx.is_json() {
        return print_json(&result);
    }

    let mut table = table(&["State", "Priority", "Combined weight"]);
    table.add_row(vec![
        Cell::new(result.label()),
        Cell::new(result.priority_weight),
        Cell::new(format!("{:.1}", result.combined_weight)),
    ]);
    println!("{table}");
    Ok(())
}

fn evaluate(args: &ClassifyArgs) -> ClassificationResult {
    classify(
        Level::new(args.level),
        args.frequency.into(),
        args.criticality.into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use competency_core::SkillState;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ClassifyArgs,
    }

    fn parse(argv: &[&str]) -> Result<ClassifyArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("classify").chain(argv.iter().copied()))
            .map(|h| h.args)
    }

    #[test]
    fn test_evaluate_accepts_codes_and_names() {
        let by_code = evaluate(&parse(&["2", "D", "C"]).unwrap());
        let by_name = evaluate(&parse(&["2", "daily", "critical"]).unwrap());

        assert_eq!(by_code.state, SkillState::CriticalGap);
        assert_eq!(by_code, by_name);
    }

    #[test]
    fn test_letter_d_means_daily_or_desirable_by_position() {
        let args = parse(&["2", "d", "d"]).unwrap();

        assert_eq!(args.frequency, FrequencyArg::Daily);
        assert_eq!(args.criticality, CriticalityArg::Desirable);
    }

    #[test]
    fn test_not_applicable_accepts_code_and_name() {
        assert_eq!(parse(&["1", "N", "N"]).unwrap().criticality, CriticalityArg::NotApplicable);
        assert_eq!(
            parse(&["1", "never", "not-applicable"]).unwrap().criticality,
            CriticalityArg::NotApplicable
        );
    }

    #[test]
    fn test_unknown_codes_are_rejected_by_clap() {
        let err = parse(&["2", "X", "C"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
        assert!(parse(&["2", "D", "Z"]).is_err());
    }

    #[test]
    fn test_evaluate_clamps_level() {
        let result = evaluate(&parse(&["9", "D", "C"]).unwrap());
        assert_eq!(result.state, SkillState::KeyStrength);
    }

    #[test]
    fn test_every_frequency_maps_to_core() {
        let mapped: Vec<Frequency> = FrequencyArg::value_variants()
            .iter()
            .map(|arg| Frequency::from(*arg))
            .collect();
        assert_eq!(mapped, Frequency::ALL.to_vec());
    }
}
