use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use competency_core::{
    CollaboratorProfile, SkillInsight, Sparkline, Trend, profile_collaborator, sparkline,
};
use serde::Serialize;

use super::{Context, CutoffArgs, format_instant, format_optional_instant, print_json, table};

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Collaborator id or name
    pub collaborator: String,

    #[command(flatten)]
    pub cutoff: CutoffArgs,
}

#[derive(Debug, Serialize)]
struct ProfileReport {
    profile: CollaboratorProfile,
    sparkline: Sparkline,
}

pub fn run(ctx: &Context, args: ProfileArgs) -> Result<()> {
    let mut team = ctx.load_team()?;
    let periods = ctx.periods(&team);
    let cutoff = args.cutoff.resolve(ctx, &periods)?;
    let collaborator = ctx.collaborator(&team, &args.collaborator)?;

    let snapshot = team.snapshot(collaborator, cutoff);
    let report = ProfileReport {
        profile: profile_collaborator(&snapshot, &team.catalog),
        sparkline: sparkline(&team.log, collaborator, cutoff),
    };

    if ctx.is_json() {
        return print_json(&report);
    }

    print_summary(&report);
    if !report.profile.has_data {
        return Ok(());
    }

    if !report.profile.category_averages.is_empty() {
        let mut table = table(&["Category", "Average", "Evaluated"]);
        for category in &report.profile.category_averages {
            table.add_row(vec![
                Cell::new(&category.name),
                Cell::new(format!("{:.2}", category.average)),
                Cell::new(category.evaluated),
            ]);
        }
        println!("{table}");
    }

    print_section("Gaps", &report.profile.gaps);
    print_section("Strengths", &report.profile.strengths);
    print_section("Underutilized talent", &report.profile.underutilized);
    Ok(())
}

fn print_summary(report: &ProfileReport) {
    let profile = &report.profile;

    println!("Collaborator: {}", profile.name);
    if let Some(role) = &profile.role {
        println!("Role:         {role}");
    }
    println!("As of:        {}", format_instant(profile.as_of));
    if !profile.has_data {
        println!();
        println!("No evaluations up to this point.");
        return;
    }
    println!("Last eval:    {}", format_optional_instant(profile.last_evaluated));
    println!("Average:      {:.2}", profile.overall_average);
    println!("Risk:         {}", profile.risk);
    println!(
        "Critical:     {}/{} at level 3+ ({:.0}%)",
        profile.critical_maturity.met,
        profile.critical_maturity.required,
        profile.critical_maturity.percent
    );
    println!(
        "Important:    {}/{} at level 3+ ({:.0}%)",
        profile.important_maturity.met,
        profile.important_maturity.required,
        profile.important_maturity.percent
    );
    println!("Trend:        {}", format_sparkline(&report.sparkline));
    println!();
}

fn print_section(title: &str, skills: &[SkillInsight]) {
    if skills.is_empty() {
        return;
    }
    println!("{title}:");
    println!("{}", skill_table(skills));
}

fn skill_table(skills: &[SkillInsight]) -> Table {
    let mut table = table(&["Skill", "Level", "Criticality", "Frequency", "State", "Weight"]);
    for skill in skills {
        table.add_row(vec![
            Cell::new(&skill.name),
            Cell::new(format!("{:.1}", skill.level)),
            Cell::new(skill.criticality),
            Cell::new(skill.frequency),
            Cell::new(skill.classification.label()),
            Cell::new(format!("{:.1}", skill.classification.combined_weight)),
        ]);
    }
    table
}

fn format_sparkline(sparkline: &Sparkline) -> String {
    if sparkline.points.is_empty() {
        return "-".to_string();
    }
    let points: Vec<String> = sparkline.points.iter().map(|p| format!("{p:.1}")).collect();
    let arrow = match sparkline.trend {
        Trend::Up => "↑",
        Trend::Down => "↓",
        Trend::Neutral => "→",
    };
    format!("{} {arrow}", points.join(" "))
}
