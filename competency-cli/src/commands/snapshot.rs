use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use competency_core::{Catalog, CollaboratorSnapshot};

use super::{
    Context, CutoffArgs, format_instant, format_optional_instant, print_json, table,
};

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Collaborator id or name
    pub collaborator: String,

    #[command(flatten)]
    pub cutoff: CutoffArgs,
}

pub fn run(ctx: &Context, args: SnapshotArgs) -> Result<()> {
    let mut team = ctx.load_team()?;
    let periods = ctx.periods(&team);
    let cutoff = args.cutoff.resolve(ctx, &periods)?;
    let collaborator = ctx.collaborator(&team, &args.collaborator)?;

    let snapshot = team.snapshot(collaborator, cutoff);

    if ctx.is_json() {
        return print_json(&snapshot);
    }

    println!("Collaborator: {}", team.name_of(collaborator));
    println!("As of:        {}", format_instant(snapshot.as_of));
    if !snapshot.has_data {
        println!();
        println!("No evaluations up to this point.");
        return Ok(());
    }
    println!("Last eval:    {}", format_optional_instant(snapshot.last_evaluated));
    println!("Sessions:     {}", snapshot.sessions_applied);
    println!("Average:      {:.2}", snapshot.average);
    println!();

    let mut table = table(&[
        "Skill",
        "Category",
        "Level",
        "Criticality",
        "Frequency",
        "Evaluated",
        "Session",
    ]);
    for row in rows(&snapshot, &team.catalog) {
        table.add_row(row);
    }
    println!("{table}");
    Ok(())
}

fn rows(snapshot: &CollaboratorSnapshot, catalog: &Catalog) -> Vec<Vec<Cell>> {
    snapshot
        .skills
        .values()
        .map(|entry| {
            let assessment = &entry.assessment;
            let skill = catalog.skill(assessment.skill_id);
            let name = skill.map_or_else(|| format!("#{}", assessment.skill_id), |s| s.name.clone());
            let category = skill
                .and_then(|s| catalog.category(s.category_id))
                .map_or("-", |c| c.short_name());

            vec![
                Cell::new(name),
                Cell::new(category),
                Cell::new(assessment.level),
                Cell::new(assessment.criticality),
                Cell::new(assessment.frequency),
                Cell::new(format_instant(entry.evaluated_at)),
                Cell::new(entry.session_id),
            ]
        })
        .collect()
}
