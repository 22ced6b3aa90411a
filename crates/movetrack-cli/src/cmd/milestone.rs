use crate::output::{or_dash, print_json};
use chrono::NaiveDate;
use clap::Subcommand;
use movetrack_core::{milestone::PlanUpdate, types::MilestoneKind};
use std::path::Path;

#[derive(Subcommand)]
pub enum MilestoneSubcommand {
    /// Edit the plan of a milestone (date, SLA, responsible, notes)
    Plan {
        /// Move id or number (e.g. MV-000001)
        #[arg(value_name = "MOVE")]
        key: String,
        /// Milestone kind (snake_case, e.g. pack_scheduling)
        kind: MilestoneKind,
        /// Planned date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// SLA duration in days
        #[arg(long)]
        sla_days: Option<u32>,
        /// Responsible party (empty string clears it)
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Complete the move's current milestone
    Complete {
        #[arg(value_name = "MOVE")]
        key: String,
        kind: MilestoneKind,
    },
}

pub fn run(
    root: &Path,
    subcmd: MilestoneSubcommand,
    actor: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        MilestoneSubcommand::Plan {
            key,
            kind,
            date,
            sla_days,
            responsible,
            notes,
        } => {
            let update = PlanUpdate {
                planned_date: date,
                sla_days,
                responsible,
                notes,
            };
            plan(root, &key, kind, update, actor, json)
        }
        MilestoneSubcommand::Complete { key, kind } => complete(root, &key, kind, actor, json),
    }
}

fn plan(
    root: &Path,
    key: &str,
    kind: MilestoneKind,
    update: PlanUpdate,
    actor: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let id = tracker.resolve(key)?;
    let milestone = tracker.edit_plan(id, kind, update, actor)?;

    if json {
        return print_json(&milestone);
    }
    println!("Updated {}.", tracker.catalog().label_for(kind));
    println!("  planned:     {}", or_dash(milestone.planned_date));
    println!("  sla days:    {}", milestone.sla_days);
    println!("  responsible: {}", or_dash(milestone.responsible.as_deref()));
    Ok(())
}

fn complete(
    root: &Path,
    key: &str,
    kind: MilestoneKind,
    actor: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let id = tracker.resolve(key)?;
    let completion = tracker.complete(id, kind, actor)?;

    if json {
        return print_json(&completion);
    }
    let mv = &completion.record;
    println!("Completed {}.", tracker.catalog().label_for(kind));
    if mv.closed_at.is_some() {
        println!("{} is closed.", mv.number);
    } else {
        println!("{} now at {} ({}%).", mv.number, mv.current_label, mv.progress);
    }
    if let Some(alert) = &completion.alert {
        println!("[{}] {}", alert.severity, alert.message);
    }
    Ok(())
}
