use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Subcommand;
use movetrack_core::{
    moves::NewMove,
    timeline::SlaReport,
    types::{MoveType, Priority},
};
use std::path::Path;

#[derive(Subcommand)]
pub enum MoveSubcommand {
    /// Register a new move, starting at its first milestone
    Create {
        /// Move type: domestic, international_sea, international_air
        #[arg(long = "type", value_name = "TYPE", default_value = "domestic")]
        move_type: MoveType,
        /// Priority: low, medium, high, urgent
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Client name
        #[arg(long)]
        client: Option<String>,
        /// Estimated completion date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        eta: Option<NaiveDate>,
    },
    /// List moves ordered by number
    List {
        /// Include closed moves
        #[arg(long)]
        all: bool,
    },
    /// Show a move and its recorded milestones
    Show {
        /// Move id or number (e.g. MV-000001)
        #[arg(value_name = "MOVE")]
        key: String,
    },
}

pub fn run(
    root: &Path,
    subcmd: MoveSubcommand,
    actor: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        MoveSubcommand::Create {
            move_type,
            priority,
            client,
            eta,
        } => create(
            root,
            NewMove {
                move_type,
                priority,
                client,
                estimated_completion: eta,
            },
            actor,
            json,
        ),
        MoveSubcommand::List { all } => list(root, all, json),
        MoveSubcommand::Show { key } => show(root, &key, json),
    }
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn create(root: &Path, new: NewMove, actor: Option<&str>, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let mv = tracker
        .create_move(new, actor)
        .context("failed to create move")?;
    let summary = mv.summary(tracker.catalog());

    if json {
        print_json(&summary)?;
    } else {
        println!(
            "Created move {} ({}), current milestone: {}",
            summary.number, summary.move_type, summary.current_label
        );
        println!("  id: {}", summary.id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, include_closed: bool, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let moves = tracker.list_moves(include_closed)?;

    if json {
        return print_json(&moves);
    }
    if moves.is_empty() {
        println!("No moves.");
        return Ok(());
    }

    let rows = moves
        .iter()
        .map(|m| {
            vec![
                m.number.clone(),
                m.move_type.to_string(),
                m.priority.to_string(),
                m.current_label.clone(),
                format!("{}%", m.progress),
                or_dash(m.client.as_deref()),
            ]
        })
        .collect();
    print_table(
        &["NUMBER", "TYPE", "PRIORITY", "CURRENT", "PROGRESS", "CLIENT"],
        rows,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let id = tracker.resolve(key)?;
    let detail = tracker.move_detail(id)?;

    if json {
        return print_json(&detail);
    }

    let s = &detail.summary;
    println!("{} ({})", s.number, s.id);
    println!("  type:      {}", s.move_type);
    println!("  priority:  {}", s.priority);
    println!("  client:    {}", or_dash(s.client.as_deref()));
    println!("  current:   {}", s.current_label);
    println!("  progress:  {}%", s.progress);
    println!("  eta:       {}", or_dash(s.estimated_completion));
    if let Some(closed) = s.closed_at {
        println!("  closed:    {}", closed.format("%Y-%m-%d %H:%M"));
    }

    if detail.milestones.is_empty() {
        return Ok(());
    }
    println!();
    let rows = detail
        .milestones
        .iter()
        .map(|m| {
            vec![
                tracker.catalog().label_for(m.kind).to_string(),
                or_dash(m.planned_date),
                or_dash(m.actual_date.map(|d| d.date_naive())),
                if m.completed { "yes" } else { "no" }.to_string(),
                or_dash(m.responsible.as_deref()),
            ]
        })
        .collect();
    print_table(&["MILESTONE", "PLANNED", "ACTUAL", "DONE", "RESPONSIBLE"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// timeline / sla
// ---------------------------------------------------------------------------

pub fn timeline(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let id = tracker.resolve(key)?;
    let timeline = tracker.timeline(id)?;

    if json {
        return print_json(&timeline);
    }

    println!(
        "{} ({}) progress {}%, SLA compliance {}%{}",
        timeline.number,
        timeline.move_type,
        timeline.progress,
        timeline.compliance,
        if timeline.closed { ", closed" } else { "" }
    );
    let rows = timeline
        .entries
        .iter()
        .map(|e| {
            let marker = if e.is_current {
                ">"
            } else if e.milestone.completed {
                "x"
            } else {
                " "
            };
            vec![
                format!("{marker} {}", e.label),
                or_dash(e.milestone.planned_date),
                or_dash(e.milestone.actual_date.map(|d| d.date_naive())),
                e.sla.status.to_string(),
                or_dash(e.sla.days_delta),
            ]
        })
        .collect();
    print_table(&["MILESTONE", "PLANNED", "ACTUAL", "SLA", "DELTA"], rows);
    Ok(())
}

pub fn sla(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let id = tracker.resolve(key)?;
    let report = SlaReport::from(&tracker.timeline(id)?);

    if json {
        return print_json(&report);
    }

    println!("SLA compliance: {}%", report.compliance);
    if let Some(current) = &report.current {
        println!(
            "Current: {} {} ({})",
            tracker.catalog().label_for(current.kind),
            current.reading.status,
            or_dash(current.reading.days_delta)
        );
    }
    Ok(())
}
