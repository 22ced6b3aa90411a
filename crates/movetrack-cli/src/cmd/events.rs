use crate::output::{or_dash, print_json, print_table};
use chrono::{DateTime, Utc};
use clap::Args;
use movetrack_core::{
    event::{Event, EventFilter},
    types::{EventCategory, EventKind},
};
use std::path::Path;
use uuid::Uuid;

#[derive(Args)]
pub struct EventsArgs {
    /// Move id or number (e.g. MV-000001)
    #[arg(value_name = "MOVE")]
    pub key: String,
    /// Only these event kinds (repeatable)
    #[arg(long = "kind")]
    pub kinds: Vec<EventKind>,
    #[arg(long)]
    pub category: Option<EventCategory>,
    /// Only events at or after this RFC 3339 timestamp
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
    /// Page size
    #[arg(long, default_value = "50")]
    pub limit: usize,
    /// Return events older than this event id
    #[arg(long)]
    pub before: Option<Uuid>,
    /// Follow cursors and print the complete history
    #[arg(long, conflicts_with = "before")]
    pub all: bool,
}

pub fn run(root: &Path, args: EventsArgs, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let id = tracker.resolve(&args.key)?;
    let filter = EventFilter {
        kinds: args.kinds,
        category: args.category,
        since: args.since,
    };

    if args.all {
        let events = tracker
            .history(id, filter)?
            .page_size(args.limit)
            .collect_all()?;
        if json {
            return print_json(&events);
        }
        print_events(&events);
        return Ok(());
    }

    let page = tracker.events_page(id, &filter, args.before, args.limit)?;
    if json {
        return print_json(&page);
    }
    print_events(&page.events);
    if let Some(cursor) = page.next_cursor {
        println!("\nMore: --before {cursor}");
    }
    Ok(())
}

fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No events.");
        return;
    }
    let rows = events
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.kind.to_string(),
                e.category.to_string(),
                or_dash(e.actor.as_deref()),
                e.description.clone(),
            ]
        })
        .collect();
    print_table(&["TIME", "KIND", "CATEGORY", "ACTOR", "DESCRIPTION"], rows);
}
