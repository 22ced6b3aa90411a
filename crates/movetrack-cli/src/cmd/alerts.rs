use crate::output::{print_json, print_table};
use clap::Subcommand;
use movetrack_core::alert::Alert;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum AlertSubcommand {
    /// List alerts for a move, newest first
    List {
        /// Move id or number (e.g. MV-000001)
        #[arg(value_name = "MOVE")]
        key: String,
        /// Only unresolved alerts
        #[arg(long)]
        active: bool,
    },
    /// Check the move's current milestone and raise an alert if it is delayed
    Evaluate {
        #[arg(value_name = "MOVE")]
        key: String,
    },
    /// Resolve an alert
    Resolve { id: Uuid },
    /// Acknowledge an alert without resolving it
    Ack { id: Uuid },
}

pub fn run(
    root: &Path,
    subcmd: AlertSubcommand,
    actor: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    match subcmd {
        AlertSubcommand::List { key, active } => {
            let id = tracker.resolve(&key)?;
            let alerts = tracker.alerts(id, active)?;
            if json {
                return print_json(&alerts);
            }
            print_alerts(&alerts);
        }
        AlertSubcommand::Evaluate { key } => {
            let id = tracker.resolve(&key)?;
            let raised = tracker.evaluate(id)?;
            if json {
                return print_json(&serde_json::json!({ "raised": raised }));
            }
            match raised {
                Some(alert) => println!("Raised [{}] {}", alert.severity, alert.message),
                None => println!("No new alert."),
            }
        }
        AlertSubcommand::Resolve { id } => {
            let alert = tracker.resolve_alert(id, actor)?;
            if json {
                return print_json(&alert);
            }
            println!("Resolved alert {}.", alert.id);
        }
        AlertSubcommand::Ack { id } => {
            let alert = tracker.acknowledge_alert(id, actor)?;
            if json {
                return print_json(&alert);
            }
            println!("Acknowledged alert {}.", alert.id);
        }
    }
    Ok(())
}

pub fn sweep(root: &Path, json: bool) -> anyhow::Result<()> {
    let tracker = super::open_tracker(root)?;
    let report = tracker.sweep()?;
    if json {
        return print_json(&report);
    }
    println!(
        "Evaluated {} open move(s), raised {} alert(s).",
        report.evaluated,
        report.raised.len()
    );
    if report.skipped > 0 {
        println!("Skipped {} move(s) modified concurrently.", report.skipped);
    }
    for alert in &report.raised {
        println!("  [{}] {}", alert.severity, alert.message);
    }
    Ok(())
}

fn print_alerts(alerts: &[Alert]) {
    if alerts.is_empty() {
        println!("No alerts.");
        return;
    }
    let rows = alerts
        .iter()
        .map(|a| {
            let state = if a.resolved {
                "resolved"
            } else if a.acknowledged_at.is_some() {
                "acknowledged"
            } else {
                "open"
            };
            vec![
                a.id.to_string(),
                a.severity.to_string(),
                state.to_string(),
                a.raised_at.format("%Y-%m-%d").to_string(),
                a.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "SEVERITY", "STATE", "RAISED", "TITLE"], rows);
}
