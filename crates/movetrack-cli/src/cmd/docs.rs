use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use movetrack_core::{
    catalog::Catalog,
    config::{Config, DocumentBackend},
    documents::{self, Document, DocumentGate, LocalDocumentStore},
    types::MilestoneKind,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum DocSubcommand {
    /// Register a document for a move (local registry only)
    Add {
        /// Move id or number (e.g. MV-000001)
        #[arg(value_name = "MOVE")]
        key: String,
        /// Document type tag, e.g. "Survey report"
        #[arg(long = "type", value_name = "TYPE")]
        document_type: String,
        /// Display name (defaults to the type)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Mark the document as approved
        #[arg(long)]
        approved: bool,
    },
    /// List the documents the document store holds for a move
    List {
        #[arg(value_name = "MOVE")]
        key: String,
    },
    /// Show which mandatory documents a milestone is still missing
    Check {
        #[arg(value_name = "MOVE")]
        key: String,
        kind: MilestoneKind,
    },
}

pub fn run(root: &Path, subcmd: DocSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let tracker = super::open_tracker(root)?;

    match subcmd {
        DocSubcommand::Add {
            key,
            document_type,
            name,
            location,
            approved,
        } => {
            if config.documents.backend != DocumentBackend::Local {
                anyhow::bail!("documents.backend is not 'local'; register documents in the document store");
            }
            let id = tracker.resolve(&key)?;
            let mut doc = Document::new(name.unwrap_or_else(|| document_type.clone()), document_type);
            doc.location = location;
            if approved {
                doc = doc.approved();
            }
            LocalDocumentStore::new(root)
                .add(id, doc.clone())
                .context("failed to register document")?;
            if json {
                return print_json(&doc);
            }
            println!("Registered '{}' ({}).", doc.name, doc.document_type);
        }
        DocSubcommand::List { key } => {
            let id = tracker.resolve(&key)?;
            let docs = documents::store_from_config(root, &config.documents).list_documents(id)?;
            if json {
                return print_json(&docs);
            }
            if docs.is_empty() {
                println!("No documents.");
                return Ok(());
            }
            let rows = docs
                .iter()
                .map(|d| {
                    vec![
                        d.document_type.clone(),
                        d.name.clone(),
                        d.status.to_string(),
                        or_dash(d.location.as_deref()),
                    ]
                })
                .collect();
            print_table(&["TYPE", "NAME", "STATUS", "LOCATION"], rows);
        }
        DocSubcommand::Check { key, kind } => {
            let id = tracker.resolve(&key)?;
            let store = documents::store_from_config(root, &config.documents);
            let catalog = Catalog::from_config(&config.catalog);
            let gate = DocumentGate::new(store.as_ref(), &catalog, &config.documents.match_policy);
            let report = gate.check(id, kind)?;
            if json {
                return print_json(&report);
            }
            if report.is_open() {
                println!("{}: all mandatory documents present.", catalog.label_for(kind));
            } else {
                println!("{}: missing mandatory documents:", catalog.label_for(kind));
                for missing in &report.missing {
                    println!("  - {missing}");
                }
            }
        }
    }
    Ok(())
}
