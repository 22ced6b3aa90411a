use anyhow::Context;
use movetrack_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing movetrack in: {}", root.display());

    for dir in [paths::MOVETRACK_DIR, paths::DOCUMENTS_DIR] {
        let p = root.join(dir);
        io::ensure_dir(&p).with_context(|| format!("failed to create {}", p.display()))?;
    }

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    // Opening the tracker creates the database and its tables.
    let existed = paths::db_path(root).exists();
    super::open_tracker(root)?;
    if existed {
        println!("  exists:  {}", paths::DB_FILE);
    } else {
        println!("  created: {}", paths::DB_FILE);
    }

    io::ensure_gitignore_entry(root, paths::DB_FILE).context("failed to update .gitignore")?;

    println!("\nmovetrack initialized. Next: movetrack move create --type domestic");
    Ok(())
}
