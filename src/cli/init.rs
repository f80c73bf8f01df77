//! Init command - write a starter configuration

use crate::cli::style::{Stylize, check};
use anstream::println;
use dialoguer::Confirm;
use std::path::Path;
use testship::config::{ConfigFile, DEFAULT_CONFIG_FILE};
use testship::error::{Error, Result};

/// Write `testship.json` into `dir`
pub async fn run_init(dir: &Path, force: bool) -> Result<()> {
    let path = dir.join(DEFAULT_CONFIG_FILE);

    if !force && tokio::fs::try_exists(&path).await? {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?;
        if !overwrite {
            println!("Aborted");
            return Ok(());
        }
    }

    tokio::fs::create_dir_all(dir).await?;
    let mut contents = serde_json::to_string_pretty(&ConfigFile::template())?;
    contents.push('\n');
    tokio::fs::write(&path, contents).await?;

    println!("{} Created {}", check(), path.display().accent());
    println!();
    println!("{}", "Next steps:".emphasis());
    println!("  1. Fill in your username and access key under {}", "auth".accent());
    println!("  2. Point {} at your test project", "run_settings.project_dir".accent());
    println!("  3. Run {}", "testship run".accent());
    Ok(())
}
