pub mod alphabetical;
pub mod dedup;
pub mod flatten;
pub mod inspect;
pub mod organize;
pub mod recategorize;

use anyhow::{Context, Result};
use dialoguer::Confirm;
use tracing::info;

/// Asks once before a run that writes to disk. `--yes` and `--dry-run`
/// skip the prompt.
pub fn confirm(yes: bool, dry_run: bool, prompt: &str) -> Result<bool> {
    if yes || dry_run {
        return Ok(true);
    }

    let accepted = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("failed to read confirmation")?;
    if !accepted {
        info!("cancelled, nothing written");
    }
    Ok(accepted)
}
