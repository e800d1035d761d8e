//! # Pending Publication State
//!
//! Transactions whose outcome was unknown when `mcred publish` exited are
//! kept in a JSON file so the next run reconciles them before broadcasting
//! again. A missing file means nothing is pending.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use mcred_core::TermId;
use mcred_state::{PublicationRegistry, UnresolvedTransaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    unresolved: BTreeMap<TermId, UnresolvedTransaction>,
}

/// Build a registry seeded from the state file at `path`.
pub fn load_registry(path: &Path) -> Result<PublicationRegistry> {
    if !path.exists() {
        return Ok(PublicationRegistry::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state: StateFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    if !state.unresolved.is_empty() {
        tracing::info!(
            path = %path.display(),
            pending = state.unresolved.len(),
            "loaded unresolved transactions"
        );
    }
    Ok(PublicationRegistry::with_unresolved(state.unresolved))
}

/// Write the registry's unresolved transactions to `path`. An empty set
/// removes the file.
pub fn save_registry(path: &Path, registry: &PublicationRegistry) -> Result<()> {
    let state = StateFile {
        unresolved: registry.unresolved_all(),
    };
    if state.unresolved.is_empty() {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove state file {}", path.display()))?;
        }
        return Ok(());
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(&state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("failed to write state file {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace state file {}", path.display()))?;
    Ok(())
}
