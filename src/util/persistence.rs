use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_json::Error as SerdeError;
use tracing::{debug, warn};

use crate::domain::app_state::PersistedState;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "Omsetku";
const APP_NAME: &str = "Omsetku";

fn data_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("state.json"))
}

pub fn load_persisted_state() -> Option<PersistedState> {
    load_from(&data_file()?)
}

pub fn save_persisted_state(state: &PersistedState) -> Result<(), PersistSaveError> {
    let path = data_file().ok_or(PersistSaveError::StorageUnavailable)?;
    save_to(&path, state)
}

/// Missing and unreadable files both load as `None`.
pub fn load_from(path: &Path) -> Option<PersistedState> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            debug!("no state at {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!("ignoring corrupt state at {}: {err}", path.display());
            None
        }
    }
}

pub fn save_to(path: &Path, state: &PersistedState) -> Result<(), PersistSaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json)?;
    debug!(
        "saved {} products, {} transactions to {}",
        state.products.len(),
        state.transactions.len(),
        path.display()
    );
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
