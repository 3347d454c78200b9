use serde::Deserialize;
use std::fs;
use std::io;
use tracing::debug;

use crate::storage::{ContainerStore, StoreError, StoreResult};

// ======================================================
// CONSTANTS
// ======================================================

/// Name of the builder state file inside a container's directory.
pub const STATE_FILE: &str = "brick.json";

/// Type tag written into every builder state file.
pub const CONTAINER_TYPE: &str = "brick 0.0.1";

// ======================================================
// DATA STRUCTURE
// ======================================================

/// A working container created and tracked by this tool. Other fields of the
/// state file are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Builder {
    #[serde(rename = "type")]
    pub kind: String,

    /// Resolved image ID. Empty when built from scratch.
    #[serde(default)]
    pub from_image_id: String,

    /// Human name of the working container.
    #[serde(default)]
    pub container: String,

    pub container_id: String,
}

// ======================================================
// COLLABORATOR TRAIT
// ======================================================

/// Source of builder-managed working containers.
pub trait BuilderSource {
    fn builders(&self) -> StoreResult<Vec<Builder>>;
}

// ======================================================
// STORE-BACKED SOURCE
// ======================================================

/// Finds builder containers by reading the state file kept in each storage
/// container's directory.
pub struct StoreBuilders<'a, S: ContainerStore> {
    store: &'a S,
}

impl<'a, S: ContainerStore> StoreBuilders<'a, S> {
    pub fn new(store: &'a S) -> Self {
        StoreBuilders { store }
    }
}

impl<S: ContainerStore> BuilderSource for StoreBuilders<'_, S> {
    fn builders(&self) -> StoreResult<Vec<Builder>> {
        let mut builders = Vec::new();

        for container in self.store.containers()? {
            let path = self
                .store
                .container_directory(&container.id)
                .join(STATE_FILE);

            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(StoreError::Io { path, source }),
            };

            let builder: Builder = match serde_json::from_str(&raw) {
                Ok(b) => b,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unparseable state file");
                    continue;
                }
            };

            if builder.kind != CONTAINER_TYPE {
                debug!(container = %container.id, kind = %builder.kind, "skipping foreign state file");
                continue;
            }

            if builder.container_id != container.id {
                debug!(
                    container = %container.id,
                    recorded = %builder.container_id,
                    "skipping state file recorded for another container"
                );
                continue;
            }

            builders.push(builder);
        }

        Ok(builders)
    }
}
