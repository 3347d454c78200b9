use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::builder::BuilderSource;
use crate::storage::{ContainerStore, StoreError};

/// Display name for containers that have no base image.
pub const BASE_IMAGE_NAME: &str = "scratch";

// ======================================================
// DATA MODEL
// ======================================================

/// One row of `brick containers` output.
///
/// Serialized field names are part of the JSON output contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    #[serde(rename = "id")]
    pub container_id: String,

    /// True if the container is one of our working containers.
    pub builder: bool,

    #[serde(rename = "imageid")]
    pub image_id: String,

    #[serde(rename = "imagename")]
    pub image_name: String,

    #[serde(rename = "containername")]
    pub container_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("error reading build containers")]
    Builders(#[source] StoreError),

    #[error("error reading list of all containers")]
    Containers(#[source] StoreError),
}

// ======================================================
// IMAGE NAME RESOLVER
// ======================================================

/// Maps image IDs to display names, asking the store at most once per ID.
///
/// Lives for a single listing; names can change between invocations.
pub struct ImageNames<'a, S: ContainerStore> {
    store: &'a S,
    seen: HashMap<String, String>,
}

impl<'a, S: ContainerStore> ImageNames<'a, S> {
    pub fn new(store: &'a S) -> Self {
        ImageNames {
            store,
            seen: HashMap::new(),
        }
    }

    /// Lookup failures and unnamed images resolve to an empty name.
    pub fn resolve(&mut self, image_id: &str) -> String {
        if image_id.is_empty() {
            return BASE_IMAGE_NAME.to_string();
        }

        if let Some(name) = self.seen.get(image_id) {
            return name.clone();
        }

        let name = match self.store.image(image_id) {
            Ok(image) => image.names.into_iter().next().unwrap_or_default(),
            Err(e) => {
                debug!(image = %image_id, error = %e, "image lookup failed");
                String::new()
            }
        };

        self.seen.insert(image_id.to_string(), name.clone());
        name
    }
}

// ======================================================
// RECONCILER
// ======================================================

/// Enumerate containers for display.
///
/// Without `all`, only our working containers are listed. With `all`, every
/// container in the store is listed once, flagged when it is also ours.
pub fn list_containers<B, S>(
    builders: &B,
    store: &S,
    all: bool,
) -> Result<Vec<ContainerRecord>, ListError>
where
    B: BuilderSource,
    S: ContainerStore,
{
    let ours = builders.builders().map_err(ListError::Builders)?;
    let mut names = ImageNames::new(store);

    if !all {
        let records = ours
            .into_iter()
            .map(|b| ContainerRecord {
                image_name: names.resolve(&b.from_image_id),
                container_id: b.container_id,
                builder: true,
                image_id: b.from_image_id,
                container_name: b.container,
            })
            .collect();
        return Ok(records);
    }

    let ours: HashSet<String> = ours.into_iter().map(|b| b.container_id).collect();

    let containers = store.containers().map_err(ListError::Containers)?;

    let records = containers
        .into_iter()
        .map(|c| ContainerRecord {
            builder: ours.contains(&c.id),
            image_name: names.resolve(&c.image),
            container_name: c.names.into_iter().next().unwrap_or_default(),
            container_id: c.id,
            image_id: c.image,
        })
        .collect();

    Ok(records)
}
