pub mod disk;

pub use disk::DiskStore;

use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

// ======================================================
// RECORDS
// ======================================================

/// A container as recorded by the storage backend. Index fields not listed
/// here are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageContainer {
    pub id: String,

    #[serde(default)]
    pub names: Vec<String>,

    /// ID of the image the container was created from. Empty for
    /// containers built from scratch.
    #[serde(default)]
    pub image: String,
}

/// An image as recorded by the storage backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageImage {
    pub id: String,

    #[serde(default)]
    pub names: Vec<String>,
}

// ======================================================
// ERRORS
// ======================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("image not known: {0}")]
    ImageNotFound(String),

    #[error("image reference {key} is ambiguous ({matches} matches)")]
    AmbiguousImage { key: String, matches: usize },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ======================================================
// COLLABORATOR TRAIT
// ======================================================

/// Read-only view of the container/image store.
pub trait ContainerStore {
    /// Every container the store knows about, in store order.
    fn containers(&self) -> StoreResult<Vec<StorageContainer>>;

    /// Look up image metadata by ID (or any key the backend accepts).
    fn image(&self, id: &str) -> StoreResult<StorageImage>;

    /// Per-container scratch directory, where builder state lives.
    fn container_directory(&self, id: &str) -> PathBuf;
}

// ======================================================
// IMAGE KEY RESOLUTION
// ======================================================

/// Resolve an image reference against a set of images: exact ID first, then
/// exact name, then a unique ID prefix.
pub(crate) fn find_image<'a>(
    images: &'a [StorageImage],
    by_id: &HashMap<String, usize>,
    key: &str,
) -> StoreResult<&'a StorageImage> {
    if key.is_empty() {
        return Err(StoreError::ImageNotFound(key.to_string()));
    }

    if let Some(&idx) = by_id.get(key) {
        return Ok(&images[idx]);
    }

    if let Some(image) = images.iter().find(|i| i.names.iter().any(|n| n == key)) {
        return Ok(image);
    }

    let prefixed: Vec<&StorageImage> = images
        .iter()
        .filter(|i| i.id.starts_with(key))
        .collect();

    match prefixed.as_slice() {
        [] => Err(StoreError::ImageNotFound(key.to_string())),
        [image] => Ok(image),
        many => Err(StoreError::AmbiguousImage {
            key: key.to_string(),
            matches: many.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, names: &[&str]) -> StorageImage {
        StorageImage {
            id: id.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn index(images: &[StorageImage]) -> HashMap<String, usize> {
        images
            .iter()
            .enumerate()
            .map(|(i, img)| (img.id.clone(), i))
            .collect()
    }

    #[test]
    fn test_find_image_by_id_name_and_prefix() {
        let images = vec![
            image("abc123", &["alpine:latest"]),
            image("abd456", &[]),
        ];
        let by_id = index(&images);

        assert_eq!(find_image(&images, &by_id, "abd456").unwrap().id, "abd456");
        assert_eq!(find_image(&images, &by_id, "alpine:latest").unwrap().id, "abc123");
        assert_eq!(find_image(&images, &by_id, "abc").unwrap().id, "abc123");
    }

    #[test]
    fn test_find_image_ambiguous_prefix() {
        let images = vec![image("abc123", &[]), image("abd456", &[])];
        let by_id = index(&images);

        match find_image(&images, &by_id, "ab") {
            Err(StoreError::AmbiguousImage { matches, .. }) => assert_eq!(matches, 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_find_image_missing_and_empty_key() {
        let images = vec![image("abc123", &[])];
        let by_id = index(&images);

        assert!(matches!(
            find_image(&images, &by_id, "zzz"),
            Err(StoreError::ImageNotFound(_))
        ));
        assert!(matches!(
            find_image(&images, &by_id, ""),
            Err(StoreError::ImageNotFound(_))
        ));
    }
}
