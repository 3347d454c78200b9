use serde::de::DeserializeOwned;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{
    find_image, ContainerStore, StorageContainer, StorageImage, StoreError, StoreResult,
};

const CONTAINERS_INDEX: &str = "containers.json";
const IMAGES_INDEX: &str = "images.json";

struct ImageIndex {
    images: Vec<StorageImage>,
    by_id: HashMap<String, usize>,
}

/// Store backed by the on-disk containers-storage layout:
///
/// ```text
/// <root>/<driver>-containers/containers.json
/// <root>/<driver>-containers/<id>/userdata/
/// <root>/<driver>-images/images.json
/// ```
///
/// Index files are read lazily and at most once per instance.
pub struct DiskStore {
    root: PathBuf,
    driver: String,
    containers: OnceCell<Vec<StorageContainer>>,
    images: OnceCell<ImageIndex>,
}

impl DiskStore {
    pub fn open(root: impl Into<PathBuf>, driver: impl Into<String>) -> Self {
        DiskStore {
            root: root.into(),
            driver: driver.into(),
            containers: OnceCell::new(),
            images: OnceCell::new(),
        }
    }

    fn containers_dir(&self) -> PathBuf {
        self.root.join(format!("{}-containers", self.driver))
    }

    fn images_dir(&self) -> PathBuf {
        self.root.join(format!("{}-images", self.driver))
    }

    fn load_containers(&self) -> StoreResult<&Vec<StorageContainer>> {
        if let Some(containers) = self.containers.get() {
            return Ok(containers);
        }

        let containers: Vec<StorageContainer> =
            read_index(&self.containers_dir().join(CONTAINERS_INDEX))?;

        Ok(self.containers.get_or_init(|| containers))
    }

    fn load_images(&self) -> StoreResult<&ImageIndex> {
        if let Some(index) = self.images.get() {
            return Ok(index);
        }

        let images: Vec<StorageImage> = read_index(&self.images_dir().join(IMAGES_INDEX))?;
        let by_id = images
            .iter()
            .enumerate()
            .map(|(i, image)| (image.id.clone(), i))
            .collect();

        Ok(self.images.get_or_init(|| ImageIndex { images, by_id }))
    }
}

impl ContainerStore for DiskStore {
    fn containers(&self) -> StoreResult<Vec<StorageContainer>> {
        Ok(self.load_containers()?.clone())
    }

    fn image(&self, id: &str) -> StoreResult<StorageImage> {
        let index = self.load_images()?;
        find_image(&index.images, &index.by_id, id).cloned()
    }

    fn container_directory(&self, id: &str) -> PathBuf {
        self.containers_dir().join(id).join("userdata")
    }
}

/// Read a JSON index file. A missing file is an empty store.
fn read_index<T: DeserializeOwned>(path: &Path) -> StoreResult<Vec<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "index file absent, treating as empty");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_fresh_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::open(dir.path(), "overlay");

        assert!(store.containers().unwrap().is_empty());
        assert!(matches!(
            store.image("anything"),
            Err(StoreError::ImageNotFound(_))
        ));
    }

    #[test]
    fn test_reads_containers_and_images() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "overlay-containers/containers.json",
            r#"[
                {"id": "c1", "names": ["work1"], "image": "i1", "layer": "l1"},
                {"id": "c2", "image": ""}
            ]"#,
        );
        write(
            dir.path(),
            "overlay-images/images.json",
            r#"[{"id": "i1", "names": ["alpine:latest", "alpine:3"]}]"#,
        );

        let store = DiskStore::open(dir.path(), "overlay");
        let containers = store.containers().unwrap();

        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "c1");
        assert_eq!(containers[0].names, vec!["work1"]);
        assert!(containers[1].names.is_empty());
        assert_eq!(containers[1].image, "");

        let image = store.image("i1").unwrap();
        assert_eq!(image.names[0], "alpine:latest");
    }

    #[test]
    fn test_driver_selects_directories() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "vfs-containers/containers.json",
            r#"[{"id": "v1"}]"#,
        );

        assert_eq!(DiskStore::open(dir.path(), "vfs").containers().unwrap().len(), 1);
        assert!(DiskStore::open(dir.path(), "overlay").containers().unwrap().is_empty());
        assert_eq!(
            DiskStore::open(dir.path(), "vfs").container_directory("v1"),
            dir.path().join("vfs-containers").join("v1").join("userdata")
        );
    }

    #[test]
    fn test_malformed_index_names_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "overlay-containers/containers.json", "{not json");

        let err = DiskStore::open(dir.path(), "overlay").containers().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("containers.json"));
    }
}
