use crate::types::{ClassifiedItem, IntelError, RawItem, Recommendation, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const POSTS_FILE: &str = "x_data.json";
pub const ARTICLES_FILE: &str = "rss_data.json";
pub const ANALYZED_FILE: &str = "analyzed_data.json";
pub const RECOMMENDATIONS_FILE: &str = "recommendations.json";

/// Write `contents` next to `path` and rename it into place, so readers
/// never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let persist_err = |source: std::io::Error| IntelError::Persist {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(persist_err)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(persist_err)?;
    tmp.write_all(contents).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;

    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &body)
}

/// Load a JSON array record by record. A missing file is an empty batch;
/// records that do not deserialize are skipped with a warning.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Input {} not found, treating as empty", path.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Could not read {} ({}), treating as empty", path.display(), e);
            return Vec::new();
        }
    };

    let values: Vec<serde_json::Value> = match serde_json::from_str(&content) {
        Ok(values) => values,
        Err(e) => {
            warn!("{} is not a JSON array ({}), treating as empty", path.display(), e);
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed record #{} in {}: {}", idx, path.display(), e);
                None
            }
        })
        .collect()
}

/// Raw items additionally need a non-empty identity.
pub fn read_raw_items(path: &Path) -> Vec<RawItem> {
    read_records::<RawItem>(path)
        .into_iter()
        .filter(|item| {
            let valid = !item.identity.trim().is_empty();
            if !valid {
                warn!("Skipping {} record without identity in {}", item.source_kind, path.display());
            }
            valid
        })
        .collect()
}

/// Run artifacts of one data directory
pub struct RunState {
    data_dir: PathBuf,
}

impl RunState {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn save_posts(&self, posts: &[RawItem]) -> Result<()> {
        write_json(&self.path(POSTS_FILE), posts)?;
        info!("Saved {} posts", posts.len());
        Ok(())
    }

    pub fn save_articles(&self, articles: &[RawItem]) -> Result<()> {
        write_json(&self.path(ARTICLES_FILE), articles)?;
        info!("Saved {} articles", articles.len());
        Ok(())
    }

    pub fn load_posts(&self) -> Vec<RawItem> {
        read_raw_items(&self.path(POSTS_FILE))
    }

    pub fn load_articles(&self) -> Vec<RawItem> {
        read_raw_items(&self.path(ARTICLES_FILE))
    }

    pub fn save_analyzed(&self, items: &[ClassifiedItem]) -> Result<()> {
        write_json(&self.path(ANALYZED_FILE), items)?;
        info!("Saved {} classified items", items.len());
        Ok(())
    }

    pub fn load_analyzed(&self) -> Vec<ClassifiedItem> {
        read_records(&self.path(ANALYZED_FILE))
    }

    pub fn save_recommendations(&self, recommendations: &[Recommendation]) -> Result<()> {
        write_json(&self.path(RECOMMENDATIONS_FILE), recommendations)
    }

    pub fn load_recommendations(&self) -> Vec<Recommendation> {
        read_records(&self.path(RECOMMENDATIONS_FILE))
    }
}
