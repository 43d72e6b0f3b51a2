// Durable JSON storage for website trees

use crate::error::{Result, TreeError};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use webtree_scanner::WebsiteNode;

/// A single tree serialized as pretty JSON at a fixed path.
///
/// Saves go through a temporary file in the same directory followed by a
/// rename, so a crash mid-write leaves the previous tree intact.
#[derive(Debug, Clone)]
pub struct TreeStore {
    path: PathBuf,
}

impl TreeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<WebsiteNode> {
        if !self.exists() {
            return Err(TreeError::NotFound(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path)?;
        let tree = serde_json::from_str(&content)?;
        debug!("Loaded tree from {}", self.path.display());
        Ok(tree)
    }

    pub fn save(&self, tree: &WebsiteNode) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, tree)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| TreeError::Io(e.error))?;

        debug!("Saved {} nodes to {}", tree.node_count(), self.path.display());
        Ok(())
    }
}
