//! Local record of the board items created by the last run.
//!
//! The file holds one item id per line in creation order. Writes go to
//! `<path>.tmp` and are renamed over the real file so a failed write never
//! leaves a truncated list behind. The temp file is flushed to disk before
//! the rename.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SyncError;

pub struct ItemStore {
    path: PathBuf,
}

impl ItemStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids recorded by the previous run. A missing file means there are none.
    pub fn load_item_ids(&self) -> Result<Vec<String>, SyncError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(SyncError::io(&self.path, e)),
        };
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Replace the file with `ids`, one per line.
    pub fn save_item_ids(&self, ids: &[String]) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        let mut contents = String::new();
        for id in ids {
            contents.push_str(id);
            contents.push('\n');
        }
        let tmp = self.tmp_path();
        if let Err(e) = write_synced(&tmp, &contents) {
            let _ = std::fs::remove_file(&tmp);
            return Err(SyncError::io(&tmp, e));
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(SyncError::io(&self.path, e));
        }
        debug!(path = %self.path.display(), count = ids.len(), "saved item ids");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn write_synced(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
