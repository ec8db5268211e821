// SPDX-License-Identifier: GPL-3.0-or-later
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::debug;

/// Keeps the most recent image on local storage.
#[derive(Clone, Debug)]
pub(crate) struct ImageStore {
    path: PathBuf,
}

impl ImageStore {
    /// Create a store writing to `path`, creating the parent directory if needed.
    pub(crate) fn new(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Unable to create image directory {}", parent.display())
                })?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Replace the stored image with `data`.
    ///
    /// The data is written to a temporary file next to the destination first and then renamed
    /// over it, so readers never see a partially written image.
    pub(crate) fn save(&self, data: &[u8]) -> anyhow::Result<()> {
        let mut temp_name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);
        fs::write(&temp_path, data)
            .with_context(|| format!("Unable to write {}", temp_path.display()))?;
        if let Err(err) = fs::rename(&temp_path, &self.path) {
            // Best effort, the rename error is the one worth reporting.
            let _ = fs::remove_file(&temp_path);
            return Err(err).with_context(|| format!("Unable to replace {}", self.path.display()));
        }
        debug!(path = %self.path.display(), size = data.len(), "Saved image");
        Ok(())
    }
}
