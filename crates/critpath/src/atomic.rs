//! Crash-safe file replacement.
//!
//! Content is written to a sibling `.tmp` file, flushed, and renamed over the
//! target. On POSIX filesystems the rename is atomic, so readers observe either
//! the previous file or the new one, never a partial write.

use crate::error::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Atomically replace `path` with `contents`, creating parent directories.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = make_temp_path(path);
    if let Err(e) = write_temp_file(&temp_path, contents).await {
        // Best-effort cleanup of temp file
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// `file.json` becomes `file.json.tmp`, `file` becomes `file.tmp`.
fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

async fn write_temp_file(temp_path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = File::create(temp_path).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
