//! Filesystem helpers for publishing rendered clips.
//!
//! Clips are encoded into a hidden sibling of their final path and moved
//! into place only once FFmpeg succeeds, so a failed or cancelled render
//! never leaves a file at the output path.

use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Hidden in-progress path next to `dst`, e.g. `.short_0001.3f2a….part.mp4`.
pub fn partial_path(dst: &Path) -> PathBuf {
    let stem = dst
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let name = match dst.extension() {
        Some(ext) => format!(".{}.{}.part.{}", stem, Uuid::new_v4().simple(), ext.to_string_lossy()),
        None => format!(".{}.{}.part", stem, Uuid::new_v4().simple()),
    };
    dst.with_file_name(name)
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Tries a rename first and falls back to copy-and-delete on EXDEV.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Run `write` against a fresh partial path, then publish it at `dst`.
///
/// On any failure the partial file is removed and `dst` is left untouched.
pub async fn write_atomically<F, Fut>(dst: &Path, write: F) -> MediaResult<()>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = MediaResult<()>>,
{
    let partial = partial_path(dst);

    if let Err(e) = write(partial.clone()).await {
        remove_if_exists(&partial).await;
        return Err(e);
    }

    if let Err(e) = move_file(&partial, dst).await {
        remove_if_exists(&partial).await;
        return Err(MediaError::render_failure(format!(
            "failed to move clip into place: {}",
            e
        )));
    }

    Ok(())
}

/// Remove a file, ignoring a missing one.
pub async fn remove_if_exists(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Size of a file in bytes, or 0 if it cannot be read.
pub async fn file_size(path: impl AsRef<Path>) -> u64 {
    fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

async fn ensure_parent(dst: &Path) -> MediaResult<()> {
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// EXDEV is error code 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Copy next to dst so the final rename stays on one filesystem
    let staged = partial_path(dst);

    if let Err(e) = fs::copy(src, &staged).await {
        remove_if_exists(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staged, dst).await {
        remove_if_exists(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!(
            "Failed to remove source after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}
