//! # File Primitives
//!
//! The only three ways this crate changes a file.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write_atomic   temp file ─► fsync ─► rename over target ─► fsync dir   │
//! │                 readers see the old file or the new one, never half    │
//! │                                                                         │
//! │  append         newline guard ─► write rows ─► fsync                    │
//! │                 a failed write is truncated back to the old length      │
//! │                                                                         │
//! │  truncate_to    shrink back to a recorded length ─► fsync               │
//! │                 used only to undo an append                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Marker shared by every temp file name, see `remove_stale_temp_files`.
const TEMP_MARKER: &str = ".tmp.";

fn temp_path(target: &Path) -> io::Result<PathBuf> {
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target must be a file"))?;
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(target.with_file_name(format!(
        ".{}{}{}.{}",
        file_name,
        TEMP_MARKER,
        std::process::id(),
        counter
    )))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// =============================================================================
// Atomic Replace
// =============================================================================

/// Replaces `target` with `contents` atomically and durably.
pub async fn write_atomic(target: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = temp_path(target)?;

    let result = async {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, target).await
    }
    .await;

    if let Err(err) = result {
        if fs::remove_file(&tmp).await.is_err() {
            debug!(path = %tmp.display(), "Temp file already gone");
        }
        return Err(err);
    }

    sync_dir(parent_dir(target)).await
}

/// Flushes a directory entry table so renames and removals survive a crash.
#[cfg(unix)]
pub async fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
pub async fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

// =============================================================================
// Append
// =============================================================================

/// Appends `rows` to `path` and returns the file length before the append.
///
/// A missing or empty file gets `header` first. If the file does not end in
/// a newline, one is written before the rows so that a torn last row stays
/// on its own line.
pub async fn append(path: &Path, header: &[u8], rows: &[u8]) -> io::Result<u64> {
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .await?;
    let len = file.metadata().await?.len();

    let mut buf = Vec::with_capacity(header.len() + rows.len() + 1);
    if len == 0 {
        buf.extend_from_slice(header);
    } else if !ends_with_newline(&mut file, len).await? {
        warn!(path = %path.display(), "File ends in a torn row, isolating it");
        buf.push(b'\n');
    }
    buf.extend_from_slice(rows);

    let result = async {
        file.write_all(&buf).await?;
        file.flush().await?;
        file.sync_data().await
    }
    .await;

    if let Err(err) = result {
        if let Err(undo) = file.set_len(len).await {
            warn!(path = %path.display(), error = %undo, "Could not undo failed append");
        }
        return Err(err);
    }

    if len == 0 {
        sync_dir(parent_dir(path)).await?;
    }
    Ok(len)
}

async fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    file.seek(SeekFrom::Start(len - 1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

/// Shrinks `path` back to `len` bytes. Returns whether anything was cut.
///
/// A file that is missing or already no longer than `len` is left alone.
pub async fn truncate_to(path: &Path, len: u64) -> io::Result<bool> {
    let current = match fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if current <= len {
        return Ok(false);
    }

    let file = OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await?;
    file.sync_all().await?;
    Ok(true)
}

// =============================================================================
// Reads & Housekeeping
// =============================================================================

/// Current length of a file, zero when it does not exist.
pub async fn file_len(path: &Path) -> io::Result<u64> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(err) => Err(err),
    }
}

/// Reads a whole file, `None` when it does not exist.
pub async fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Removes a file if present. Returns whether it existed.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Deletes temp files left behind by an interrupted `write_atomic`.
pub async fn remove_stale_temp_files(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') && name.contains(TEMP_MARKER) {
            fs::remove_file(entry.path()).await?;
            debug!(file = name, "Removed stale temp file");
            removed += 1;
        }
    }
    Ok(removed)
}

// =============================================================================
// Unit Tests
// =============================================================================
