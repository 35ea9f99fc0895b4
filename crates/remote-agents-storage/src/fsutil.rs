//! Small filesystem helpers shared by the log backend.
//!
//! Every write goes through a temp-file-then-rename so a crash mid-write
//! never leaves a half-written JSON or jsonl file behind.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

/// Serialize `value` as pretty JSON and write it atomically to `path`.
pub async fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &bytes).await
}

/// Write `bytes` to `path` via a sibling `.tmp` file and rename.
pub async fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")
    ));
    {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
    }
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read `path` as JSON, returning `None` if it doesn't exist.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Append one line (`value` as JSON, plus `\n`) to the jsonl file at
/// `path`, creating it and its parent directory if necessary.
pub async fn append_jsonl_line<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

/// Read every line of a jsonl file, skipping and logging lines that fail
/// to parse rather than failing the whole read. Returns an empty vec if
/// the file doesn't exist.
pub async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let bytes = match fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let text = String::from_utf8_lossy(&bytes);
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(v) => out.push(v),
            Err(e) => tracing::warn!(lineno, error = %e, "skipping corrupt jsonl record"),
        }
    }
    Ok(out)
}

/// Rewrite a jsonl file from scratch, atomically.
pub async fn rewrite_jsonl<T: Serialize>(path: &Path, values: &[T]) -> Result<(), StorageError> {
    let mut bytes = Vec::new();
    for value in values {
        serde_json::to_writer(&mut bytes, value)?;
        bytes.push(b'\n');
    }
    atomic_write_bytes(path, &bytes).await
}
