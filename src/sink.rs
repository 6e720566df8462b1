// ABOUTME: Output sink - writes a final answer to disk.
// ABOUTME: Creates parent directories and overwrites any existing file.

use std::path::Path;

use tracing::debug;

use crate::error::SinkError;

/// Write `answer` to `path` as UTF-8, creating parent directories as needed.
///
/// The write is not atomic; an interrupted write can leave a truncated file.
pub fn write_answer(path: impl AsRef<Path>, answer: &str) -> Result<(), SinkError> {
    let path = path.as_ref();
    let wrap = |source| SinkError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(wrap)?;
        }
    }

    std::fs::write(path, answer).map_err(wrap)?;
    debug!(path = %path.display(), bytes = answer.len(), "Wrote answer");
    Ok(())
}
