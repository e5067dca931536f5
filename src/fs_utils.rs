use crate::error::SsmBatchError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a file in one shot through a sibling temp file and a rename.
/// - Creates the parent directory when missing.
/// - Refuses to write through a symlinked parent.
/// - Leaves any previous file untouched if writing fails.
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> Result<(), SsmBatchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
        let meta = fs::symlink_metadata(parent)?;
        if meta.file_type().is_symlink() {
            return Err(SsmBatchError::Io(std::io::Error::other(format!(
                "Refusing to write through symlinked directory: {}",
                parent.display()
            ))));
        }
    }

    let tmp_path = temp_sibling(path);
    let result = (|| -> Result<(), SsmBatchError> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}
