//! Saving the decoded artifact under its versioned name.
//!
//! A save is a scoped acquire/release: the bytes are first materialised into
//! a temporary file inside the destination directory, that file is then
//! persisted under the derived name, and the temporary handle is gone by the
//! time the function returns. A failed write drops the handle, which deletes
//! the partial file, so no transient files pile up across repeated downloads.

use crate::config::ACCEPTED_EXTENSION;
use crate::error::DocFlowError;
use crate::pipeline::decode::DecodedArtifact;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Derive the download name by inserting `suffix` before the extension.
///
/// `report.docx` with `_v1` becomes `report_v1.docx`. A name without the
/// accepted extension just gets the suffix appended. Any directory part of
/// `original` is dropped, so the result is always a bare file name.
pub fn derive_download_name(original: &str, suffix: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original);
    match base.strip_suffix(ACCEPTED_EXTENSION) {
        Some(stem) => format!("{stem}{suffix}{ACCEPTED_EXTENSION}"),
        None => format!("{base}{suffix}"),
    }
}

/// Write `artifact` into `dir` under its suggested file name.
///
/// Only the final component of the suggested name is used, so the file
/// always lands directly inside `dir`.
///
/// Blocking; call it from `spawn_blocking` inside async code.
pub fn save_artifact(artifact: &DecodedArtifact, dir: &Path) -> Result<PathBuf, DocFlowError> {
    let file_name = Path::new(&artifact.file_name)
        .file_name()
        .filter(|name| Path::new(name) == Path::new(&artifact.file_name))
        .ok_or_else(|| DocFlowError::OutputWriteFailed {
            path: dir.join(&artifact.file_name),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "download name must be a plain file name",
            ),
        })?;
    let dest = dir.join(file_name);
    let write_err = |source: std::io::Error| DocFlowError::OutputWriteFailed {
        path: dest.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut handle = NamedTempFile::new_in(dir).map_err(write_err)?;
    debug!("Materialised transient artifact at {}", handle.path().display());
    handle.write_all(&artifact.bytes).map_err(write_err)?;
    handle.flush().map_err(write_err)?;

    handle.persist(&dest).map_err(|e| write_err(e.error))?;
    info!(
        "Saved {} ({} bytes) to {}",
        artifact.file_name,
        artifact.bytes.len(),
        dest.display()
    );
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DOCX_MEDIA_TYPE;
    use std::sync::Arc;

    fn artifact(name: &str, bytes: &[u8]) -> DecodedArtifact {
        DecodedArtifact {
            bytes: Arc::from(bytes.to_vec()),
            media_type: DOCX_MEDIA_TYPE,
            file_name: name.to_string(),
        }
    }

    #[test]
    fn derives_versioned_name() {
        assert_eq!(derive_download_name("report.docx", "_v1"), "report_v1.docx");
        assert_eq!(derive_download_name("a.b.docx", "_v1"), "a.b_v1.docx");
        assert_eq!(derive_download_name(".docx", "_v1"), "_v1.docx");
    }

    #[test]
    fn derivation_is_stable() {
        let first = derive_download_name("report.docx", "_v1");
        for _ in 0..3 {
            assert_eq!(derive_download_name("report.docx", "_v1"), first);
        }
    }

    #[test]
    fn only_the_trailing_extension_is_replaced() {
        assert_eq!(
            derive_download_name("x.docx.docx", "_v1"),
            "x.docx_v1.docx"
        );
    }

    #[test]
    fn name_without_extension_gets_plain_suffix() {
        assert_eq!(derive_download_name("README", "_v1"), "README_v1");
    }

    #[test]
    fn directory_parts_are_dropped_from_the_name() {
        assert_eq!(derive_download_name("../escaped.docx", "_v1"), "escaped_v1.docx");
        assert_eq!(derive_download_name("/etc/passwd.docx", "_v1"), "passwd_v1.docx");
        assert_eq!(derive_download_name("C:\\docs\\r.docx", "_v1"), "r_v1.docx");
        assert_eq!(derive_download_name("dir/README", "_v1"), "README_v1");
    }

    #[test]
    fn save_refuses_names_that_leave_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        for name in ["../escaped_v1.docx", "/tmp/abs_v1.docx", "sub/inner_v1.docx", ".."] {
            let err = save_artifact(&artifact(name, b"x"), &out).unwrap_err();
            assert!(
                matches!(err, DocFlowError::OutputWriteFailed { .. }),
                "{name}: {err}"
            );
        }
        assert!(!root.path().join("escaped_v1.docx").exists());
    }

    #[test]
    fn save_writes_only_the_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_artifact(&artifact("notes_v1.docx", b"PK\x03\x04"), dir.path()).unwrap();

        assert_eq!(path, dir.path().join("notes_v1.docx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04");

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "transient file must not linger");
    }

    #[test]
    fn repeated_saves_overwrite_in_place() {
        let dir = tempfile::tempdir().unwrap();
        save_artifact(&artifact("r_v1.docx", b"one"), dir.path()).unwrap();
        let path = save_artifact(&artifact("r_v1.docx", b"two"), dir.path()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"two");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/sub");
        let path = save_artifact(&artifact("n_v1.docx", b"x"), &nested).unwrap();
        assert!(path.exists());
    }
}
