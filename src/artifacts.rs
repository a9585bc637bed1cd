//! Persistence of generated files (nginx config, Procfile)

use crate::error::{LaunchError, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes a generated artifact, replacing any previous content.
pub trait ArtifactWriter {
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
}

/// Writes artifacts to the filesystem, creating parent directories
#[derive(Debug, Clone, Copy, Default)]
pub struct FsWriter;

impl ArtifactWriter for FsWriter {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let fs_err = |source: std::io::Error| LaunchError::Filesystem {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(fs_err)?;
        }
        std::fs::write(path, contents).map_err(fs_err)?;

        info!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
        Ok(())
    }
}

/// Keeps artifacts in memory instead of writing them
#[derive(Debug, Default)]
pub struct DryRunWriter {
    artifacts: RefCell<Vec<(PathBuf, String)>>,
}

impl DryRunWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts in the order they would have been written
    pub fn artifacts(&self) -> Vec<(PathBuf, String)> {
        self.artifacts.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.borrow().is_empty()
    }
}

impl ArtifactWriter for DryRunWriter {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        debug!(path = %path.display(), bytes = contents.len(), "Skipping write (dry run)");
        self.artifacts
            .borrow_mut()
            .push((path.to_path_buf(), contents.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_writer_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/nginx/nginx.conf");

        FsWriter.write(&path, "daemon off;").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "daemon off;");
    }

    #[test]
    fn test_fs_writer_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("procfile");
        std::fs::write(&path, "old content that is longer than the new one").unwrap();

        FsWriter.write(&path, "nginx: nginx").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "nginx: nginx");
    }

    #[test]
    fn test_fs_writer_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be written as a file
        let err = FsWriter.write(dir.path(), "x").unwrap_err();

        match err {
            LaunchError::Filesystem { path, .. } => assert_eq!(path, dir.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dry_run_records_in_order() {
        let writer = DryRunWriter::new();
        assert!(writer.is_empty());

        writer.write(Path::new("/a"), "1").unwrap();
        writer.write(Path::new("/b"), "2").unwrap();

        let artifacts = writer.artifacts();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0], (PathBuf::from("/a"), "1".to_string()));
        assert_eq!(artifacts[1].0, PathBuf::from("/b"));
    }
}
