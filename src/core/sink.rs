use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;

use crate::session::ArtifactSink;

/// Writes captures into a directory, never leaving a half-written file behind
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&self, file_name: &str, png: &[u8]) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let mut file = tempfile::Builder::new()
            .prefix(".tilesnap-")
            .suffix(".png")
            .tempfile_in(&self.dir)?;
        file.write_all(png)?;
        file.flush()?;

        let path = self.dir.join(file_name);
        file.persist(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
