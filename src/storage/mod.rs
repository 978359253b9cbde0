use crate::error::{AppError, Result};
use crate::models::RunReport;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE_NAME: &str = "run_summary.json";

/// Per-turn output files under one directory. Writing the same turn twice
/// replaces the earlier file.
pub struct TurnStore {
    dir: PathBuf,
}

impl TurnStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!(
                "Failed to create output directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn response_path(&self, turn: usize) -> PathBuf {
        self.dir.join(format!("turn_{}_response.txt", turn))
    }

    pub fn artifact_path(&self, turn: usize, extension: &str) -> PathBuf {
        self.dir
            .join(format!("turn_{}_artifact_code.{}", turn, extension))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FILE_NAME)
    }

    pub fn save_response(&self, turn: usize, text: &str) -> Result<PathBuf> {
        let path = self.response_path(turn);
        write_file(&path, text)?;
        tracing::info!(turn, path = %path.display(), "saved response");
        Ok(path)
    }

    pub fn save_artifact(&self, turn: usize, code: &str, extension: &str) -> Result<PathBuf> {
        let path = self.artifact_path(turn, extension);
        write_file(&path, code)?;
        tracing::info!(turn, path = %path.display(), "saved artifact");
        Ok(path)
    }

    pub fn save_summary(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.summary_path();
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| AppError::Storage(format!("Failed to serialize run summary: {}", e)))?;
        write_file(&path, &json)?;
        Ok(path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", path.display(), e)))
}
