// src/file_manager.rs - Downloaded job artifacts in the cache directory
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct FileManager {
    cache_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: std::time::SystemTime,
}

/// A job's downloaded G-code. The backing file is deleted when this is dropped.
#[derive(Debug)]
pub struct JobArtifact {
    job_id: u64,
    file: NamedTempFile,
}

impl JobArtifact {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Async handle for streaming the download into the artifact.
    pub fn writer(&self) -> io::Result<fs::File> {
        Ok(fs::File::from_std(self.file.as_file().try_clone()?))
    }

    pub async fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(self.path()).await?.len())
    }
}

impl FileManager {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self { cache_dir: cache_dir.into() }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn create_artifact(&self, job_id: u64) -> io::Result<JobArtifact> {
        fs::create_dir_all(&self.cache_dir).await?;
        let file = tempfile::Builder::new()
            .prefix(&format!("job_{}_", job_id))
            .suffix(".gcode")
            .tempfile_in(&self.cache_dir)?;
        tracing::debug!("Created artifact for job {}: {}", job_id, file.path().display());
        Ok(JobArtifact { job_id, file })
    }

    /// Regular files currently in the cache directory.
    pub async fn list_files(&self) -> io::Result<Vec<FileInfo>> {
        let mut entries = fs::read_dir(&self.cache_dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push(FileInfo {
                    name: name.to_string(),
                    size: metadata.len(),
                    modified: metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                });
            }
        }

        Ok(files)
    }
}
