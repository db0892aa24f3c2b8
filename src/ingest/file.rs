//! JPEG directory frame source.
//!
//! Plays back a directory of JPEG stills in name order, one per
//! `next_frame` call. When the directory is exhausted the source reports
//! unhealthy and `next_frame` fails; the pipeline treats that as source
//! exhaustion and shuts the run down once its retries are spent.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceStats};

pub struct FileSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next_index: usize,
    frame_count: u64,
}

impl FileSource {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: PathBuf::from(dir),
            files: Vec::new(),
            next_index: 0,
            frame_count: 0,
        }
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| anyhow!("failed to read frame directory {}: {}", self.dir.display(), e))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("jpg") | Some("jpeg")
                )
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(anyhow!(
                "frame directory {} contains no JPEG files",
                self.dir.display()
            ));
        }

        log::info!(
            "FileSource: {} frames queued from {}",
            files.len(),
            self.dir.display()
        );
        self.files = files;
        self.next_index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let Some(path) = self.files.get(self.next_index) else {
            return Err(anyhow!(
                "file source exhausted after {} frames",
                self.frame_count
            ));
        };
        let bytes = fs::read(path)
            .map_err(|e| anyhow!("failed to read frame {}: {}", path.display(), e))?;
        let frame = Frame::decode_jpeg(&bytes)
            .map_err(|e| anyhow!("failed to decode frame {}: {}", path.display(), e))?;

        self.next_index += 1;
        self.frame_count += 1;
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.next_index < self.files.len()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.dir.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_jpeg(dir: &std::path::Path, name: &str, width: u32, height: u32) {
        let bytes = Frame::blank(width, height).encode_jpeg().unwrap();
        fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn plays_frames_in_name_order_then_exhausts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_jpeg(dir.path(), "frame_001.jpg", 32, 24);
        write_jpeg(dir.path(), "frame_002.jpg", 48, 36);
        fs::write(dir.path().join("notes.txt"), b"ignored")?;

        let mut source = FileSource::new(dir.path().to_str().unwrap());
        source.connect()?;

        assert_eq!(source.next_frame()?.width(), 32);
        assert_eq!(source.next_frame()?.width(), 48);
        assert!(!source.is_healthy());
        assert!(source.next_frame().is_err());
        Ok(())
    }

    #[test]
    fn empty_directory_fails_at_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = FileSource::new(dir.path().to_str().unwrap());
        assert!(source.connect().is_err());
        Ok(())
    }
}
