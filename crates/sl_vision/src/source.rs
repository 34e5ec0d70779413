//! 帧来源

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sl_core::{Result, SignLoomError};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 逐帧提供编码后的图像
#[async_trait]
pub trait FrameSource: Send {
    /// 下一帧，来源耗尽时返回 None
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// 按文件名顺序回放目录中的图像帧
pub struct DirectoryFrameSource {
    frames: Vec<PathBuf>,
    cursor: usize,
    /// 帧间间隔
    delay: Duration,
}

impl DirectoryFrameSource {
    pub fn open(dir: impl AsRef<Path>, delay: Duration) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SignLoomError::Config(format!(
                "frame directory not found: {}",
                dir.display()
            )));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_frame {
                frames.push(path);
            }
        }
        frames.sort();

        tracing::debug!(count = frames.len(), dir = %dir.display(), "frame directory opened");
        Ok(Self {
            frames,
            cursor: 0,
            delay,
        })
    }

    /// 帧总数
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        if self.cursor > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.cursor += 1;
        let bytes = tokio::fs::read(path).await?;
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_frames_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002.png"), b"second").unwrap();
        std::fs::write(dir.path().join("001.PNG"), b"first").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let mut source = DirectoryFrameSource::open(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.next_frame().await.unwrap().unwrap(), b"first");
        assert_eq!(source.next_frame().await.unwrap().unwrap(), b"second");
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[test]
    fn test_missing_directory() {
        let err = DirectoryFrameSource::open("/nonexistent/frames", Duration::ZERO);
        assert!(matches!(err, Err(SignLoomError::Config(_))));
    }
}
