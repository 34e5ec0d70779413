//! 识别器选择与降级路由

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sl_core::{Result, SignLoomError};

use crate::detector::SignDetector;

/// 识别器模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// 只用外部关键点检测器，不可用时启动失败
    Landmark,
    /// 只用模拟识别器
    Mock,
    /// 优先关键点检测器，不可用时降级为模拟识别器
    #[default]
    Auto,
}

impl std::str::FromStr for DetectorMode {
    type Err = SignLoomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landmark" => Ok(Self::Landmark),
            "mock" => Ok(Self::Mock),
            "auto" => Ok(Self::Auto),
            other => Err(SignLoomError::Config(format!("unknown detector mode: {other}"))),
        }
    }
}

/// 候选识别器
struct Candidate {
    /// 优先级 (越小越优先)
    priority: u8,
    detector: Arc<dyn SignDetector>,
}

/// 降级链：按优先级探测，第一个可用的识别器胜出
pub struct DetectorChain {
    candidates: Vec<Candidate>,
}

impl DetectorChain {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    /// 按模式组装降级链
    pub fn for_mode(
        mode: DetectorMode,
        landmark: Option<Arc<dyn SignDetector>>,
        mock: Arc<dyn SignDetector>,
    ) -> Result<Self> {
        let mut chain = Self::new();
        match mode {
            DetectorMode::Landmark => {
                let landmark = landmark.ok_or_else(|| {
                    SignLoomError::Config("landmark mode requires a detector endpoint".to_string())
                })?;
                chain.push(0, landmark);
            }
            DetectorMode::Mock => chain.push(0, mock),
            DetectorMode::Auto => {
                if let Some(landmark) = landmark {
                    chain.push(0, landmark);
                }
                chain.push(1, mock);
            }
        }
        Ok(chain)
    }

    /// 添加候选
    pub fn push(&mut self, priority: u8, detector: Arc<dyn SignDetector>) {
        self.candidates.push(Candidate { priority, detector });
        self.candidates.sort_by_key(|c| c.priority);
    }

    /// 候选名称 (按优先级)
    pub fn names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.detector.name()).collect()
    }

    /// 选出第一个探测成功的识别器
    pub async fn select(&self) -> Result<Arc<dyn SignDetector>> {
        let mut last_error = None;
        for candidate in &self.candidates {
            match candidate.detector.probe().await {
                Ok(()) => {
                    tracing::info!(detector = candidate.detector.name(), "detector selected");
                    return Ok(candidate.detector.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        detector = candidate.detector.name(),
                        error = %e,
                        "detector unavailable, falling back"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => SignLoomError::Detector(format!("no detector available: {e}")),
            None => SignLoomError::Detector("no detector configured".to_string()),
        })
    }
}

impl Default for DetectorChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sl_core::SignDetection;

    struct StubDetector {
        name: &'static str,
        healthy: bool,
    }

    #[async_trait]
    impl SignDetector for StubDetector {
        fn name(&self) -> &str {
            self.name
        }

        async fn detect(&self, _image: &[u8]) -> Result<SignDetection> {
            Ok(SignDetection::none())
        }

        async fn probe(&self) -> Result<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(SignLoomError::Extractor("connection refused".to_string()))
            }
        }
    }

    fn stub(name: &'static str, healthy: bool) -> Arc<dyn SignDetector> {
        Arc::new(StubDetector { name, healthy })
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Landmark".parse::<DetectorMode>().unwrap(), DetectorMode::Landmark);
        assert_eq!(" mock ".parse::<DetectorMode>().unwrap(), DetectorMode::Mock);
        assert!("camera".parse::<DetectorMode>().is_err());
    }

    #[tokio::test]
    async fn test_auto_prefers_landmark() {
        let chain = DetectorChain::for_mode(
            DetectorMode::Auto,
            Some(stub("landmark", true)),
            stub("mock", true),
        )
        .unwrap();
        assert_eq!(chain.names(), vec!["landmark", "mock"]);
        assert_eq!(chain.select().await.unwrap().name(), "landmark");
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_mock() {
        let chain = DetectorChain::for_mode(
            DetectorMode::Auto,
            Some(stub("landmark", false)),
            stub("mock", true),
        )
        .unwrap();
        assert_eq!(chain.select().await.unwrap().name(), "mock");
    }

    #[tokio::test]
    async fn test_landmark_mode_fails_hard() {
        let chain = DetectorChain::for_mode(
            DetectorMode::Landmark,
            Some(stub("landmark", false)),
            stub("mock", true),
        )
        .unwrap();
        let err = chain.select().await.err().unwrap();
        assert!(matches!(err, SignLoomError::Detector(_)));

        assert!(DetectorChain::for_mode(DetectorMode::Landmark, None, stub("mock", true)).is_err());
    }

    #[tokio::test]
    async fn test_mock_mode_skips_landmark() {
        let chain = DetectorChain::for_mode(
            DetectorMode::Mock,
            Some(stub("landmark", true)),
            stub("mock", true),
        )
        .unwrap();
        assert_eq!(chain.names(), vec!["mock"]);
    }
}
