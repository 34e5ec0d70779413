//! 手势识别器接口
//!
//! 上传的图像经由 `SignDetector` 变为识别结果。正式实现走外部关键点检测器，
//! 检测器不可用时由模拟识别器兜底。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sl_core::{Result, SignDetection};
use sl_vision::{decode_image, LandmarkExtractor};
use tokio::sync::Mutex;

use crate::recognizer::SignRecognizer;

/// 图像 → 识别结果
#[async_trait]
pub trait SignDetector: Send + Sync {
    /// 识别器名称
    fn name(&self) -> &str;

    /// 识别一张编码后的图像
    async fn detect(&self, image: &[u8]) -> Result<SignDetection>;

    /// 可用性探测
    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}

/// 基于外部关键点检测器的识别器
pub struct LandmarkSignDetector {
    extractor: Arc<dyn LandmarkExtractor>,
    recognizer: SignRecognizer,
}

impl LandmarkSignDetector {
    pub fn new(extractor: Arc<dyn LandmarkExtractor>, recognizer: SignRecognizer) -> Self {
        Self {
            extractor,
            recognizer,
        }
    }

    pub fn recognizer(&self) -> &SignRecognizer {
        &self.recognizer
    }
}

#[async_trait]
impl SignDetector for LandmarkSignDetector {
    fn name(&self) -> &str {
        "landmark"
    }

    async fn detect(&self, image: &[u8]) -> Result<SignDetection> {
        let decoded = decode_image(image)?;
        let hands = self.extractor.extract(&decoded).await?;

        // 只看检测器给出的第一只手
        let Some(hand) = hands.first() else {
            tracing::debug!(
                width = decoded.width(),
                height = decoded.height(),
                "no hand found"
            );
            return Ok(SignDetection::none());
        };

        Ok(self.recognizer.recognize(hand))
    }

    async fn probe(&self) -> Result<()> {
        self.extractor.health().await
    }
}

/// 模拟识别器配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 轮流返回的手势
    pub signs: Vec<String>,
    /// 命中概率
    pub hit_rate: f64,
    /// 模拟处理耗时
    pub latency: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            signs: ["Hello", "Thank You", "Please", "Yes", "No", "Good", "Bad", "Help"]
                .into_iter()
                .map(String::from)
                .collect(),
            hit_rate: 0.3,
            latency: Duration::from_millis(100),
        }
    }
}

struct MockState {
    next_index: usize,
    rng: StdRng,
}

/// 模拟识别器：不看图像内容，按命中概率轮流返回预设手势
pub struct MockSignDetector {
    config: MockConfig,
    state: Mutex<MockState>,
}

impl MockSignDetector {
    pub fn new(config: MockConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// 固定随机种子 (测试用)
    pub fn seeded(config: MockConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: MockConfig, rng: StdRng) -> Self {
        Self {
            config,
            state: Mutex::new(MockState { next_index: 0, rng }),
        }
    }

    pub fn default_detector() -> Self {
        Self::new(MockConfig::default())
    }
}

impl Default for MockSignDetector {
    fn default() -> Self {
        Self::default_detector()
    }
}

#[async_trait]
impl SignDetector for MockSignDetector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect(&self, _image: &[u8]) -> Result<SignDetection> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if self.config.signs.is_empty() {
            return Ok(SignDetection::none());
        }

        let mut state = self.state.lock().await;
        if state.rng.gen::<f64>() >= self.config.hit_rate {
            return Ok(SignDetection::none());
        }

        let sign = self.config.signs[state.next_index % self.config.signs.len()].clone();
        state.next_index += 1;
        let confidence = 0.75 + state.rng.gen::<f64>() * 0.25;
        Ok(SignDetection::matched(sign, confidence))
    }
}
