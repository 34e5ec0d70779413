//! 手部关键点检测器
//!
//! 关键点检测本身由外部服务完成，这里只负责转发图像并解析返回的 21 点坐标。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sl_core::{HandLandmarks, Handedness, LandmarkPoint, Result, SignLoomError};

use crate::decode::DecodedImage;

/// 关键点检测器
#[async_trait]
pub trait LandmarkExtractor: Send + Sync {
    /// 检测器名称
    fn name(&self) -> &str;

    /// 检测图像中的手，按检测器给出的顺序返回 (无手时为空)
    async fn extract(&self, image: &DecodedImage) -> Result<Vec<HandLandmarks>>;

    /// 健康检查
    async fn health(&self) -> Result<()>;
}

/// 远程检测器配置
#[derive(Debug, Clone)]
pub struct RemoteExtractorConfig {
    /// 服务地址
    pub base_url: String,
    /// 请求超时
    pub timeout: Duration,
    /// 最多检测的手数
    pub max_num_hands: u32,
    /// 最低检测置信度
    pub min_detection_confidence: f64,
}

impl Default for RemoteExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8100".to_string(),
            timeout: Duration::from_secs(10),
            max_num_hands: 2,
            min_detection_confidence: 0.7,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LandmarkResponse {
    #[serde(default)]
    hands: Vec<WireHand>,
}

#[derive(Debug, Deserialize)]
struct WireHand {
    landmarks: Vec<LandmarkPoint>,
    #[serde(default)]
    handedness: Option<Handedness>,
    #[serde(default)]
    score: Option<f64>,
}

impl WireHand {
    fn into_hand(self) -> Result<HandLandmarks> {
        let mut hand = HandLandmarks::new(self.landmarks)?;
        hand.handedness = self.handedness;
        hand.score = self.score;
        Ok(hand)
    }
}

/// 通过 HTTP 调用的外部关键点检测器
pub struct RemoteExtractor {
    config: RemoteExtractorConfig,
    http: reqwest::Client,
}

impl RemoteExtractor {
    pub fn new(config: RemoteExtractorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SignLoomError::Extractor(e.to_string()))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &RemoteExtractorConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LandmarkExtractor for RemoteExtractor {
    fn name(&self) -> &str {
        "remote"
    }

    async fn extract(&self, image: &DecodedImage) -> Result<Vec<HandLandmarks>> {
        let png = image.to_png()?;
        let part = Part::bytes(png)
            .file_name("frame.png")
            .mime_str("image/png")
            .map_err(|e| SignLoomError::Extractor(e.to_string()))?;
        let form = Form::new()
            .part("image", part)
            .text("max_num_hands", self.config.max_num_hands.to_string())
            .text(
                "min_detection_confidence",
                self.config.min_detection_confidence.to_string(),
            )
            .text("static_image_mode", "true");

        let resp = self
            .http
            .post(self.endpoint("/landmarks"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SignLoomError::Extractor(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SignLoomError::Extractor(format!(
                "landmark service returned {status}: {body}"
            )));
        }

        let parsed: LandmarkResponse = resp
            .json()
            .await
            .map_err(|e| SignLoomError::Extractor(format!("invalid response body: {e}")))?;

        tracing::debug!(hands = parsed.hands.len(), "landmark service responded");
        parsed.hands.into_iter().map(WireHand::into_hand).collect()
    }

    async fn health(&self) -> Result<()> {
        let resp = self
            .http
            .get(self.endpoint("/"))
            .send()
            .await
            .map_err(|e| SignLoomError::Extractor(format!("health probe failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SignLoomError::Extractor(format!(
                "health probe returned {}",
                resp.status()
            )))
        }
    }
}
