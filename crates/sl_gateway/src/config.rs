//! 服务配置
//!
//! 默认值开箱即用；可从 TOML 文件加载，再由环境变量覆盖。

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sl_core::{Result, SignLoomError, Transcript};
use sl_gesture::{DetectorMode, MockConfig, RuleSet};
use sl_vision::{MotionGate, RemoteExtractorConfig};

use crate::limiter::LimiterConfig;

/// 服务监听配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub addr: SocketAddr,
    /// 上传大小上限 (字节)
    pub max_upload_bytes: usize,
    /// 识别历史条数
    pub history_size: usize,
    /// 识别历史入列置信度下限
    pub history_min_confidence: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_bytes: 10 * 1024 * 1024,
            history_size: 10,
            history_min_confidence: 0.7,
        }
    }
}

/// 识别器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 识别器模式
    pub mode: DetectorMode,
    /// 外部关键点检测服务地址
    pub endpoint: Option<String>,
    /// 请求超时 (毫秒)
    pub timeout_ms: u64,
    /// 最多检测的手数
    pub max_num_hands: u32,
    /// 最低检测置信度
    pub min_detection_confidence: f64,
    /// 规则集
    pub rule_set: RuleSet,
    /// 模拟识别器命中概率
    pub mock_hit_rate: f64,
    /// 模拟识别器处理耗时 (毫秒)
    pub mock_latency_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: DetectorMode::Auto,
            endpoint: None,
            timeout_ms: 10_000,
            max_num_hands: 2,
            min_detection_confidence: 0.7,
            rule_set: RuleSet::Geometric,
            mock_hit_rate: 0.3,
            mock_latency_ms: 100,
        }
    }
}

impl DetectorConfig {
    /// 远程检测器配置 (未配置地址时为 None)
    pub fn remote_extractor(&self) -> Option<RemoteExtractorConfig> {
        self.endpoint.as_ref().map(|base_url| RemoteExtractorConfig {
            base_url: base_url.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            max_num_hands: self.max_num_hands,
            min_detection_confidence: self.min_detection_confidence,
        })
    }

    /// 模拟识别器配置
    pub fn mock(&self) -> MockConfig {
        MockConfig {
            hit_rate: self.mock_hit_rate,
            latency: Duration::from_millis(self.mock_latency_ms),
            ..Default::default()
        }
    }
}

/// 实时流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// 位移阈值 (归一化坐标)
    pub motion_threshold: f64,
    /// 去抖间隔 (毫秒)
    pub debounce_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 0.02,
            debounce_ms: 1000,
        }
    }
}

impl StreamConfig {
    pub fn motion_gate(&self) -> MotionGate {
        MotionGate::new(self.motion_threshold, Duration::from_millis(self.debounce_ms))
    }
}

/// SignLoom 全局配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignLoomConfig {
    pub server: ServerConfig,
    pub detector: DetectorConfig,
    pub limiter: LimiterConfig,
    pub stream: StreamConfig,
}

impl SignLoomConfig {
    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SignLoomError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// 从 TOML 文本解析
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SignLoomError::Config(e.to_string()))
    }

    /// 加载：文件 (可选) → 环境变量覆盖 → 校验
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// 加载文件 (可选) 并应用环境变量覆盖，不做校验。
    ///
    /// 调用方还要叠加其他覆盖项 (如命令行参数) 时使用，叠加完成后再调用 `validate()`。
    pub fn load_unvalidated(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 应用覆盖项：`SIGNLOOM_ADDR`, `SIGNLOOM_DETECTOR_URL`, `SIGNLOOM_DETECTOR_MODE`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("SIGNLOOM_ADDR") {
            self.server.addr = addr
                .parse()
                .map_err(|e| SignLoomError::Config(format!("invalid SIGNLOOM_ADDR {addr}: {e}")))?;
        }
        if let Some(url) = lookup("SIGNLOOM_DETECTOR_URL") {
            self.detector.endpoint = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(mode) = lookup("SIGNLOOM_DETECTOR_MODE") {
            self.detector.mode = mode.parse()?;
        }
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.limiter.capacity == 0 {
            return Err(SignLoomError::Config(
                "limiter.capacity must be at least 1".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(SignLoomError::Config(
                "server.max_upload_bytes must be non-zero".to_string(),
            ));
        }
        if !(self.stream.motion_threshold > 0.0) {
            return Err(SignLoomError::Config(
                "stream.motion_threshold must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("detector.min_detection_confidence", self.detector.min_detection_confidence),
            ("detector.mock_hit_rate", self.detector.mock_hit_rate),
            ("server.history_min_confidence", self.server.history_min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SignLoomError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.detector.mode == DetectorMode::Landmark && self.detector.endpoint.is_none() {
            return Err(SignLoomError::Config(
                "detector.mode = \"landmark\" requires detector.endpoint".to_string(),
            ));
        }
        Ok(())
    }

    /// 按配置创建空的识别历史
    pub fn transcript(&self) -> Transcript {
        Transcript::new(self.server.history_size, self.server.history_min_confidence)
    }
}
