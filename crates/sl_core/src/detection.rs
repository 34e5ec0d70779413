//! 识别结果

use serde::{Deserialize, Serialize};

/// 单次手势识别结果，序列化为 `{"sign": ..., "confidence": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignDetection {
    /// 识别出的手势名称 (未识别时为 None)
    pub sign: Option<String>,
    /// 置信度
    pub confidence: f64,
}

impl SignDetection {
    /// 创建识别成功的结果
    pub fn matched(sign: impl Into<String>, confidence: f64) -> Self {
        Self {
            sign: Some(sign.into()),
            confidence,
        }
    }

    /// 未识别到手势
    pub fn none() -> Self {
        Self {
            sign: None,
            confidence: 0.0,
        }
    }

    /// 是否识别到手势
    pub fn is_match(&self) -> bool {
        self.sign.is_some()
    }
}

impl Default for SignDetection {
    fn default() -> Self {
        Self::none()
    }
}
