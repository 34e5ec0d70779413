//! 识别历史
//!
//! 只记录置信度高于阈值的结果，且与上一条已记录手势不同时才入列，
//! 最新的条目在最前。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::SignDetection;

/// 历史条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// 手势名称
    pub sign: String,
    /// 置信度
    pub confidence: f64,
    /// 记录时间
    pub recorded_at: DateTime<Utc>,
}

/// 识别历史
#[derive(Debug, Clone)]
pub struct Transcript {
    /// 最大条目数
    capacity: usize,
    /// 入列置信度下限 (严格大于)
    min_confidence: f64,
    /// 最近一次被接受的手势
    last_sign: Option<String>,
    /// 条目 (最新在前)
    entries: VecDeque<TranscriptEntry>,
}

impl Transcript {
    pub fn new(capacity: usize, min_confidence: f64) -> Self {
        Self {
            capacity,
            min_confidence,
            last_sign: None,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// 创建默认历史 (10 条, 置信度 > 0.7)
    pub fn default_transcript() -> Self {
        Self::new(10, 0.7)
    }

    /// 记录一次识别结果，返回是否新增了条目
    pub fn record(&mut self, detection: &SignDetection) -> bool {
        let Some(sign) = detection.sign.as_deref() else {
            return false;
        };
        if detection.confidence <= self.min_confidence {
            return false;
        }
        if self.last_sign.as_deref() == Some(sign) {
            return false;
        }

        self.last_sign = Some(sign.to_string());
        if self.capacity == 0 {
            return false;
        }
        self.entries.push_front(TranscriptEntry {
            sign: sign.to_string(),
            confidence: detection.confidence,
            recorded_at: Utc::now(),
        });
        self.entries.truncate(self.capacity);
        true
    }

    /// 最近一次被接受的手势
    pub fn last_sign(&self) -> Option<&str> {
        self.last_sign.as_deref()
    }

    /// 全部条目 (最新在前)
    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    /// 手势名称列表 (最新在前)
    pub fn signs(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.sign.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_sign = None;
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::default_transcript()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_low_confidence_and_empty() {
        let mut transcript = Transcript::default();
        assert!(!transcript.record(&SignDetection::none()));
        assert!(!transcript.record(&SignDetection::matched("Hello", 0.7)));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_skips_repeated_sign() {
        let mut transcript = Transcript::default();
        assert!(transcript.record(&SignDetection::matched("Hello", 0.9)));
        assert!(!transcript.record(&SignDetection::matched("Hello", 0.95)));
        assert!(transcript.record(&SignDetection::matched("Yes", 0.85)));
        assert!(transcript.record(&SignDetection::matched("Hello", 0.88)));
        assert_eq!(transcript.signs(), vec!["Hello", "Yes", "Hello"]);
    }

    #[test]
    fn test_low_confidence_does_not_reset_last_sign() {
        let mut transcript = Transcript::default();
        transcript.record(&SignDetection::matched("Hello", 0.9));
        transcript.record(&SignDetection::matched("Yes", 0.5));
        assert!(!transcript.record(&SignDetection::matched("Hello", 0.9)));
        assert_eq!(transcript.last_sign(), Some("Hello"));
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let mut transcript = Transcript::new(3, 0.7);
        for sign in ["A", "B", "C", "D"] {
            transcript.record(&SignDetection::matched(sign, 0.9));
        }
        assert_eq!(transcript.signs(), vec!["D", "C", "B"]);
    }
}
