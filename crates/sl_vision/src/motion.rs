//! 帧间运动去抖
//!
//! 实时流中不对每一帧都做判定：只有关键点平均位移超过阈值，
//! 并且距离上一次判定已超过去抖间隔时才放行。

use std::time::{Duration, Instant};

use sl_core::HandLandmarks;

/// 单帧的放行判定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionDecision {
    /// 与上一帧的平均位移 (首帧为 0)
    pub displacement: f64,
    /// 是否视为发生了运动
    pub moved: bool,
    /// 是否放行识别
    pub triggered: bool,
}

/// 运动去抖门
#[derive(Debug, Clone)]
pub struct MotionGate {
    /// 位移阈值 (归一化坐标)
    threshold: f64,
    /// 去抖间隔
    debounce: Duration,
    /// 上一帧关键点
    previous: Option<HandLandmarks>,
    /// 上一次放行时间
    last_trigger: Option<Instant>,
}

impl MotionGate {
    pub fn new(threshold: f64, debounce: Duration) -> Self {
        Self {
            threshold,
            debounce,
            previous: None,
            last_trigger: None,
        }
    }

    /// 默认去抖门 (阈值 0.02, 间隔 1 秒)
    pub fn default_gate() -> Self {
        Self::new(0.02, Duration::from_secs(1))
    }

    /// 观察新一帧
    pub fn observe(&mut self, hand: &HandLandmarks, now: Instant) -> MotionDecision {
        let (displacement, moved) = match &self.previous {
            Some(prev) => {
                let d = prev.mean_displacement(hand);
                (d, d > self.threshold)
            }
            None => (0.0, true),
        };

        let debounced = self
            .last_trigger
            .map_or(true, |last| now.saturating_duration_since(last) >= self.debounce);
        let triggered = moved && debounced;

        self.previous = Some(hand.clone());
        if triggered {
            self.last_trigger = Some(now);
        }

        MotionDecision {
            displacement,
            moved,
            triggered,
        }
    }

    /// 重置 (画面中没有手时调用)
    pub fn reset(&mut self) {
        self.previous = None;
        self.last_trigger = None;
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Default for MotionGate {
    fn default() -> Self {
        Self::default_gate()
    }
}
