//! # sl_gesture - SignLoom Gesture Engine
//!
//! 手势判定层：基于 21 个关键点的几何规则引擎，
//! 以及识别器 (关键点识别 / 模拟识别) 的选择与降级。

pub mod rules;
pub mod recognizer;
pub mod detector;
pub mod fallback;

pub use rules::{format_label, GestureRule};
pub use recognizer::{RuleSet, SignRecognizer};
pub use detector::{LandmarkSignDetector, MockConfig, MockSignDetector, SignDetector};
pub use fallback::{DetectorChain, DetectorMode};
