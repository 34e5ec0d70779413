//! # sl_core - SignLoom Core Primitives
//!
//! 核心原语层，定义手部关键点模型、识别结果、识别历史与全局错误处理机制。
//! 此 crate 是整个项目的基础依赖，不依赖其他业务 crate。

pub mod error;
pub mod detection;
pub mod landmark;
pub mod transcript;

pub use error::{SignLoomError, Result};
pub use detection::SignDetection;
pub use landmark::{HandLandmark, HandLandmarks, Handedness, LandmarkPoint, LANDMARK_COUNT};
pub use transcript::{Transcript, TranscriptEntry};
