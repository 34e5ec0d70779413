//! # sl_vision - SignLoom Vision Stream
//!
//! 视觉流处理：图像解码、外部手部关键点检测器、帧间运动去抖、实时帧流。

pub mod decode;
pub mod extractor;
pub mod motion;
pub mod source;
pub mod stream;

pub use decode::{decode_image, DecodedImage};
pub use extractor::{LandmarkExtractor, RemoteExtractor, RemoteExtractorConfig};
pub use motion::{MotionDecision, MotionGate};
pub use source::{DirectoryFrameSource, FrameSource};
pub use stream::{Classifier, FrameEvent, GestureStream, StreamEvent};
