//! # sl_gateway - SignLoom Gateway
//!
//! 对外的 HTTP 识别服务：上传图像 → 识别结果 JSON，
//! 以及识别请求限流、配置加载和配套的 HTTP 客户端。

pub mod config;
pub mod limiter;
pub mod protocol;
pub mod server;
pub mod client;

pub use config::SignLoomConfig;
pub use limiter::{LimiterConfig, RequestLimiter};
pub use protocol::{ApiError, HistoryResponse, StatusResponse};
pub use server::{AppState, SignLoomServer};
pub use client::{ClientConfig, SignLoomClient};
