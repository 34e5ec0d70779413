//! SignLoom HTTP 服务器

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use sl_core::{Result, SignDetection, SignLoomError, Transcript};
use sl_gesture::SignDetector;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::limiter::RequestLimiter;
use crate::protocol::{ApiError, HistoryResponse, StatusResponse};

/// 上传表单中的图像字段名
const IMAGE_FIELD: &str = "image";

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    /// 当前识别器
    pub detector: Arc<dyn SignDetector>,
    /// 识别请求限流
    pub limiter: Arc<RequestLimiter>,
    /// 识别历史
    pub transcript: Arc<Mutex<Transcript>>,
}

impl AppState {
    pub fn new(
        detector: Arc<dyn SignDetector>,
        limiter: RequestLimiter,
        transcript: Transcript,
    ) -> Self {
        Self {
            detector,
            limiter: Arc::new(limiter),
            transcript: Arc::new(Mutex::new(transcript)),
        }
    }
}

/// SignLoom 服务器
pub struct SignLoomServer {
    config: ServerConfig,
    state: AppState,
}

impl SignLoomServer {
    /// 创建新服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// 构建 Axum 路由
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(root))
            .route("/detect-sign", post(detect_sign))
            .route("/api/detect-sign", post(detect_sign))
            .route("/history", get(history))
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// 启动服务器，直到收到关闭信号
    pub async fn start_with_shutdown<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.build_router();
        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| SignLoomError::Protocol(format!("bind {}: {e}", self.config.addr)))?;

        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            detector = self.state.detector.name(),
            "SignLoom gateway listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| SignLoomError::Protocol(e.to_string()))?;

        Ok(())
    }

    /// 启动服务器
    pub async fn start(&self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// 获取配置
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn addr(&self) -> SocketAddr {
        self.config.addr
    }
}

async fn root(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::running(state.detector.name()))
}

async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let transcript = state.transcript.lock().await;
    Json(HistoryResponse {
        history: transcript.signs(),
    })
}

/// 处理识别请求
async fn detect_sign(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<SignDetection>, ApiError> {
    let request_id = Uuid::new_v4();
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(%request_id, error = %e, "rejected non-multipart upload");
        ApiError::NoImage
    })?;

    let image = read_image_field(&mut multipart).await?;
    tracing::debug!(%request_id, bytes = image.len(), "image received");

    let _permit = state.limiter.acquire().await?;
    let detection = state.detector.detect(&image).await?;

    if state.transcript.lock().await.record(&detection) {
        tracing::info!(%request_id, sign = ?detection.sign, "sign added to history");
    }
    tracing::info!(
        %request_id,
        sign = ?detection.sign,
        confidence = detection.confidence,
        "detection finished"
    );
    Ok(Json(detection))
}

/// 读取 `image` 字段，缺失或为空时返回 NoImage，上传体读取失败时沿用其状态码
async fn read_image_field(multipart: &mut Multipart) -> std::result::Result<Vec<u8>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::NoImage),
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(upload_error(e));
            }
            Err(e) => {
                tracing::debug!(error = %e, "malformed multipart body");
                return Err(ApiError::NoImage);
            }
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let bytes = field.bytes().await.map_err(upload_error)?;
        if bytes.is_empty() {
            return Err(ApiError::NoImage);
        }
        return Ok(bytes.to_vec());
    }
}

fn upload_error(err: MultipartError) -> ApiError {
    let status = err.status();
    tracing::debug!(error = %err, %status, "failed to read upload");
    ApiError::Upload {
        status,
        detail: err.body_text(),
    }
}
