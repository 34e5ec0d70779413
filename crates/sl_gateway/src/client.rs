//! SignLoom HTTP 客户端

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use sl_core::{Result, SignDetection, SignLoomError};

use crate::protocol::{HistoryResponse, StatusResponse};

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 服务地址
    pub base_url: String,
    /// 请求超时
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// SignLoom 客户端
pub struct SignLoomClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl SignLoomClient {
    /// 创建新客户端
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SignLoomError::Protocol(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// 指向给定地址的默认客户端
    pub fn connect(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// 服务状态
    pub async fn status(&self) -> Result<StatusResponse> {
        let resp = self
            .http
            .get(self.endpoint("/"))
            .send()
            .await
            .map_err(|e| SignLoomError::Protocol(format!("request failed: {e}")))?;
        Self::parse(resp).await
    }

    /// 上传一帧图像并返回识别结果
    pub async fn detect(&self, image: Vec<u8>, file_name: &str) -> Result<SignDetection> {
        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| SignLoomError::Protocol(e.to_string()))?;
        let form = Form::new().part("image", part);

        let resp = self
            .http
            .post(self.endpoint("/detect-sign"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SignLoomError::Protocol(format!("request failed: {e}")))?;
        Self::parse(resp).await
    }

    /// 识别历史，最新在前
    pub async fn history(&self) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(self.endpoint("/history"))
            .send()
            .await
            .map_err(|e| SignLoomError::Protocol(format!("request failed: {e}")))?;
        let history: HistoryResponse = Self::parse(resp).await?;
        Ok(history.history)
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SignLoomError::Protocol(format!(
                "server returned {status}: {body}"
            )));
        }
        resp.json()
            .await
            .map_err(|e| SignLoomError::Protocol(format!("invalid response body: {e}")))
    }
}
