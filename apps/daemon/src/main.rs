//! SignLoom Daemon - 手语识别 HTTP 服务进程

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sl_gateway::{AppState, RequestLimiter, SignLoomConfig, SignLoomServer};
use sl_gesture::{
    DetectorChain, LandmarkSignDetector, MockSignDetector, SignDetector, SignRecognizer,
};
use sl_vision::RemoteExtractor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "signloom-daemon")]
#[command(about = "SignLoom - hand sign detection service", long_about = None)]
#[command(version)]
struct Args {
    /// TOML 配置文件
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// 监听地址，例如 0.0.0.0:8000
    #[arg(long)]
    addr: Option<String>,

    /// 外部关键点检测服务地址
    #[arg(long)]
    detector_url: Option<String>,

    /// 识别器模式 (landmark / mock / auto)
    #[arg(long)]
    mode: Option<String>,
}

impl Args {
    /// 叠加命令行参数 (优先级最高) 并校验
    fn apply(&self, config: &mut SignLoomConfig) -> sl_core::Result<()> {
        config.apply_overrides(|key| match key {
            "SIGNLOOM_ADDR" => self.addr.clone(),
            "SIGNLOOM_DETECTOR_URL" => self.detector_url.clone(),
            "SIGNLOOM_DETECTOR_MODE" => self.mode.clone(),
            _ => None,
        })?;
        config.validate()
    }
}

/// 组装降级链并选出识别器
async fn select_detector(config: &SignLoomConfig) -> sl_core::Result<Arc<dyn SignDetector>> {
    let landmark: Option<Arc<dyn SignDetector>> = match config.detector.remote_extractor() {
        Some(remote) => {
            tracing::info!(endpoint = %remote.base_url, "using remote landmark service");
            let extractor = Arc::new(RemoteExtractor::new(remote)?);
            let recognizer = SignRecognizer::new(config.detector.rule_set);
            let detector: Arc<dyn SignDetector> =
                Arc::new(LandmarkSignDetector::new(extractor, recognizer));
            Some(detector)
        }
        None => None,
    };
    let mock: Arc<dyn SignDetector> = Arc::new(MockSignDetector::new(config.detector.mock()));

    let chain = DetectorChain::for_mode(config.detector.mode, landmark, mock)?;
    tracing::info!(mode = ?config.detector.mode, candidates = ?chain.names(), "detector chain ready");
    chain.select().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "signloom_daemon=info,sl_gateway=info,sl_gesture=info,sl_vision=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("SignLoom Daemon starting...");

    let mut config = SignLoomConfig::load_unvalidated(args.config.as_deref())?;
    args.apply(&mut config)?;
    tracing::info!(addr = %config.server.addr, "configuration loaded");

    let detector = select_detector(&config).await?;
    let limiter = RequestLimiter::new(config.limiter.clone());
    tracing::info!(capacity = limiter.config().capacity, "request limiter initialized");

    let state = AppState::new(detector, limiter, config.transcript());
    let server = SignLoomServer::new(config.server.clone(), state);

    tracing::info!("Press Ctrl+C to shutdown...");
    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}
