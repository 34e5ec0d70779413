//! SignLoom CLI - 命令行交互接口

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sl_core::{HandLandmarks, SignDetection, Transcript};
use sl_gateway::SignLoomClient;
use sl_gesture::SignRecognizer;
use sl_vision::{
    Classifier, DirectoryFrameSource, FrameEvent, GestureStream, MotionGate, RemoteExtractor,
    RemoteExtractorConfig, StreamEvent,
};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// 回放帧间隔默认值 (毫秒)
const DEFAULT_WATCH_DELAY_MS: u64 = 100;

fn describe(detection: &SignDetection) -> String {
    match &detection.sign {
        Some(sign) => format!("{sign} ({:.0}%)", detection.confidence * 100.0),
        None => "no sign".to_string(),
    }
}

fn parse_delay(arg: Option<&str>) -> anyhow::Result<Duration> {
    let ms = match arg {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("invalid delay: {raw}"))?,
        None => DEFAULT_WATCH_DELAY_MS,
    };
    Ok(Duration::from_millis(ms))
}

async fn detect(client: &SignLoomClient, path: &Path) -> anyhow::Result<SignDetection> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("frame");
    Ok(client.detect(bytes, file_name).await?)
}

/// 在帧目录上运行实时识别，识别结果写入本地历史
async fn watch(
    dir: &Path,
    delay: Duration,
    detector_url: &str,
    transcript: &mut Transcript,
) -> anyhow::Result<usize> {
    let source = DirectoryFrameSource::open(dir, delay)?;
    if source.is_empty() {
        anyhow::bail!("no frames found in {}", dir.display());
    }
    println!("Watching {} frames from {}", source.len(), dir.display());
    tracing::debug!(dir = %dir.display(), frames = source.len(), ?delay, "watch started");

    let extractor = Arc::new(RemoteExtractor::new(RemoteExtractorConfig {
        base_url: detector_url.to_string(),
        ..Default::default()
    })?);
    let recognizer = SignRecognizer::default_recognizer();
    let classifier: Classifier = Arc::new(move |hand: &HandLandmarks| recognizer.recognize(hand));
    let mut stream = GestureStream::new(source, extractor, classifier, MotionGate::default_gate());

    let (tx, mut rx) = mpsc::channel(32);
    let runner = tokio::spawn(async move { stream.run(tx).await });

    while let Some(FrameEvent { frame, event }) = rx.recv().await {
        match event {
            StreamEvent::Detection {
                detection,
                displacement,
            } => {
                println!(
                    "  [{frame:>4}] {} (moved {displacement:.3})",
                    describe(&detection)
                );
                if transcript.record(&detection) {
                    println!("         + added to history");
                }
            }
            StreamEvent::Idle { .. } => {}
            StreamEvent::NoHand => println!("  [{frame:>4}] no hand"),
        }
    }

    Ok(runner.await??)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server_url =
        std::env::var("SIGNLOOM_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
    let detector_url = std::env::var("SIGNLOOM_DETECTOR_URL").ok();
    let client = SignLoomClient::connect(server_url.clone())?;
    let mut transcript = Transcript::default_transcript();

    println!("SignLoom CLI v{}", env!("CARGO_PKG_VERSION"));
    println!("Server: {server_url}");
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("sl> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts[0];

        match command {
            "help" => {
                println!("Available commands:");
                println!("  help                    - Show this help message");
                println!("  status                  - Show service status");
                println!("  detect <image>          - Send one image to the service");
                println!("  watch <dir> [delay_ms]  - Replay a frame directory through the landmark service");
                println!("  history                 - Show recognized signs");
                println!("  clear                   - Clear local history and the screen");
                println!("  quit / exit             - Exit the CLI");
            }
            "status" => match client.status().await {
                Ok(status) => {
                    println!("Service Status:");
                    println!("  {}", status.message);
                    println!("  Detector: {}", status.detector);
                }
                Err(e) => println!("Service unreachable at {}: {e}", client.base_url()),
            },
            "detect" => {
                let Some(path) = parts.get(1) else {
                    println!("Usage: detect <image>");
                    continue;
                };
                match detect(&client, Path::new(path)).await {
                    Ok(detection) => {
                        println!("Detected: {}", describe(&detection));
                        transcript.record(&detection);
                    }
                    Err(e) => println!("Detection failed: {e}"),
                }
            }
            "watch" => {
                let Some(dir) = parts.get(1) else {
                    println!("Usage: watch <dir> [delay_ms]");
                    continue;
                };
                let Some(detector_url) = detector_url.as_deref() else {
                    println!("Set SIGNLOOM_DETECTOR_URL to the landmark service first.");
                    continue;
                };
                let delay = match parse_delay(parts.get(2).copied()) {
                    Ok(delay) => delay,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                match watch(Path::new(dir), delay, detector_url, &mut transcript).await {
                    Ok(frames) => println!("Processed {frames} frames."),
                    Err(e) => println!("Watch failed: {e}"),
                }
            }
            "history" => {
                match client.history().await {
                    Ok(history) if !history.is_empty() => {
                        println!("Service History: {}", history.join(", "));
                    }
                    Ok(_) => println!("Service History: (none)"),
                    Err(e) => println!("Service history unavailable: {e}"),
                }
                if transcript.is_empty() {
                    println!("Local History: (none)");
                } else {
                    println!("Local History:");
                    for entry in transcript.entries() {
                        println!(
                            "  {} {:<10} {:.0}%",
                            entry.recorded_at.format("%H:%M:%S"),
                            entry.sign,
                            entry.confidence * 100.0
                        );
                    }
                }
            }
            "clear" => {
                transcript.clear();
                print!("\x1B[2J\x1B[1;1H");
            }
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            _ => {
                println!("Unknown command: {}", command);
                println!("Type 'help' for available commands.");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe(&SignDetection::matched("Hello", 0.876)), "Hello (88%)");
        assert_eq!(describe(&SignDetection::none()), "no sign");
    }

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay(None).unwrap(), Duration::from_millis(100));
        assert_eq!(parse_delay(Some("250")).unwrap(), Duration::from_millis(250));
        assert!(parse_delay(Some("fast")).is_err());
    }

    #[tokio::test]
    async fn test_watch_rejects_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::default_transcript();
        let result = watch(dir.path(), Duration::ZERO, "http://127.0.0.1:1", &mut transcript).await;
        assert!(result.is_err());
    }
}
