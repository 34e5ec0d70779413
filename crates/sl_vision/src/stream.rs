//! 实时手势流
//!
//! 逐帧读取 → 关键点检测 → 运动去抖 → 规则判定。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sl_core::{HandLandmarks, Result, SignDetection};
use tokio::sync::mpsc;

use crate::decode::decode_image;
use crate::extractor::LandmarkExtractor;
use crate::motion::{MotionDecision, MotionGate};
use crate::source::FrameSource;

/// 连续读帧失败达到该次数即放弃
const MAX_CONSECUTIVE_READ_ERRORS: usize = 16;

/// 关键点 → 识别结果
pub type Classifier = Arc<dyn Fn(&HandLandmarks) -> SignDetection + Send + Sync>;

/// 单帧处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// 放行并完成识别
    Detection {
        detection: SignDetection,
        displacement: f64,
    },
    /// 有手但被去抖门拦下
    Idle { displacement: f64 },
    /// 画面中没有手
    NoHand,
}

/// 带帧序号的事件
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEvent {
    /// 帧在来源中的序号 (从 1 开始，读取或解码失败的帧也计数)
    pub frame: usize,
    pub event: StreamEvent,
}

/// 实时手势流
pub struct GestureStream<S: FrameSource> {
    source: S,
    extractor: Arc<dyn LandmarkExtractor>,
    classifier: Classifier,
    gate: MotionGate,
    running: AtomicBool,
    /// 停止请求，置位后不再复位
    stop_requested: Arc<AtomicBool>,
}

impl<S: FrameSource> GestureStream<S> {
    pub fn new(
        source: S,
        extractor: Arc<dyn LandmarkExtractor>,
        classifier: Classifier,
        gate: MotionGate,
    ) -> Self {
        Self {
            source,
            extractor,
            classifier,
            gate,
            running: AtomicBool::new(false),
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 停止句柄，可在其他任务中 `store(true)` 结束循环。
    ///
    /// 在 `run` 之前置位同样有效：`run` 不读取任何帧直接返回。
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// 停止流
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// 是否运行中
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// 处理一帧
    pub async fn process_frame(&mut self, frame: &[u8], now: Instant) -> Result<StreamEvent> {
        let image = decode_image(frame)?;
        let hands = self.extractor.extract(&image).await?;

        let Some(hand) = hands.first() else {
            self.gate.reset();
            return Ok(StreamEvent::NoHand);
        };

        let MotionDecision {
            displacement,
            triggered,
            ..
        } = self.gate.observe(hand, now);

        if !triggered {
            return Ok(StreamEvent::Idle { displacement });
        }

        let detection = (self.classifier)(hand);
        Ok(StreamEvent::Detection {
            detection,
            displacement,
        })
    }

    /// 运行到帧来源耗尽、被停止或接收端关闭，返回读取的帧数。
    ///
    /// 单帧读取或处理失败只记录并跳过；连续读取失败过多时返回最后一次错误。
    pub async fn run(&mut self, events: mpsc::Sender<FrameEvent>) -> Result<usize> {
        self.running.store(true, Ordering::SeqCst);
        let mut frame = 0;
        let mut read_errors = 0;

        let outcome = loop {
            if self.stop_requested() {
                tracing::debug!(frame, "stream stopped");
                break Ok(frame);
            }

            let bytes = match self.source.next_frame().await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break Ok(frame),
                Err(e) => {
                    frame += 1;
                    read_errors += 1;
                    tracing::warn!(frame, error = %e, "failed to read frame, skipping");
                    if read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                        break Err(e);
                    }
                    continue;
                }
            };
            frame += 1;
            read_errors = 0;

            let event = match self.process_frame(&bytes, Instant::now()).await {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(frame, error = %e, "skipping frame");
                    continue;
                }
            };

            if let StreamEvent::Detection { detection, .. } = &event {
                tracing::debug!(frame, sign = ?detection.sign, "gesture evaluated");
            }
            if events.send(FrameEvent { frame, event }).await.is_err() {
                break Ok(frame);
            }
        };

        self.running.store(false, Ordering::SeqCst);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::time::Duration;

    use async_trait::async_trait;
    use image::{ImageFormat, RgbImage};
    use sl_core::{LandmarkPoint, SignLoomError, LANDMARK_COUNT};
    use tokio::sync::Mutex;

    use crate::decode::DecodedImage;
    use crate::source::DirectoryFrameSource;

    /// 依次返回预设结果的检测器
    struct ScriptedExtractor {
        script: Mutex<VecDeque<Vec<HandLandmarks>>>,
    }

    impl ScriptedExtractor {
        fn new(script: Vec<Vec<HandLandmarks>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl LandmarkExtractor for ScriptedExtractor {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn extract(&self, _image: &DecodedImage) -> Result<Vec<HandLandmarks>> {
            self.script
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| SignLoomError::Extractor("script exhausted".to_string()))
        }

        async fn health(&self) -> Result<()> {
            Ok(())
        }
    }

    struct VecSource(VecDeque<Vec<u8>>);

    #[async_trait]
    impl FrameSource for VecSource {
        async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(self.0.pop_front())
        }
    }

    /// 每帧之前等待片刻
    struct SlowSource(VecDeque<Vec<u8>>);

    #[async_trait]
    impl FrameSource for SlowSource {
        async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(self.0.pop_front())
        }
    }

    /// 永远读取失败
    struct BrokenSource;

    #[async_trait]
    impl FrameSource for BrokenSource {
        async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into())
        }
    }

    fn png_frame() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(2, 2).write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn hand_at(y: f64) -> HandLandmarks {
        HandLandmarks::new(vec![LandmarkPoint::new(0.5, y, 0.0); LANDMARK_COUNT]).unwrap()
    }

    fn always_hello() -> Classifier {
        Arc::new(|_: &HandLandmarks| SignDetection::matched("Hello", 0.9))
    }

    #[tokio::test]
    async fn test_process_frame_gates_still_hand() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![
            vec![hand_at(0.5)],
            vec![hand_at(0.5)],
            vec![],
        ]));
        let mut stream = GestureStream::new(
            VecSource(VecDeque::new()),
            extractor,
            always_hello(),
            MotionGate::new(0.02, Duration::from_millis(100)),
        );
        let t0 = Instant::now();
        let frame = png_frame();

        let first = stream.process_frame(&frame, t0).await.unwrap();
        assert!(matches!(first, StreamEvent::Detection { .. }));

        let second = stream
            .process_frame(&frame, t0 + Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(second, StreamEvent::Idle { displacement: 0.0 });

        let third = stream.process_frame(&frame, t0).await.unwrap();
        assert_eq!(third, StreamEvent::NoHand);
    }

    #[tokio::test]
    async fn test_run_skips_bad_frames() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![vec![hand_at(0.3)]]));
        let source = VecSource(VecDeque::from(vec![b"garbage".to_vec(), png_frame()]));
        let mut stream =
            GestureStream::new(source, extractor, always_hello(), MotionGate::default());

        let (tx, mut rx) = mpsc::channel(8);
        let processed = stream.run(tx).await.unwrap();

        assert_eq!(processed, 2);
        assert!(!stream.is_running());
        match rx.recv().await {
            Some(FrameEvent {
                frame,
                event: StreamEvent::Detection { detection, .. },
            }) => {
                // 第一帧解码失败，序号仍然计数
                assert_eq!(frame, 2);
                assert_eq!(detection.sign.as_deref(), Some("Hello"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_survives_vanished_frame_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["001.png", "002.png", "003.png"] {
            std::fs::write(dir.path().join(name), png_frame()).unwrap();
        }
        let source = DirectoryFrameSource::open(dir.path(), Duration::ZERO).unwrap();
        std::fs::remove_file(dir.path().join("002.png")).unwrap();

        let extractor = Arc::new(ScriptedExtractor::new(vec![
            vec![hand_at(0.3)],
            vec![hand_at(0.6)],
        ]));
        let mut stream =
            GestureStream::new(source, extractor, always_hello(), MotionGate::default());

        let (tx, mut rx) = mpsc::channel(8);
        let processed = stream.run(tx).await.unwrap();
        assert_eq!(processed, 3);

        let mut frames = Vec::new();
        while let Some(event) = rx.recv().await {
            frames.push(event.frame);
        }
        assert_eq!(frames, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_run_gives_up_on_broken_source() {
        let extractor = Arc::new(ScriptedExtractor::new(Vec::new()));
        let mut stream =
            GestureStream::new(BrokenSource, extractor, always_hello(), MotionGate::default());

        let (tx, _rx) = mpsc::channel(8);
        let err = stream.run(tx).await.unwrap_err();
        assert!(matches!(err, SignLoomError::Io(_)));
        assert!(!stream.is_running());
    }

    #[tokio::test]
    async fn test_stop_handle_ends_run_from_another_task() {
        let frames = (0..50).map(|_| png_frame()).collect();
        let extractor = Arc::new(ScriptedExtractor::new(
            (0..50).map(|i| vec![hand_at(i as f64 / 100.0)]).collect(),
        ));
        let mut stream = GestureStream::new(
            SlowSource(frames),
            extractor,
            always_hello(),
            MotionGate::default(),
        );
        let stop = stream.stop_handle();

        let (tx, mut rx) = mpsc::channel(64);
        let runner = tokio::spawn(async move { stream.run(tx).await });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.frame, 1);
        stop.store(true, Ordering::SeqCst);

        let processed = runner.await.unwrap().unwrap();
        assert!(processed < 50);
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_stop_before_run_is_honoured() {
        let extractor = Arc::new(ScriptedExtractor::new(vec![vec![hand_at(0.3)]]));
        let source = VecSource(VecDeque::from(vec![png_frame()]));
        let mut stream =
            GestureStream::new(source, extractor, always_hello(), MotionGate::default());
        stream.stop();

        let (tx, mut rx) = mpsc::channel(8);
        assert_eq!(stream.run(tx).await.unwrap(), 0);
        assert!(rx.recv().await.is_none());
    }
}
