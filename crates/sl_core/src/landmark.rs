//! 手部关键点模型
//!
//! 外部检测器为每只手返回 21 个关键点，坐标归一化到图像尺寸，
//! `y` 轴向下增长 (数值越小位置越高)。

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignLoomError};

/// 每只手的关键点数量
pub const LANDMARK_COUNT: usize = 21;

/// 单个关键点 (归一化坐标)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 平面 (x, y) 欧氏距离
    pub fn planar_distance(&self, other: &LandmarkPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// 关键点解剖学编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    /// 五指指尖 (拇指到小指)
    pub const FINGER_TIPS: [HandLandmark; 5] = [
        HandLandmark::ThumbTip,
        HandLandmark::IndexTip,
        HandLandmark::MiddleTip,
        HandLandmark::RingTip,
        HandLandmark::PinkyTip,
    ];

    /// 与指尖一一对应的中间关节 (拇指取 IP 关节)
    pub const FINGER_PIPS: [HandLandmark; 5] = [
        HandLandmark::ThumbIp,
        HandLandmark::IndexPip,
        HandLandmark::MiddlePip,
        HandLandmark::RingPip,
        HandLandmark::PinkyPip,
    ];

    /// 四指掌指关节 (食指到小指)
    pub const FINGER_MCPS: [HandLandmark; 4] = [
        HandLandmark::IndexMcp,
        HandLandmark::MiddleMcp,
        HandLandmark::RingMcp,
        HandLandmark::PinkyMcp,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 左右手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// 一只手的完整关键点集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    /// 21 个关键点，按解剖学编号排列
    points: [LandmarkPoint; LANDMARK_COUNT],
    /// 左右手 (检测器提供时)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<Handedness>,
    /// 检测器置信度
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl HandLandmarks {
    /// 从关键点列表构建，数量必须恰好为 21
    pub fn new(points: Vec<LandmarkPoint>) -> Result<Self> {
        let len = points.len();
        let points: [LandmarkPoint; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            SignLoomError::Landmarks(format!(
                "expected {LANDMARK_COUNT} landmarks per hand, got {len}"
            ))
        })?;
        Ok(Self {
            points,
            handedness: None,
            score: None,
        })
    }

    /// 设置左右手
    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }

    /// 设置检测器置信度
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// 获取指定关键点
    pub fn point(&self, landmark: HandLandmark) -> LandmarkPoint {
        self.points[landmark.index()]
    }

    /// 全部关键点
    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    /// 与另一帧关键点的平均平面位移
    pub fn mean_displacement(&self, other: &HandLandmarks) -> f64 {
        let total: f64 = self
            .points
            .iter()
            .zip(other.points.iter())
            .map(|(a, b)| a.planar_distance(b))
            .sum();
        total / LANDMARK_COUNT as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_hand(y: f64) -> HandLandmarks {
        HandLandmarks::new(vec![LandmarkPoint::new(0.5, y, 0.0); LANDMARK_COUNT]).unwrap()
    }

    #[test]
    fn test_rejects_wrong_point_count() {
        let err = HandLandmarks::new(vec![LandmarkPoint::default(); 20]).unwrap_err();
        assert!(matches!(err, SignLoomError::Landmarks(_)));
        assert!(err.to_string().contains("got 20"));

        assert!(HandLandmarks::new(Vec::new()).is_err());
    }

    #[test]
    fn test_point_lookup_by_anatomy() {
        let points: Vec<LandmarkPoint> = (0..LANDMARK_COUNT)
            .map(|i| LandmarkPoint::new(i as f64, 0.0, 0.0))
            .collect();
        let hand = HandLandmarks::new(points).unwrap();

        assert_eq!(hand.point(HandLandmark::Wrist).x, 0.0);
        assert_eq!(hand.point(HandLandmark::IndexPip).x, 6.0);
        assert_eq!(hand.point(HandLandmark::PinkyTip).x, 20.0);
    }

    #[test]
    fn test_mean_displacement() {
        let a = flat_hand(0.5);
        let b = flat_hand(0.6);
        assert!((a.mean_displacement(&b) - 0.1).abs() < 1e-9);
        assert_eq!(a.mean_displacement(&a), 0.0);
    }

    #[test]
    fn test_deserialize_enforces_length() {
        let short = serde_json::json!({ "points": [{ "x": 0.1, "y": 0.2 }] });
        assert!(serde_json::from_value::<HandLandmarks>(short).is_err());

        let hand = flat_hand(0.3).with_handedness(Handedness::Right);
        let json = serde_json::to_value(&hand).unwrap();
        let back: HandLandmarks = serde_json::from_value(json).unwrap();
        assert_eq!(back.handedness, Some(Handedness::Right));
    }
}
