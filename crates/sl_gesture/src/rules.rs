//! 几何手势规则
//!
//! 每条规则是关键点坐标上的一个布尔谓词。坐标 `y` 向下增长，
//! 所以 "指尖在关节上方" 即 `tip.y < joint.y`。

use sl_core::{HandLandmark, HandLandmarks};

/// 规则谓词
pub type Predicate = fn(&HandLandmarks) -> bool;

/// 一条手势规则
#[derive(Debug, Clone)]
pub struct GestureRule {
    /// 规则名 (snake_case)
    pub name: String,
    /// 谓词
    predicate: Predicate,
}

impl GestureRule {
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    /// 是否匹配
    pub fn matches(&self, hand: &HandLandmarks) -> bool {
        (self.predicate)(hand)
    }

    /// 对外展示的手势名称
    pub fn label(&self) -> String {
        format_label(&self.name)
    }
}

/// 内置规则，按判定顺序排列
pub fn builtin_rules() -> Vec<GestureRule> {
    vec![
        GestureRule::new("hello", is_hello),
        GestureRule::new("thank_you", is_thank_you),
        GestureRule::new("please", is_please),
        GestureRule::new("yes", is_yes),
        GestureRule::new("no", is_no),
    ]
}

/// `thank_you` → `Thank You`
pub fn format_label(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 伸直的手指数 (指尖高于对应中间关节, 含拇指)
pub fn extended_finger_count(hand: &HandLandmarks) -> usize {
    HandLandmark::FINGER_TIPS
        .iter()
        .zip(HandLandmark::FINGER_PIPS.iter())
        .filter(|(tip, pip)| hand.point(**tip).y < hand.point(**pip).y)
        .count()
}

/// 弯曲的手指数 (指尖低于掌指关节, 不含拇指)
pub fn curled_finger_count(hand: &HandLandmarks) -> usize {
    HandLandmark::FINGER_TIPS[1..]
        .iter()
        .zip(HandLandmark::FINGER_MCPS.iter())
        .filter(|(tip, mcp)| hand.point(**tip).y > hand.point(**mcp).y)
        .count()
}

/// 张开手掌：至少四根手指伸直
pub fn is_hello(hand: &HandLandmarks) -> bool {
    extended_finger_count(hand) >= 4
}

/// 手在脸部高度，中指指尖高于手腕
pub fn is_thank_you(hand: &HandLandmarks) -> bool {
    let wrist = hand.point(HandLandmark::Wrist);
    let middle_tip = hand.point(HandLandmark::MiddleTip);
    wrist.y < 0.6 && middle_tip.y < wrist.y
}

/// 手腕在胸口高度
pub fn is_please(hand: &HandLandmarks) -> bool {
    let wrist = hand.point(HandLandmark::Wrist);
    0.4 < wrist.y && wrist.y < 0.8
}

/// 握拳：至少三根手指弯曲
pub fn is_yes(hand: &HandLandmarks) -> bool {
    curled_finger_count(hand) >= 3
}

/// 食指伸直且中指弯曲
pub fn is_no(hand: &HandLandmarks) -> bool {
    let index_extended =
        hand.point(HandLandmark::IndexTip).y < hand.point(HandLandmark::IndexPip).y;
    let middle_curled =
        hand.point(HandLandmark::MiddleTip).y > hand.point(HandLandmark::MiddlePip).y;
    index_extended && middle_curled
}
