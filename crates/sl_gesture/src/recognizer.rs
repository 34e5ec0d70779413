//! 手势识别器

use rand::Rng;
use serde::{Deserialize, Serialize};
use sl_core::{HandLandmarks, SignDetection};

use crate::rules::{builtin_rules, extended_finger_count, GestureRule};

/// 指数计数模式下的固定置信度
const FINGER_COUNT_CONFIDENCE: f64 = 0.85;

/// 规则集
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// 逐条几何规则，置信度随机扰动
    #[default]
    Geometric,
    /// 只看伸直手指数：≥4 为 Hello，≤1 为 Yes
    FingerCount,
}

/// 手势识别器
pub struct SignRecognizer {
    /// 规则集
    rule_set: RuleSet,
    /// 已注册规则 (按判定顺序)
    rules: Vec<GestureRule>,
}

impl SignRecognizer {
    /// 创建带内置规则的识别器
    pub fn new(rule_set: RuleSet) -> Self {
        Self {
            rule_set,
            rules: builtin_rules(),
        }
    }

    /// 创建默认识别器 (几何规则)
    pub fn default_recognizer() -> Self {
        Self::new(RuleSet::Geometric)
    }

    /// 注册规则，追加到判定顺序末尾；同名规则被替换
    pub fn register(&mut self, rule: GestureRule) {
        if let Some(existing) = self.rules.iter_mut().find(|r| r.name == rule.name) {
            *existing = rule;
        } else {
            self.rules.push(rule);
        }
    }

    /// 通过名称查找规则
    pub fn find(&self, name: &str) -> Option<&GestureRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// 规则名称列表
    pub fn rules(&self) -> Vec<&str> {
        match self.rule_set {
            RuleSet::Geometric => self.rules.iter().map(|r| r.name.as_str()).collect(),
            RuleSet::FingerCount => vec!["hello", "yes"],
        }
    }

    pub fn rule_set(&self) -> RuleSet {
        self.rule_set
    }

    /// 识别手势
    pub fn recognize(&self, hand: &HandLandmarks) -> SignDetection {
        self.recognize_with_rng(hand, &mut rand::thread_rng())
    }

    /// 使用指定随机源识别手势
    pub fn recognize_with_rng<R: Rng>(
        &self,
        hand: &HandLandmarks,
        rng: &mut R,
    ) -> SignDetection {
        match self.rule_set {
            RuleSet::Geometric => self.best_geometric_match(hand, rng),
            RuleSet::FingerCount => Self::finger_count_match(hand),
        }
    }

    fn best_geometric_match<R: Rng>(
        &self,
        hand: &HandLandmarks,
        rng: &mut R,
    ) -> SignDetection {
        let mut best: Option<(&GestureRule, f64)> = None;

        for rule in self.rules.iter().filter(|r| r.matches(hand)) {
            let confidence = 0.8 + rng.gen::<f64>() * 0.2;
            if best.map_or(true, |(_, c)| confidence > c) {
                best = Some((rule, confidence));
            }
        }

        match best {
            Some((rule, confidence)) => SignDetection::matched(rule.label(), confidence),
            None => SignDetection::none(),
        }
    }

    fn finger_count_match(hand: &HandLandmarks) -> SignDetection {
        match extended_finger_count(hand) {
            n if n >= 4 => SignDetection::matched("Hello", FINGER_COUNT_CONFIDENCE),
            n if n <= 1 => SignDetection::matched("Yes", FINGER_COUNT_CONFIDENCE),
            _ => SignDetection::none(),
        }
    }

    /// 已注册规则数
    pub fn count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for SignRecognizer {
    fn default() -> Self {
        Self::default_recognizer()
    }
}
