// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/model.rs - 检测结果与检测器约定
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::category::Category;

/// 检测器给出的单个物体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub label: String,
  pub confidence: f32,
}

impl Detection {
  pub fn new(label: impl Into<String>, confidence: f32) -> Self {
    Self {
      label: label.into(),
      confidence,
    }
  }
}

/// 降序比较置信度，NaN 视为最小
fn compare_confidence(a: f32, b: f32) -> Ordering {
  match (a.is_nan(), b.is_nan()) {
    (true, true) => Ordering::Equal,
    (true, false) => Ordering::Greater,
    (false, true) => Ordering::Less,
    (false, false) => b.total_cmp(&a),
  }
}

/// 单张图像的检测结果序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet(Vec<Detection>);

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.0.iter()
  }

  /// 按置信度降序稳定排序，置信度相同时保持原有顺序，NaN 排在最后
  pub fn sort_by_confidence(&mut self) {
    self.0.sort_by(|a, b| compare_confidence(a.confidence, b.confidence));
  }

  pub fn into_inner(self) -> Vec<Detection> {
    self.0
  }
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(detections: Vec<Detection>) -> Self {
    Self(detections)
  }
}

impl FromIterator<Detection> for DetectionSet {
  fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for DetectionSet {
  type Item = Detection;
  type IntoIter = std::vec::IntoIter<Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

/// 分类结果，字段名与 JSON 输出一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
  pub item_type: Category,
  pub top_label: Option<String>,
  pub confidence: f32,
  pub detections: Vec<Detection>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

impl ClassificationResult {
  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> Option<u32>;
}

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CocoLabel(u32);

impl CocoLabel {
  pub fn from_label_id(id: u32) -> Self {
    CocoLabel(id)
  }
}

impl WithLabel for CocoLabel {
  // 超出类别表的编号直接以数字作为标签
  fn to_label_str(&self) -> String {
    COCO_CLASSES
      .get(self.0 as usize)
      .map(|name| name.to_string())
      .unwrap_or_else(|| self.0.to_string())
  }

  fn to_label_id(&self) -> Option<u32> {
    Some(self.0)
  }
}

/// 记录文件中的标签，可以是类别编号也可以是名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLabel {
  Id(CocoLabel),
  Name(String),
}

impl From<&str> for RecordLabel {
  fn from(s: &str) -> Self {
    let s = s.trim();
    match s.parse::<u32>() {
      Ok(id) => RecordLabel::Id(CocoLabel::from_label_id(id)),
      Err(_) => RecordLabel::Name(s.to_string()),
    }
  }
}

impl WithLabel for RecordLabel {
  fn to_label_str(&self) -> String {
    match self {
      RecordLabel::Id(label) => label.to_label_str(),
      RecordLabel::Name(name) => name.clone(),
    }
  }

  fn to_label_id(&self) -> Option<u32> {
    match self {
      RecordLabel::Id(label) => label.to_label_id(),
      RecordLabel::Name(_) => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct DetectItem<T> {
  pub kind: T,
  pub score: f32,
  pub bbox: Option<[f32; 4]>, // [x_min, y_min, x_max, y_max]
}

#[derive(Debug, Clone)]
pub struct DetectResult<T> {
  pub items: Box<[DetectItem<T>]>,
}

impl<T> DetectResult<T> {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl<T> From<Vec<DetectItem<T>>> for DetectResult<T> {
  fn from(items: Vec<DetectItem<T>>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

/// 目标检测器：由输入帧得到检测序列
pub trait Detector {
  type Input;
  type Error;

  fn detect(&self, input: &Self::Input) -> Result<DetectionSet, Self::Error>;
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("置信度无效: {label} 的置信度为 {score}")]
  InvalidScore { label: String, score: f32 },
}

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;

/// 将检测器记录下的原始结果解析为带文字标签的检测序列
#[derive(Debug)]
pub struct LabelDetector<T> {
  min_confidence: f32,
  _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for LabelDetector<T> {
  fn default() -> Self {
    Self {
      min_confidence: DEFAULT_MIN_CONFIDENCE,
      _phantom: std::marker::PhantomData,
    }
  }
}

impl<T> LabelDetector<T> {
  pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
    self.min_confidence = min_confidence;
    self
  }

  pub fn min_confidence(&self) -> f32 {
    self.min_confidence
  }
}

impl<T: WithLabel> Detector for LabelDetector<T> {
  type Input = DetectResult<T>;
  type Error = DetectorError;

  fn detect(&self, input: &Self::Input) -> Result<DetectionSet, Self::Error> {
    let mut detections = Vec::with_capacity(input.items.len());
    for item in input.items.iter() {
      let label = item.kind.to_label_str();
      if !item.score.is_finite() || !(0.0..=1.0).contains(&item.score) {
        return Err(DetectorError::InvalidScore {
          label,
          score: item.score,
        });
      }
      if item.score < self.min_confidence {
        debug!("丢弃低置信度目标: {} ({:.4})", label, item.score);
        continue;
      }
      match (item.kind.to_label_id(), item.bbox) {
        (Some(id), Some(bbox)) => debug!("目标 {} (#{}) {:.4} 边框 {:?}", label, id, item.score, bbox),
        (Some(id), None) => debug!("目标 {} (#{}) {:.4}", label, id, item.score),
        (None, Some(bbox)) => debug!("目标 {} {:.4} 边框 {:?}", label, item.score, bbox),
        (None, None) => debug!("目标 {} {:.4}", label, item.score),
      }
      detections.push(Detection::new(label, item.score));
    }
    debug!("检测到 {} 个物体", detections.len());
    Ok(detections.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(kind: &str, score: f32) -> DetectItem<RecordLabel> {
    DetectItem {
      kind: RecordLabel::from(kind),
      score,
      bbox: None,
    }
  }

  #[test]
  fn coco_label_resolves_names() {
    assert_eq!(CocoLabel::from_label_id(39).to_label_str(), "bottle");
    assert_eq!(CocoLabel::from_label_id(46).to_label_str(), "banana");
    assert_eq!(CocoLabel::from_label_id(999).to_label_str(), "999");
  }

  #[test]
  fn record_label_parses_ids_and_names() {
    assert_eq!(RecordLabel::from(" 23 ").to_label_str(), "giraffe");
    assert_eq!(RecordLabel::from(" 23 ").to_label_id(), Some(23));
    assert_eq!(RecordLabel::from("plastic bag").to_label_str(), "plastic bag");
    assert_eq!(RecordLabel::from("plastic bag").to_label_id(), None);
  }

  #[test]
  fn label_detector_filters_by_confidence() {
    let result: DetectResult<RecordLabel> =
      vec![item("39", 0.9), item("banana", 0.1), item("cup", 0.25)].into();
    let detections = LabelDetector::<RecordLabel>::default().detect(&result).unwrap();
    assert_eq!(
      detections.into_inner(),
      vec![Detection::new("bottle", 0.9), Detection::new("cup", 0.25)]
    );
  }

  #[test]
  fn label_detector_accepts_boxed_items() {
    let mut boxed = item("46", 0.8);
    boxed.bbox = Some([0.1, 0.2, 0.5, 0.8]);
    let result: DetectResult<RecordLabel> = vec![boxed, item("plastic bag", 0.6)].into();
    let detections = LabelDetector::<RecordLabel>::default().detect(&result).unwrap();
    assert_eq!(
      detections.into_inner(),
      vec![Detection::new("banana", 0.8), Detection::new("plastic bag", 0.6)]
    );
  }

  #[test]
  fn label_detector_rejects_invalid_scores() {
    let result: DetectResult<RecordLabel> = vec![item("cup", 1.5)].into();
    assert!(matches!(
      LabelDetector::<RecordLabel>::default().detect(&result),
      Err(DetectorError::InvalidScore { .. })
    ));

    let result: DetectResult<RecordLabel> = vec![item("cup", f32::NAN)].into();
    assert!(LabelDetector::<RecordLabel>::default().with_min_confidence(0.0).detect(&result).is_err());
  }

  #[test]
  fn sort_is_stable_for_ties() {
    let mut set: DetectionSet = vec![
      Detection::new("a", 0.5),
      Detection::new("b", 0.9),
      Detection::new("c", 0.5),
    ]
    .into();
    set.sort_by_confidence();
    let labels: Vec<_> = set.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["b", "a", "c"]);
  }

  #[test]
  fn nan_confidence_sorts_last() {
    let mut set: DetectionSet = vec![
      Detection::new("giraffe", 0.1),
      Detection::new("x", f32::NAN),
      Detection::new("bottle", 0.9),
    ]
    .into();
    set.sort_by_confidence();
    let labels: Vec<_> = set.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["bottle", "giraffe", "x"]);
  }

  #[test]
  fn many_nans_keep_finite_values_sorted() {
    let mut set: DetectionSet = (0..200)
      .map(|i| {
        let confidence = if i % 7 == 0 { f32::NAN } else { (i % 31) as f32 / 30.0 };
        Detection::new(format!("l{}", i), confidence)
      })
      .collect();
    set.sort_by_confidence();
    let confidences: Vec<f32> = set.iter().map(|d| d.confidence).collect();
    let finite = confidences.iter().take_while(|c| !c.is_nan()).count();
    assert!(confidences[finite..].iter().all(|c| c.is_nan()));
    assert!(confidences[..finite].windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(confidences[0], 1.0);
  }

  #[test]
  fn result_serializes_with_contract_field_names() {
    let result = ClassificationResult {
      item_type: Category::Recycle,
      top_label: None,
      confidence: 0.0,
      detections: vec![],
      note: None,
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["itemType"], "recycle");
    assert!(value["topLabel"].is_null());
    assert!(value.get("note").is_none());
    assert!(value["detections"].as_array().unwrap().is_empty());
  }
}
