// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/classifier.rs - 垃圾类别分类器
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

use std::sync::Arc;

use tracing::debug;

use crate::{
  category::{Category, CategoryTable},
  model::{ClassificationResult, DetectionSet},
};

/// 结果中最多保留的检测数量
pub const MAX_REPORTED_DETECTIONS: usize = 5;

pub const NO_DETECTION_NOTE: &str = "No object detected; defaulted to trash.";

/// 取置信度最高的检测，并按标签表映射到垃圾类别
///
/// 分类器本身无状态，标签表只读共享，可在任意线程并发调用。
#[derive(Debug, Clone, Default)]
pub struct Classifier {
  table: Arc<CategoryTable>,
}

impl Classifier {
  pub fn new(table: Arc<CategoryTable>) -> Self {
    Self { table }
  }

  pub fn table(&self) -> &CategoryTable {
    &self.table
  }

  pub fn classify(&self, detections: impl Into<DetectionSet>) -> ClassificationResult {
    let mut detections = detections.into();

    if detections.is_empty() {
      debug!("未检测到物体，默认归为 {}", Category::Trash);
      return ClassificationResult {
        item_type: Category::Trash,
        top_label: None,
        confidence: 0.0,
        detections: Vec::new(),
        note: Some(NO_DETECTION_NOTE.to_string()),
      };
    }

    detections.sort_by_confidence();
    let mut detections = detections.into_inner();
    detections.truncate(MAX_REPORTED_DETECTIONS);

    let (top_label, confidence) = (detections[0].label.clone(), detections[0].confidence);
    // 未命中任何集合的标签一律归为其他垃圾
    let item_type = self.table.lookup(&top_label).unwrap_or(Category::Trash);
    debug!(
      "最高置信度目标: {} ({:.4}) -> {}",
      top_label, confidence, item_type
    );

    ClassificationResult {
      item_type,
      top_label: Some(top_label),
      confidence,
      detections,
      note: None,
    }
  }
}
