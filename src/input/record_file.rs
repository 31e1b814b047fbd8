// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/input/record_file.rs - 检测记录文件输入
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

//! 检测记录文件输入
//!
//! 读取检测器以文本形式记录下的单帧结果。每行一个目标：
//!
//! ```text
//! label, score[, x_min, y_min, x_max, y_max]
//! ```
//!
//! - `label` 为纯数字时视为 COCO 类别编号，否则视为类别名称
//! - `score` 为置信度，取值 `[0, 1]`
//! - 边框坐标可省略，省略时四个值必须同时省略
//! - 空行以及以 `#` 开头的行会被忽略
//!
//! ## 基本用法
//!
//! ```no_run
//! use fenlei::{FromUrl, input::RecordFileInput};
//! use url::Url;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("record:///var/lib/fenlei/scan-0001.txt")?;
//! for frame in RecordFileInput::from_url(&url)? {
//!     println!("共 {} 个目标", frame.items.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 解析单个记录
//!
//! ```
//! use fenlei::{input::parse_record, model::WithLabel};
//!
//! let frame = parse_record("39, 0.91, 0.1, 0.2, 0.5, 0.8\nbanana, 0.40\n").unwrap();
//! assert_eq!(frame.items[0].kind.to_label_str(), "bottle");
//! assert_eq!(frame.items[1].bbox, None);
//! ```

use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{DetectionFrame, InputError, url_file_path},
  model::{DetectItem, RecordLabel},
};

fn parse_number(field: &str, line: usize, name: &str) -> Result<f32, InputError> {
  field.trim().parse::<f32>().map_err(|e| InputError::RecordError {
    line,
    reason: format!("{} 无法解析为数字 ({}): {}", name, field.trim(), e),
  })
}

fn parse_line(content: &str, line: usize) -> Result<DetectItem<RecordLabel>, InputError> {
  let fields: Vec<&str> = content.split(',').collect();
  if fields.len() != 2 && fields.len() != 6 {
    return Err(InputError::RecordError {
      line,
      reason: format!("期望 2 或 6 个字段，实际为 {}", fields.len()),
    });
  }

  let label = fields[0].trim();
  if label.is_empty() {
    return Err(InputError::RecordError {
      line,
      reason: "标签为空".to_string(),
    });
  }

  let score = parse_number(fields[1], line, "置信度")?;
  let bbox = if fields.len() == 6 {
    Some([
      parse_number(fields[2], line, "x_min")?,
      parse_number(fields[3], line, "y_min")?,
      parse_number(fields[4], line, "x_max")?,
      parse_number(fields[5], line, "y_max")?,
    ])
  } else {
    None
  };

  Ok(DetectItem {
    kind: RecordLabel::from(label),
    score,
    bbox,
  })
}

/// 解析一整份检测记录
pub fn parse_record(content: &str) -> Result<DetectionFrame, InputError> {
  let mut items = Vec::new();
  for (index, line) in content.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    items.push(parse_line(line, index + 1)?);
  }
  Ok(items.into())
}

pub struct RecordFileInput {
  frame: Option<DetectionFrame>,
}

impl FromUrlWithScheme for RecordFileInput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    let path = url_file_path(url)?;
    info!("读取检测记录: {}", path.display());
    let content = std::fs::read_to_string(&path)?;
    let frame = parse_record(&content)?;
    debug!("记录中共 {} 个目标", frame.items.len());

    Ok(RecordFileInput { frame: Some(frame) })
  }
}

impl Iterator for RecordFileInput {
  type Item = DetectionFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}
