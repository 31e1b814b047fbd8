// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/input/json_file.rs - JSON 检测结果输入
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

use std::{
  fs::File,
  io::{BufRead, BufReader, Lines},
};

use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{DetectionFrame, InputError, url_file_path},
  model::{DetectItem, Detection, RecordLabel},
};

/// 将 `[{"label": ..., "confidence": ...}]` 形式的检测序列转换为输入帧
fn detections_to_frame(detections: Vec<Detection>) -> DetectionFrame {
  detections
    .into_iter()
    .map(|detection| DetectItem {
      kind: RecordLabel::Name(detection.label),
      score: detection.confidence,
      bbox: None,
    })
    .collect::<Vec<_>>()
    .into()
}

pub fn parse_detections(content: &str) -> Result<DetectionFrame, InputError> {
  let detections: Vec<Detection> = serde_json::from_str(content)?;
  Ok(detections_to_frame(detections))
}

/// 单个 JSON 文件，只产生一帧
pub struct JsonFileInput {
  frame: Option<DetectionFrame>,
}

impl FromUrlWithScheme for JsonFileInput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonFileInput {
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
    info!("读取检测结果文件: {}", path.display());
    let content = std::fs::read_to_string(&path)?;
    let frame = parse_detections(&content)?;
    debug!("共 {} 条检测", frame.items.len());

    Ok(JsonFileInput { frame: Some(frame) })
  }
}

impl Iterator for JsonFileInput {
  type Item = DetectionFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}

/// 逐行读取的 JSON 流，每个非空行是一帧的检测序列
///
/// 解析失败的行会被跳过，读取错误则结束输入。
pub struct JsonLinesInput {
  lines: Lines<BufReader<File>>,
  line_number: usize,
}

impl FromUrlWithScheme for JsonLinesInput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesInput {
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
    info!("打开检测结果流: {}", path.display());
    let file = File::open(&path)?;

    Ok(JsonLinesInput {
      lines: BufReader::new(file).lines(),
      line_number: 0,
    })
  }
}

impl Iterator for JsonLinesInput {
  type Item = DetectionFrame;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let line = match self.lines.next()? {
        Ok(line) => line,
        Err(e) => {
          error!("读取检测结果流失败: {}", e);
          return None;
        }
      };
      self.line_number += 1;

      let line = line.trim();
      if line.is_empty() {
        continue;
      }

      match parse_detections(line) {
        Ok(frame) => return Some(frame),
        Err(e) => warn!("跳过第 {} 行: {}", self.line_number, e),
      }
    }
  }
}
