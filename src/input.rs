// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/input.rs - 检测记录输入
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

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl,
  model::{DetectResult, RecordLabel},
};

/// 输入帧：检测器对一张图像给出的原始结果
pub type DetectionFrame = DetectResult<RecordLabel>;

#[cfg(feature = "json_input")]
mod json_file;
#[cfg(feature = "json_input")]
pub use self::json_file::{JsonFileInput, JsonLinesInput};

#[cfg(feature = "record_input")]
mod record_file;
#[cfg(feature = "record_input")]
pub use self::record_file::{RecordFileInput, parse_record};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("路径无效: {0}")]
  InvalidPath(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("记录第 {line} 行解析错误: {reason}")]
  RecordError { line: usize, reason: String },
}

/// 取出 URL 中的文件路径，并还原百分号编码
pub(crate) fn url_file_path(url: &Url) -> Result<PathBuf, InputError> {
  let path = urlencoding::decode(url.path())
    .map_err(|_| InputError::InvalidPath(url.path().to_string()))?;
  if path.is_empty() {
    return Err(InputError::InvalidPath(url.to_string()));
  }
  Ok(PathBuf::from(path.into_owned()))
}

pub enum InputWrapper {
  #[cfg(feature = "json_input")]
  JsonFile(JsonFileInput),
  #[cfg(feature = "json_input")]
  JsonLines(JsonLinesInput),
  #[cfg(feature = "record_input")]
  RecordFile(RecordFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "json_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == JsonFileInput::SCHEME {
        return Ok(InputWrapper::JsonFile(JsonFileInput::from_url(url)?));
      }
      if url.scheme() == JsonLinesInput::SCHEME {
        return Ok(InputWrapper::JsonLines(JsonLinesInput::from_url(url)?));
      }
    }
    #[cfg(feature = "record_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == RecordFileInput::SCHEME {
        return Ok(InputWrapper::RecordFile(RecordFileInput::from_url(url)?));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = DetectionFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "json_input")]
      InputWrapper::JsonFile(input) => input.next(),
      #[cfg(feature = "json_input")]
      InputWrapper::JsonLines(input) => input.next(),
      #[cfg(feature = "record_input")]
      InputWrapper::RecordFile(input) => input.next(),
    }
  }
}
