// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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
  fs::{File, OpenOptions},
  io::{self, BufWriter, ErrorKind, Write},
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{Datelike, Utc};
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::ClassificationResult,
  output::{OutputError, Render},
};

/// 按 `年/月/日/时-分-秒-序号.json` 的目录结构保存分类结果
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = OutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");
    let directory = urlencoding::decode(uri.path())
      .map(|path| PathBuf::from(path.into_owned()))
      .unwrap_or_else(|_| PathBuf::from(uri.path()));

    Ok(DirectoryRecordOutput {
      directory,
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 在当天目录下创建新的结果文件，已存在的文件名不会被覆盖
  fn create_frame_file(&self) -> Result<(PathBuf, File), OutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    let stamp = now.format("%H-%M-%S").to_string();
    // 同一秒内的文件名可能已被其他进程占用，序号递增直到找到空位
    for _ in 0..=u16::MAX {
      let path = directory.join(format!("{}-{:04X}.json", stamp, self.frame_id()));
      match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => return Ok((path, file)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
          debug!("文件已存在，尝试下一个序号: {}", path.display());
        }
        Err(e) => return Err(e.into()),
      }
    }

    Err(OutputError::IoError(io::Error::new(
      ErrorKind::AlreadyExists,
      format!("{} 下 {} 秒内的序号已用尽", directory.display(), stamp),
    )))
  }
}

impl<F> Render<F, ClassificationResult> for DirectoryRecordOutput {
  type Error = OutputError;

  fn render_result(&self, _frame: &F, result: &ClassificationResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("结果为空，跳过记录");
      return Ok(());
    }

    let (path, file) = self.create_frame_file()?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;
    debug!("结果已保存: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{category::Category, classifier::Classifier, model::Detection};

  fn json_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|ext| ext == "json") {
          found.push(path);
        }
      }
    }
    found
  }

  fn output_for(dir: &Path, query: &str) -> DirectoryRecordOutput {
    let url = Url::parse(&format!("folder://{}{}", dir.display(), query)).unwrap();
    DirectoryRecordOutput::from_url(&url).unwrap()
  }

  #[test]
  fn writes_result_under_dated_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output = output_for(dir.path(), "");
    let result = Classifier::default().classify(vec![Detection::new("bottle", 0.7)]);
    output.render_result(&(), &result).unwrap();

    let files = json_files(dir.path());
    assert_eq!(files.len(), 1);
    let relative = files[0].strip_prefix(dir.path()).unwrap();
    assert_eq!(relative.components().count(), 4);
    assert!(files[0].to_string_lossy().ends_with("-0001.json"));

    let saved: ClassificationResult =
      serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(saved.item_type, Category::Recycle);
  }

  #[test]
  fn empty_result_written_only_with_always() {
    let empty = Classifier::default().classify(Vec::<Detection>::new());

    let dir = tempfile::tempdir().unwrap();
    output_for(dir.path(), "").render_result(&(), &empty).unwrap();
    assert!(json_files(dir.path()).is_empty());

    output_for(dir.path(), "?always").render_result(&(), &empty).unwrap();
    assert_eq!(json_files(dir.path()).len(), 1);
  }

  #[test]
  fn two_outputs_sharing_a_directory_keep_both_results() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = Classifier::default();
    let bottle = classifier.classify(vec![Detection::new("bottle", 0.7)]);
    let banana = classifier.classify(vec![Detection::new("banana", 0.6)]);

    // 两个实例的序号都从 1 开始
    output_for(dir.path(), "").render_result(&(), &bottle).unwrap();
    output_for(dir.path(), "").render_result(&(), &banana).unwrap();

    let files = json_files(dir.path());
    assert_eq!(files.len(), 2);
    let mut kinds: Vec<Category> = files
      .iter()
      .map(|path| {
        serde_json::from_str::<ClassificationResult>(&std::fs::read_to_string(path).unwrap())
          .unwrap()
          .item_type
      })
      .collect();
    kinds.sort();
    assert_eq!(kinds, vec![Category::Recycle, Category::Compost]);
  }

  #[test]
  fn existing_file_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let output = output_for(dir.path(), "");
    let result = Classifier::default().classify(vec![Detection::new("cup", 0.8)]);
    output.render_result(&(), &result).unwrap();
    let first = json_files(dir.path()).remove(0);
    std::fs::write(&first, "keep").unwrap();

    output_for(dir.path(), "").render_result(&(), &result).unwrap();
    assert_eq!(std::fs::read_to_string(&first).unwrap(), "keep");
    assert_eq!(json_files(dir.path()).len(), 2);
  }
}
