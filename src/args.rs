// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, sync::Arc};

use clap::Args;
use tracing::info;

use crate::{
  category::{CategoryError, CategoryTable},
  classifier::Classifier,
  model::{DEFAULT_MIN_CONFIDENCE, LabelDetector},
};

/// 分类器相关参数，各个程序共用
#[derive(Args, Debug, Clone)]
pub struct ClassifierArgs {
  /// 标签映射表（TOML），不指定时使用内置表
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)，低于阈值的目标不参与分类
  #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE, value_name = "THRESHOLD")]
  pub min_confidence: f32,
}

impl ClassifierArgs {
  pub fn build_classifier(&self) -> Result<Classifier, CategoryError> {
    let table = match &self.labels {
      Some(path) => CategoryTable::from_path(path)?,
      None => {
        info!("使用内置标签表");
        CategoryTable::default()
      }
    };
    Ok(Classifier::new(Arc::new(table)))
  }

  pub fn build_detector<T>(&self) -> LabelDetector<T> {
    info!("置信度阈值: {}", self.min_confidence);
    LabelDetector::default().with_min_confidence(self.min_confidence)
  }
}
