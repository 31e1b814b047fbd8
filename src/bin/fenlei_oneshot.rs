// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/bin/fenlei_oneshot.rs - 单次分类
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use fenlei::{
  FromUrl,
  args::ClassifierArgs,
  input::InputWrapper,
  model::RecordLabel,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// 读取一帧检测结果并给出垃圾类别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源（json:///path, record:///path, jsonl:///path）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径（stdout:, folder:///dir）
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,

  #[command(flatten)]
  pub classifier: ClassifierArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let detector = args.classifier.build_detector::<RecordLabel>();
  let classifier = args.classifier.build_classifier()?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, detector, &classifier, output)?;

  Ok(())
}
