// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/task.rs - 分类任务
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

use std::{collections::BTreeMap, thread, time::Duration};
use tracing::{error, info, warn};

use crate::{
  category::Category,
  classifier::Classifier,
  model::{ClassificationResult, Detector},
  output::Render,
};

const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub trait Task<I, D, O>: Sized {
  type Error;
  fn run_task(
    self,
    input: I,
    detector: D,
    classifier: &Classifier,
    output: O,
  ) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  DE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  D: Detector<Input = F, Error = DE>,
  O: Render<F, ClassificationResult, Error = RE>,
> Task<I, D, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    detector: D,
    classifier: &Classifier,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let now = std::time::Instant::now();
    let detections = detector.detect(&frame)?;
    let result = classifier.classify(detections);
    info!(
      "分类完成: {} ({:?}, {:.4})，耗时: {:.2?}",
      result.item_type,
      result.top_label,
      result.confidence,
      now.elapsed()
    );
    output.render_result(&frame, &result)?;

    Ok(())
  }
}

/// 按类别统计一次运行中分类的物品数与积分
///
/// 指定投放的垃圾桶后，只有类别与该桶一致的物品计分。
#[derive(Default, Debug, Clone)]
pub struct SortingTally {
  counts: BTreeMap<Category, usize>,
  bin: Option<Category>,
}

impl SortingTally {
  pub fn new(bin: Option<Category>) -> Self {
    Self {
      counts: BTreeMap::new(),
      bin,
    }
  }

  pub fn record(&mut self, category: Category) {
    *self.counts.entry(category).or_default() += 1;
  }

  pub fn count(&self, category: Category) -> usize {
    self.counts.get(&category).copied().unwrap_or(0)
  }

  pub fn total(&self) -> usize {
    self.counts.values().sum()
  }

  fn scores(&self, category: Category) -> bool {
    self.bin.is_none_or(|bin| bin == category)
  }

  pub fn points(&self) -> u32 {
    self
      .counts
      .iter()
      .filter(|(category, _)| self.scores(**category))
      .map(|(category, count)| *count as u32 * category.points())
      .sum()
  }

  pub fn log_summary(&self) {
    if let Some(bin) = self.bin {
      info!("投放垃圾桶: {}", bin.bin_name());
    }
    for (category, count) in &self.counts {
      let points = if self.scores(*category) {
        *count as u32 * category.points()
      } else {
        0
      };
      info!(
        "{} ({}, {}): {} 帧, {} 分",
        category.title(),
        category,
        category.bin_name(),
        count,
        points
      );
    }
    info!("共 {} 帧, 积分 {}", self.total(), self.points());
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  bin: Option<Category>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 指定物品投放的垃圾桶，用于积分统计
  pub fn with_bin(mut self, bin: Option<Category>) -> Self {
    self.bin = bin;
    self
  }
}

impl<
  F,
  DE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  D: Detector<Input = F, Error = DE>,
  O: Render<F, ClassificationResult, Error = RE>,
> Task<I, D, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    detector: D,
    classifier: &Classifier,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    // 同一进程只能注册一次中断处理
    if let Err(e) = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    }) {
      warn!("无法注册中断处理: {}", e);
    }

    let mut frame_index = 0;
    let mut tally = SortingTally::new(self.bin);
    for frame in input {
      frame_index += 1;
      info!("处理第 {} 帧", frame_index);
      match detector.detect(&frame) {
        Ok(detections) => {
          let result = classifier.classify(detections);
          info!(
            "第 {} 帧: {} ({:?}, {:.4})",
            frame_index, result.item_type, result.top_label, result.confidence
          );
          tally.record(result.item_type);
          output.render_result(&frame, &result)?;
        }
        Err(e) => error!("第 {} 帧检测失败，跳过: {}", frame_index, e),
      }
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    tally.log_summary();
    info!("任务完成，退出");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible};

  use super::*;
  use crate::model::{Detection, DetectionSet};

  /// 直接把帧当作检测结果的检测器
  struct PassThrough;

  impl Detector for PassThrough {
    type Input = Vec<Detection>;
    type Error = std::io::Error;

    fn detect(&self, input: &Self::Input) -> Result<DetectionSet, Self::Error> {
      if input.iter().any(|d| d.label == "broken") {
        return Err(std::io::Error::other("detector failure"));
      }
      Ok(input.clone().into())
    }
  }

  #[derive(Default)]
  struct Collect(RefCell<Vec<ClassificationResult>>);

  impl Render<Vec<Detection>, ClassificationResult> for &Collect {
    type Error = Infallible;

    fn render_result(
      &self,
      _frame: &Vec<Detection>,
      result: &ClassificationResult,
    ) -> Result<(), Self::Error> {
      self.0.borrow_mut().push(result.clone());
      Ok(())
    }
  }

  fn frames() -> Vec<Vec<Detection>> {
    vec![
      vec![Detection::new("banana", 0.6), Detection::new("bottle", 0.9)],
      vec![Detection::new("broken", 0.9)],
      vec![],
      vec![Detection::new("apple", 0.4)],
    ]
  }

  #[test]
  fn one_shot_classifies_first_frame() {
    let collect = Collect::default();
    OneShotTask
      .run_task(frames().into_iter(), PassThrough, &Classifier::default(), &collect)
      .unwrap();
    let results = collect.0.into_inner();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].item_type, Category::Recycle);
  }

  #[test]
  fn one_shot_fails_without_input() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(
      Vec::<Vec<Detection>>::new().into_iter(),
      PassThrough,
      &Classifier::default(),
      &collect,
    );
    assert!(result.is_err());
  }

  #[test]
  fn one_shot_propagates_detector_error() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(
      vec![vec![Detection::new("broken", 0.9)]].into_iter(),
      PassThrough,
      &Classifier::default(),
      &collect,
    );
    assert!(result.is_err());
    assert!(collect.0.into_inner().is_empty());
  }

  #[test]
  fn continuous_skips_failed_frames() {
    let collect = Collect::default();
    ContinuousTask::default()
      .run_task(frames().into_iter(), PassThrough, &Classifier::default(), &collect)
      .unwrap();
    let kinds: Vec<Category> = collect.0.into_inner().iter().map(|r| r.item_type).collect();
    assert_eq!(kinds, vec![Category::Recycle, Category::Trash, Category::Compost]);
  }

  #[test]
  fn tally_awards_points_per_category() {
    let mut tally = SortingTally::default();
    for category in [Category::Compost, Category::Recycle, Category::Trash, Category::Compost] {
      tally.record(category);
    }
    assert_eq!(tally.count(Category::Compost), 2);
    assert_eq!(tally.count(Category::Recycle), 1);
    assert_eq!(tally.total(), 4);
    assert_eq!(tally.points(), 20 * 2 + 15 + 10);
  }

  #[test]
  fn tally_with_bin_scores_only_matching_items() {
    let mut tally = SortingTally::new(Some(Category::from_can_color("blue")));
    tally.record(Category::Recycle);
    tally.record(Category::Recycle);
    tally.record(Category::Compost);
    assert_eq!(tally.total(), 3);
    assert_eq!(tally.points(), 30);
    assert_eq!(SortingTally::new(Some(Category::Trash)).points(), 0);
  }

  #[test]
  fn continuous_stops_at_frame_number() {
    let collect = Collect::default();
    ContinuousTask::default()
      .with_frame_number(Some(3))
      .run_task(frames().into_iter(), PassThrough, &Classifier::default(), &collect)
      .unwrap();
    assert_eq!(collect.0.into_inner().len(), 2);
  }
}
