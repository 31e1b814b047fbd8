// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/category.rs - 垃圾类别与标签映射表
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

use std::{collections::BTreeSet, fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CategoryError {
  #[error("未知的垃圾类别: {0}")]
  UnknownCategory(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签表解析错误: {0}")]
  TomlError(#[from] toml::de::Error),
}

/// 垃圾投放类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Trash,
  Recycle,
  Compost,
}

impl Category {
  /// 查表优先级：堆肥 → 可回收 → 其他垃圾
  pub const PRIORITY: [Category; 3] = [Category::Compost, Category::Recycle, Category::Trash];

  pub fn as_str(&self) -> &'static str {
    match self {
      Category::Trash => "trash",
      Category::Recycle => "recycle",
      Category::Compost => "compost",
    }
  }

  /// 对应垃圾桶的名称
  pub fn bin_name(&self) -> &'static str {
    match self {
      Category::Trash => "Trash Can",
      Category::Recycle => "Recycling Bin",
      Category::Compost => "Compost Bin",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Category::Trash => "General Waste",
      Category::Recycle => "Recyclable",
      Category::Compost => "Compostable",
    }
  }

  /// 正确投放一次所得积分
  pub fn points(&self) -> u32 {
    match self {
      Category::Trash => 10,
      Category::Recycle => 15,
      Category::Compost => 20,
    }
  }

  /// 按垃圾桶颜色推断类别：蓝色为可回收，绿色为堆肥，其余均视为其他垃圾
  pub fn from_can_color(color: &str) -> Self {
    match color.trim().to_lowercase().as_str() {
      "blue" => Category::Recycle,
      "green" => Category::Compost,
      _ => Category::Trash,
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = CategoryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "trash" => Ok(Category::Trash),
      "recycle" => Ok(Category::Recycle),
      "compost" => Ok(Category::Compost),
      _ => Err(CategoryError::UnknownCategory(s.to_string())),
    }
  }
}

const DEFAULT_RECYCLE: &[&str] = &[
  "bottle",
  "cup",
  "wine glass",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "can",
  "book",
  "paper",
  "cardboard",
  "sports ball",
];

const DEFAULT_COMPOST: &[&str] = &[
  "banana", "apple", "orange", "broccoli", "carrot", "hot dog", "pizza", "sandwich",
];

const DEFAULT_TRASH: &[&str] = &["plastic bag", "straw", "toothbrush", "diaper"];

/// 标签表的 TOML 形式
#[derive(Debug, Default, Deserialize)]
struct CategoryTableConfig {
  #[serde(default)]
  compost: Vec<String>,
  #[serde(default)]
  recycle: Vec<String>,
  #[serde(default)]
  trash: Vec<String>,
}

/// 标签到垃圾类别的映射表
///
/// 三个集合均保存归一化（小写）后的标签。构造完成后只读，
/// 通过 `Arc` 在各个请求之间共享。集合之间不强制互斥，
/// 查询时按 [`Category::PRIORITY`] 的顺序命中第一个集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
  compost: BTreeSet<String>,
  recycle: BTreeSet<String>,
  trash: BTreeSet<String>,
}

fn normalize_label(label: &str) -> String {
  label.trim().to_lowercase()
}

fn normalize_set<I, S>(labels: I) -> BTreeSet<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  labels
    .into_iter()
    .map(|label| normalize_label(label.as_ref()))
    .filter(|label| !label.is_empty())
    .collect()
}

impl Default for CategoryTable {
  fn default() -> Self {
    Self::new(DEFAULT_COMPOST, DEFAULT_RECYCLE, DEFAULT_TRASH)
  }
}

impl CategoryTable {
  pub fn new<I, S>(compost: I, recycle: I, trash: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self {
      compost: normalize_set(compost),
      recycle: normalize_set(recycle),
      trash: normalize_set(trash),
    }
  }

  pub fn from_toml_str(content: &str) -> Result<Self, CategoryError> {
    let config: CategoryTableConfig = toml::from_str(content)?;
    let table = Self::new(config.compost, config.recycle, config.trash);
    for (label, categories) in table.overlaps() {
      warn!(
        "标签 {} 同时出现在 {:?} 中，按优先级归为 {}",
        label, categories, categories[0]
      );
    }
    debug!(
      "标签表: 堆肥 {} 项, 可回收 {} 项, 其他垃圾 {} 项",
      table.compost.len(),
      table.recycle.len(),
      table.trash.len()
    );
    Ok(table)
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CategoryError> {
    let path = path.as_ref();
    info!("加载标签表: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }

  pub fn labels(&self, category: Category) -> &BTreeSet<String> {
    match category {
      Category::Compost => &self.compost,
      Category::Recycle => &self.recycle,
      Category::Trash => &self.trash,
    }
  }

  /// 查询标签所属类别，大小写不敏感；未命中任何集合时返回 `None`
  pub fn lookup(&self, label: &str) -> Option<Category> {
    let label = label.to_lowercase();
    Category::PRIORITY
      .into_iter()
      .find(|category| self.labels(*category).contains(&label))
  }

  /// 出现在多个集合中的标签，类别按查询优先级排列
  pub fn overlaps(&self) -> Vec<(String, Vec<Category>)> {
    let mut all: BTreeSet<&String> = BTreeSet::new();
    all.extend(&self.compost);
    all.extend(&self.recycle);
    all.extend(&self.trash);

    all
      .into_iter()
      .filter_map(|label| {
        let categories: Vec<Category> = Category::PRIORITY
          .into_iter()
          .filter(|category| self.labels(*category).contains(label))
          .collect();
        (categories.len() > 1).then(|| (label.clone(), categories))
      })
      .collect()
  }
}
