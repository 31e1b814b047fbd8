// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/output/stdout_output.rs - 标准输出
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

use std::io::Write;

use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::ClassificationResult,
  output::{OutputError, Render},
};

/// 每个结果输出一行 JSON，`stdout:?pretty` 时输出缩进格式
pub struct StdoutOutput {
  pretty: bool,
}

impl StdoutOutput {
  pub fn write_result<W: Write>(
    &self,
    writer: &mut W,
    result: &ClassificationResult,
  ) -> Result<(), OutputError> {
    if self.pretty {
      serde_json::to_writer_pretty(&mut *writer, result)?;
    } else {
      serde_json::to_writer(&mut *writer, result)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
  }
}

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }

    let pretty = url.query_pairs().any(|(k, _)| k == "pretty");
    Ok(StdoutOutput { pretty })
  }
}

impl<F> Render<F, ClassificationResult> for StdoutOutput {
  type Error = OutputError;

  fn render_result(&self, _frame: &F, result: &ClassificationResult) -> Result<(), Self::Error> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    self.write_result(&mut handle, result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{category::Category, model::Detection};

  fn sample() -> ClassificationResult {
    ClassificationResult {
      item_type: Category::Compost,
      top_label: Some("banana".to_string()),
      confidence: 0.5,
      detections: vec![Detection::new("banana", 0.5)],
      note: None,
    }
  }

  #[test]
  fn writes_one_json_line() {
    let output = StdoutOutput::from_url(&Url::parse("stdout:").unwrap()).unwrap();
    let mut buffer = Vec::new();
    output.write_result(&mut buffer, &sample()).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert_eq!(
      text,
      "{\"itemType\":\"compost\",\"topLabel\":\"banana\",\"confidence\":0.5,\"detections\":[{\"label\":\"banana\",\"confidence\":0.5}]}\n"
    );
  }

  #[test]
  fn pretty_query_indents() {
    let output = StdoutOutput::from_url(&Url::parse("stdout:?pretty").unwrap()).unwrap();
    let mut buffer = Vec::new();
    output.write_result(&mut buffer, &sample()).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("\n  \"itemType\": \"compost\""));
    let parsed: ClassificationResult = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, sample());
  }
}
