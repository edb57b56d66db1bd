// 该文件是 Fenlei （分类） 项目的一部分。
// src/output/json_output.rs - 结果 JSON 输出
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
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, envelope::ResultEnvelope, output::Render, url_file_path};

#[derive(Error, Debug)]
pub enum JsonOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

fn check_scheme(url: &Url, expected: &str) -> Result<(), JsonOutputError> {
  if url.scheme() != expected {
    return Err(JsonOutputError::SchemeMismatch(format!(
      "期望输出方式 '{}', 实际输出方式 '{}'",
      expected,
      url.scheme()
    )));
  }
  Ok(())
}

pub struct StdoutOutput;

impl FromUrlWithScheme for StdoutOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    Ok(StdoutOutput)
  }
}

impl Render<ResultEnvelope> for StdoutOutput {
  type Error = JsonOutputError;

  fn render_result(&self, result: &ResultEnvelope) -> Result<(), Self::Error> {
    let text = serde_json::to_string_pretty(result)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    Ok(())
  }
}

pub struct JsonFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for JsonFileOutput {
  const SCHEME: &'static str = "file";
}

impl FromUrl for JsonFileOutput {
  type Error = JsonOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme(url, Self::SCHEME)?;
    Ok(JsonFileOutput {
      path: url_file_path(url),
    })
  }
}

impl Render<ResultEnvelope> for JsonFileOutput {
  type Error = JsonOutputError;

  fn render_result(&self, result: &ResultEnvelope) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let text = serde_json::to_string_pretty(result)?;
    std::fs::write(&self.path, text)?;
    info!("结果已写入: {}", self.path.display());
    Ok(())
  }
}
