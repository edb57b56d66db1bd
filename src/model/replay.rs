// 该文件是 Fenlei （分类） 项目的一部分。
// src/model/replay.rs - 回放已记录的模型响应
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
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::ImageUpload,
  url_file_path,
  model::{AdviceModel, DetectResult, ObjectDetector, TextRecognizer},
};

const REPLAY_DEFAULT_MODEL: &str = "replay";

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("模型路径必须使用 {0} 方案")]
  SchemeMismatch(&'static str),
  #[error("读取响应文件 {0} 失败: {1}")]
  IoError(PathBuf, std::io::Error),
  #[error("响应文件 {0} 不是合法 JSON: {1}")]
  JsonError(PathBuf, serde_json::Error),
}

/// 每次调用时重新读取响应文件，用于离线复现一次模型调用
///
/// `replay:///path/to/response.json?model=yolov8n`
#[derive(Debug, Clone)]
pub struct ReplayModel {
  path: PathBuf,
  model_id: String,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayError::SchemeMismatch(Self::SCHEME));
    }

    let model_id = url
      .query_pairs()
      .find(|(k, _)| k == "model")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| REPLAY_DEFAULT_MODEL.to_string());

    let path = url_file_path(url);
    info!("回放模型 {} 使用响应文件: {}", model_id, path.display());
    Ok(ReplayModel { path, model_id })
  }
}

impl ReplayModel {
  pub fn new(path: impl Into<PathBuf>, model_id: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      model_id: model_id.into(),
    }
  }

  fn read_text(&self) -> Result<String, ReplayError> {
    let text =
      std::fs::read_to_string(&self.path).map_err(|e| ReplayError::IoError(self.path.clone(), e))?;
    debug!("读取响应文件 {}，共 {} 字节", self.path.display(), text.len());
    Ok(text)
  }

  fn read_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ReplayError> {
    let text = self.read_text()?;
    serde_json::from_str(&text).map_err(|e| ReplayError::JsonError(self.path.clone(), e))
  }
}

impl AdviceModel for ReplayModel {
  type Error = ReplayError;

  fn model_id(&self) -> &str {
    &self.model_id
  }

  fn generate(&self, _image: &ImageUpload) -> Result<String, Self::Error> {
    self.read_text()
  }
}

impl ObjectDetector for ReplayModel {
  type Error = ReplayError;

  fn model_id(&self) -> &str {
    &self.model_id
  }

  fn detect(&self, _image: &ImageUpload) -> Result<DetectResult, Self::Error> {
    self.read_json()
  }
}

impl TextRecognizer for ReplayModel {
  type Error = ReplayError;

  fn model_id(&self) -> &str {
    &self.model_id
  }

  fn recognize(&self, _image: &ImageUpload) -> Result<serde_json::Value, Self::Error> {
    self.read_json()
  }
}
