// 该文件是 Fenlei （分类） 项目的一部分。
// src/output.rs - 输出定义
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

use crate::envelope::ResultEnvelope;
use crate::input::ImageUpload;
use crate::{FromUrl, FromUrlWithScheme};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

/// 保存用户上传的原始图像，返回保存位置
pub trait ArtifactStore {
  type Error: std::error::Error;
  fn persist(&self, image: &ImageUpload) -> Result<Option<PathBuf>, Self::Error>;
}

/// 不保存图像
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl ArtifactStore for Discard {
  type Error = std::convert::Infallible;

  fn persist(&self, _image: &ImageUpload) -> Result<Option<PathBuf>, Self::Error> {
    Ok(None)
  }
}

mod json_output;
pub use self::json_output::{JsonFileOutput, JsonOutputError, StdoutOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordStore, DirectoryRecordStoreError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("JSON 输出错误: {0}")]
  JsonOutputError(#[from] JsonOutputError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录错误: {0}")]
  DirectoryRecordStoreError(#[from] DirectoryRecordStoreError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Stdout(StdoutOutput),
  JsonFile(JsonFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      StdoutOutput::SCHEME => Ok(OutputWrapper::Stdout(StdoutOutput::from_url(url)?)),
      JsonFileOutput::SCHEME => Ok(OutputWrapper::JsonFile(JsonFileOutput::from_url(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<ResultEnvelope> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, result: &ResultEnvelope) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Stdout(output) => output.render_result(result).map_err(OutputError::from),
      OutputWrapper::JsonFile(output) => output.render_result(result).map_err(OutputError::from),
    }
  }
}

pub enum ArtifactWrapper {
  #[cfg(feature = "directory_record")]
  DirectoryRecord(DirectoryRecordStore),
  Discard(Discard),
}

impl FromUrl for ArtifactWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "directory_record")]
      DirectoryRecordStore::SCHEME => Ok(ArtifactWrapper::DirectoryRecord(
        DirectoryRecordStore::from_url(url)?,
      )),
      "discard" => Ok(ArtifactWrapper::Discard(Discard)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl ArtifactStore for ArtifactWrapper {
  type Error = OutputError;

  fn persist(&self, image: &ImageUpload) -> Result<Option<PathBuf>, Self::Error> {
    match self {
      #[cfg(feature = "directory_record")]
      ArtifactWrapper::DirectoryRecord(store) => store.persist(image).map_err(OutputError::from),
      ArtifactWrapper::Discard(store) => match store.persist(image) {
        Ok(path) => Ok(path),
        Err(never) => match never {},
      },
    }
  }
}
