// 该文件是 Fenlei （分类） 项目的一部分。
// src/input.rs - 上传图像输入
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_file_path};

const DEFAULT_MIME_TYPE: &str = "image/jpeg";
const DEFAULT_EXTENSION: &str = "jpeg";

/// 一次请求中用户上传的图像
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpload {
  pub filename: Option<String>,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

impl ImageUpload {
  pub fn new(bytes: Vec<u8>) -> Self {
    Self {
      bytes,
      ..Default::default()
    }
  }

  pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
    self.filename = Some(filename.into());
    self
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = Some(content_type.into());
    self
  }

  pub fn mime_type(&self) -> &str {
    self.content_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
  }

  /// 取文件名最后一个 `.` 之后的部分，没有时为 `jpeg`
  pub fn extension(&self) -> &str {
    self
      .filename
      .as_deref()
      .and_then(|name| name.rsplit_once('.'))
      .map(|(_, ext)| ext)
      .filter(|ext| !ext.is_empty())
      .unwrap_or(DEFAULT_EXTENSION)
  }
}

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

pub struct ImageFileInput {
  image: ImageUpload,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch);
    }

    let path = url_file_path(url);
    let bytes = std::fs::read(&path)?;
    debug!("读取图像文件 {}，共 {} 字节", path.display(), bytes.len());

    let mut image = ImageUpload::new(bytes);
    if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
      image = image.with_filename(name);
    }
    if let Some(mime) = guess_mime_type(image.extension()) {
      image = image.with_content_type(mime);
    }

    Ok(ImageFileInput { image })
  }
}

impl ImageFileInput {
  pub fn into_image(self) -> ImageUpload {
    self.image
  }
}

fn guess_mime_type(extension: &str) -> Option<&'static str> {
  match extension.to_ascii_lowercase().as_str() {
    "jpg" | "jpeg" => Some("image/jpeg"),
    "png" => Some("image/png"),
    "webp" => Some("image/webp"),
    "gif" => Some("image/gif"),
    "bmp" => Some("image/bmp"),
    "heic" => Some("image/heic"),
    _ => None,
  }
}
