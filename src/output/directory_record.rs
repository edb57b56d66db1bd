// 该文件是 Fenlei （分类） 项目的一部分。
// src/output/directory_record.rs - 上传图像目录记录
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

use chrono::{Datelike, Utc};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  input::ImageUpload,
  output::ArtifactStore,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordStoreError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("连续 {0} 个文件名均已被占用")]
  Exhausted(usize),
}

// 序号在多个实例间不共享，文件已存在时换下一个序号
const PERSIST_ATTEMPTS: usize = 64;

/// 按 `年/月/日/时-分-秒-序号.扩展名` 保存上传图像，不覆盖已有文件
#[derive(Debug, Clone)]
pub struct DirectoryRecordStore {
  directory: PathBuf,
  frame_counters: Arc<Mutex<u16>>,
}

impl FromUrlWithScheme for DirectoryRecordStore {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordStore {
  type Error = DirectoryRecordStoreError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordStoreError::SchemeMismatch);
    }

    Ok(DirectoryRecordStore::new(url_file_path(uri)))
  }
}

impl DirectoryRecordStore {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      frame_counters: Arc::new(Mutex::new(0)),
    }
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self, extension: &str) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.{}",
      now.format("%H-%M-%S"),
      self.frame_id(),
      extension
    )))
  }
}

impl ArtifactStore for DirectoryRecordStore {
  type Error = DirectoryRecordStoreError;

  fn persist(&self, image: &ImageUpload) -> Result<Option<PathBuf>, Self::Error> {
    for _ in 0..PERSIST_ATTEMPTS {
      let path = self.frame_path(image.extension())?;
      let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
          warn!("文件已存在，跳过: {}", path.display());
          continue;
        }
        Err(e) => return Err(e.into()),
      };
      file.write_all(&image.bytes)?;
      info!("保存上传图像到文件: {}", path.display());
      return Ok(Some(path));
    }

    Err(DirectoryRecordStoreError::Exhausted(PERSIST_ATTEMPTS))
  }
}
