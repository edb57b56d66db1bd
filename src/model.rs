// 该文件是 Fenlei （分类） 项目的一部分。
// src/model.rs - 外部模型接口
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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fusion::UNKNOWN_LABEL;
use crate::input::ImageUpload;

/// 生成式视觉语言模型，返回未经校验的文本
pub trait AdviceModel {
  type Error: std::error::Error;

  fn model_id(&self) -> &str;
  fn generate(&self, image: &ImageUpload) -> Result<String, Self::Error>;
}

/// 本地目标检测模型
pub trait ObjectDetector {
  type Error: std::error::Error;

  fn model_id(&self) -> &str;
  fn detect(&self, image: &ImageUpload) -> Result<DetectResult, Self::Error>;
}

/// 文字识别模型，输出结构随版本变化，因此保持为原始 JSON
pub trait TextRecognizer {
  type Error: std::error::Error;

  fn model_id(&self) -> &str;
  fn recognize(&self, image: &ImageUpload) -> Result<serde_json::Value, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectItem {
  pub cls: f64,
  pub conf: f64,
  pub xyxy: [f64; 4], // [x_min, y_min, x_max, y_max]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResult {
  #[serde(default)]
  pub names: BTreeMap<u32, String>,
  #[serde(default)]
  pub boxes: Vec<DetectItem>,
}

impl DetectResult {
  /// 查表得到类别名称，查不到或名称与 [`UNKNOWN_LABEL`] 冲突时返回 `class_<索引>`
  pub fn label_of(&self, cls: f64) -> String {
    let id = cls.round();
    let name = (0.0..=u32::MAX as f64)
      .contains(&id)
      .then(|| self.names.get(&(id as u32)))
      .flatten()
      .filter(|name| name.as_str() != UNKNOWN_LABEL);
    match name {
      Some(name) => name.clone(),
      None => format!("class_{}", cls),
    }
  }
}

mod replay;
pub use self::replay::{ReplayError, ReplayModel};
