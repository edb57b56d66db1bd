// 该文件是 Fenlei （分类） 项目的一部分。
// src/envelope.rs - 对外返回的结果封装
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

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::{advice::AdviceEntry, fusion::FusionResult};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("模型 {model} 调用失败: {detail}")]
  UpstreamCall { model: String, detail: String },
  #[error("图像保存失败: {0}")]
  ArtifactWrite(String),
}

impl PipelineError {
  pub fn upstream(model: &str, err: impl std::error::Error) -> Self {
    PipelineError::UpstreamCall {
      model: model.to_string(),
      detail: err.to_string(),
    }
  }

  pub fn artifact(err: impl std::error::Error) -> Self {
    PipelineError::ArtifactWrite(err.to_string())
  }

  /// 面向用户的错误类别
  pub fn category(&self) -> &'static str {
    match self {
      PipelineError::UpstreamCall { .. } => "模型调用失败",
      PipelineError::ArtifactWrite(_) => "图像保存失败",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
  pub model: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temp_path: Option<String>,
}

impl Provenance {
  pub fn new(model: impl Into<String>, temp_path: Option<&Path>) -> Self {
    Self {
      model: model.into(),
      temp_path: temp_path.map(|p| p.display().to_string()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
  Advice {
    // 下游后端按此字段名读取
    #[serde(rename = "gemini_advice")]
    advice: Vec<AdviceEntry>,
  },
  Fusion(FusionResult),
}

/// 失败时只有 `error` 与 `detail` 两个字段，成功时一定没有 `error`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
  Failure {
    error: String,
    detail: String,
  },
  Success {
    #[serde(flatten)]
    payload: Payload,
    #[serde(flatten)]
    provenance: Provenance,
  },
}

impl ResultEnvelope {
  pub fn advice(advice: Vec<AdviceEntry>, provenance: Provenance) -> Self {
    ResultEnvelope::Success {
      payload: Payload::Advice { advice },
      provenance,
    }
  }

  pub fn fusion(result: FusionResult, provenance: Provenance) -> Self {
    ResultEnvelope::Success {
      payload: Payload::Fusion(result),
      provenance,
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, ResultEnvelope::Failure { .. })
  }
}

impl From<PipelineError> for ResultEnvelope {
  fn from(err: PipelineError) -> Self {
    ResultEnvelope::Failure {
      error: err.category().to_string(),
      detail: err.to_string(),
    }
  }
}
