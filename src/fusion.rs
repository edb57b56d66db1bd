// 该文件是 Fenlei （分类） 项目的一部分。
// src/fusion.rs - 标签融合
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

use serde::Serialize;
use tracing::{debug, warn};

use crate::detection::Detection;

pub const UNKNOWN_LABEL: &str = "unknown";

/// `final_label` 为 [`UNKNOWN_LABEL`] 当且仅当 `detections` 为空
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
  final_label: String,
  detections: Vec<Detection>,
  text_regions: Vec<Detection>,
}

impl FusionResult {
  pub fn final_label(&self) -> &str {
    &self.final_label
  }

  pub fn detections(&self) -> &[Detection] {
    &self.detections
  }

  pub fn text_regions(&self) -> &[Detection] {
    &self.text_regions
  }

  pub fn is_unknown(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 选出置信度最高的检测，相同置信度时取最先出现的
pub fn select_winner(detections: &[Detection]) -> Option<&Detection> {
  let mut winner: Option<&Detection> = None;
  for det in detections {
    // 严格大于才替换，保证并列时稳定
    let better = match winner {
      None => true,
      Some(best) => {
        !det.confidence.is_nan()
          && (best.confidence.is_nan() || det.confidence > best.confidence)
      }
    };
    if better {
      winner = Some(det);
    }
  }
  winner
}

/// 由目标检测结果决定最终标签
///
/// 文字区域只作为证据原样返回，当前不参与标签选择；
/// 后续若要结合文字识别结果，应在此处扩展选择策略。
pub fn fuse(detections: Vec<Detection>, text_regions: Vec<Detection>) -> FusionResult {
  let final_label = match select_winner(&detections) {
    // 保留 unknown 只表示没有检测结果
    Some(det) if det.label == UNKNOWN_LABEL => {
      warn!("检测标签与 {} 冲突，改写为 class_{}", UNKNOWN_LABEL, det.label);
      format!("class_{}", det.label)
    }
    Some(det) => det.label.clone(),
    None => UNKNOWN_LABEL.to_string(),
  };

  debug!(
    "融合 {} 个检测与 {} 个文本区域，最终标签: {}",
    detections.len(),
    text_regions.len(),
    final_label
  );

  FusionResult {
    final_label,
    detections,
    text_regions,
  }
}
