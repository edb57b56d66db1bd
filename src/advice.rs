// 该文件是 Fenlei （分类） 项目的一部分。
// src/advice.rs - 生成式模型响应的抢救解析
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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// 分类标签，未知取值原样保留
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MaterialLabel {
  Plastic,
  Paper,
  Metal,
  Glass,
  Vinyl,
  Styrofoam,
  FoodWaste,
  GeneralWaste,
  Other(String),
}

impl MaterialLabel {
  pub fn as_str(&self) -> &str {
    match self {
      MaterialLabel::Plastic => "plastic",
      MaterialLabel::Paper => "paper",
      MaterialLabel::Metal => "metal",
      MaterialLabel::Glass => "glass",
      MaterialLabel::Vinyl => "vinyl",
      MaterialLabel::Styrofoam => "styrofoam",
      MaterialLabel::FoodWaste => "food_waste",
      MaterialLabel::GeneralWaste => "general_waste",
      MaterialLabel::Other(label) => label,
    }
  }

  pub fn is_known(&self) -> bool {
    !matches!(self, MaterialLabel::Other(_))
  }
}

impl From<String> for MaterialLabel {
  fn from(label: String) -> Self {
    match label.as_str() {
      "plastic" => MaterialLabel::Plastic,
      "paper" => MaterialLabel::Paper,
      "metal" => MaterialLabel::Metal,
      "glass" => MaterialLabel::Glass,
      "vinyl" => MaterialLabel::Vinyl,
      "styrofoam" => MaterialLabel::Styrofoam,
      "food_waste" => MaterialLabel::FoodWaste,
      "general_waste" => MaterialLabel::GeneralWaste,
      _ => MaterialLabel::Other(label),
    }
  }
}

impl From<MaterialLabel> for String {
  fn from(label: MaterialLabel) -> Self {
    match label {
      MaterialLabel::Other(label) => label,
      known => known.as_str().to_string(),
    }
  }
}

impl std::fmt::Display for MaterialLabel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 一条分类投放建议
///
/// 序列化字段名与下游后端的 DTO 保持一致（`object` / `label` / `instruction`）。
/// 读取时接受 `object_name` / `item_name` 与 `material_label` / `category` 等别名，
/// 写出时统一为 `object` / `label`；无法识别的字段保存在 `extra` 中原样写回。
///
/// 没有 `instruction` 时，依次使用 `disposal_steps` 拼接结果与 `short_summary`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AdviceRecordRepr")]
pub struct AdviceRecord {
  #[serde(rename = "object")]
  pub object_name: String,
  #[serde(rename = "label")]
  pub material_label: MaterialLabel,
  pub instruction: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub disposal_steps: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub short_summary: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl AdviceRecord {
  pub fn new(
    object_name: impl Into<String>,
    material_label: impl Into<MaterialLabel>,
    instruction: impl Into<String>,
  ) -> Self {
    Self {
      object_name: object_name.into(),
      material_label: material_label.into(),
      instruction: instruction.into(),
      disposal_steps: Vec::new(),
      warnings: Vec::new(),
      short_summary: None,
      extra: Map::new(),
    }
  }
}

#[derive(Error, Debug)]
pub enum AdviceRecordError {
  #[error("建议缺少 instruction、disposal_steps 与 short_summary")]
  MissingInstruction,
}

#[derive(Deserialize)]
struct AdviceRecordRepr {
  #[serde(alias = "object_name", alias = "item_name")]
  object: String,
  #[serde(alias = "material_label", alias = "category")]
  label: MaterialLabel,
  #[serde(default)]
  instruction: Option<String>,
  #[serde(default)]
  disposal_steps: Vec<String>,
  #[serde(default)]
  warnings: Vec<String>,
  #[serde(default)]
  short_summary: Option<String>,
  #[serde(flatten)]
  extra: Map<String, Value>,
}

impl TryFrom<AdviceRecordRepr> for AdviceRecord {
  type Error = AdviceRecordError;

  fn try_from(repr: AdviceRecordRepr) -> Result<Self, Self::Error> {
    let instruction = match (&repr.instruction, &repr.short_summary) {
      (Some(instruction), _) => instruction.clone(),
      _ if !repr.disposal_steps.is_empty() => repr.disposal_steps.join(" "),
      (None, Some(summary)) => summary.clone(),
      (None, None) => return Err(AdviceRecordError::MissingInstruction),
    };
    Ok(Self {
      object_name: repr.object,
      material_label: repr.label,
      instruction,
      disposal_steps: repr.disposal_steps,
      warnings: repr.warnings,
      short_summary: repr.short_summary,
      extra: repr.extra,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdviceEntry {
  Record(AdviceRecord),
  /// 无法解析时保留的原始响应
  Raw { raw_response: String },
}

impl AdviceEntry {
  pub fn as_record(&self) -> Option<&AdviceRecord> {
    match self {
      AdviceEntry::Record(record) => Some(record),
      AdviceEntry::Raw { .. } => None,
    }
  }
}

/// 解析最终停留的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalvageStage {
  Strict,
  Repaired,
  Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Salvaged {
  pub stage: SalvageStage,
  pub entries: Vec<AdviceEntry>,
}

impl Salvaged {
  fn records(stage: SalvageStage, records: Vec<AdviceRecord>) -> Self {
    Self {
      stage,
      entries: records.into_iter().map(AdviceEntry::Record).collect(),
    }
  }

  fn raw(raw: &str) -> Self {
    Self {
      stage: SalvageStage::Raw,
      entries: vec![AdviceEntry::Raw {
        raw_response: raw.to_string(),
      }],
    }
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
  Many(Vec<AdviceRecord>),
  One(AdviceRecord),
}

fn parse_records(text: &str) -> Result<Vec<AdviceRecord>, serde_json::Error> {
  let records = match serde_json::from_str::<OneOrMany>(text)? {
    OneOrMany::Many(records) => records,
    OneOrMany::One(record) => vec![record],
  };
  Ok(records)
}

/// 按 严格解析 -> 文本修复 -> 原文保留 的顺序解析模型响应，永不失败
pub fn salvage(raw: &str) -> Salvaged {
  match parse_records(raw) {
    Ok(records) => {
      debug!("严格解析成功，共 {} 条建议", records.len());
      return Salvaged::records(SalvageStage::Strict, records);
    }
    Err(e) => debug!("严格解析失败: {}", e),
  }

  let Some(repaired) = repair(raw) else {
    warn!("模型响应为空，保留原始响应");
    return Salvaged::raw(raw);
  };

  match parse_records(&repaired) {
    Ok(records) => {
      warn!("模型响应经修复后解析成功，共 {} 条建议", records.len());
      Salvaged::records(SalvageStage::Repaired, records)
    }
    Err(e) => {
      warn!("模型响应修复后仍无法解析，保留原始响应: {}", e);
      Salvaged::raw(raw)
    }
  }
}

/// 对模型响应做确定性的文本修复，没有可解析内容时返回 `None`
pub fn repair(raw: &str) -> Option<String> {
  let text: String = strip_code_fence(raw)
    .chars()
    .filter(|c| !matches!(c, '\n' | '\r'))
    .collect();
  let text = text.replace("}{", "},{");
  let text = text.trim();

  if text.starts_with('[') && text.ends_with(']') {
    return Some(text.to_string());
  }
  if text.is_empty() {
    return None;
  }
  Some(format!("[{}]", text))
}

// ```json ... ``` 包裹
fn strip_code_fence(raw: &str) -> &str {
  let trimmed = raw.trim();
  let Some(body) = trimmed
    .strip_prefix("```")
    .and_then(|rest| rest.strip_suffix("```"))
  else {
    return raw;
  };

  match body.split_once('\n') {
    Some((tag, rest)) if tag.chars().all(|c| c.is_ascii_alphanumeric()) => rest,
    _ => body,
  }
}
