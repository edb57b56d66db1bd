// 该文件是 Fenlei （分类） 项目的一部分。
// src/detection.rs - 检测与文字识别结果归一化
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
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::DetectResult;

pub type Polygon = [[f64; 2]; 4];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
  Bbox([f64; 4]), // [x1, y1, x2, y2]
  Polygon(Polygon),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  pub label: String,
  pub confidence: f64,
  #[serde(flatten)]
  pub region: Region,
}

impl Detection {
  pub fn with_bbox(label: impl Into<String>, confidence: f64, bbox: [f64; 4]) -> Self {
    Self {
      label: label.into(),
      confidence: clamp_confidence(confidence),
      region: Region::Bbox(bbox),
    }
  }

  pub fn with_polygon(label: impl Into<String>, confidence: f64, polygon: Polygon) -> Self {
    Self {
      label: label.into(),
      confidence: clamp_confidence(confidence),
      region: Region::Polygon(polygon),
    }
  }
}

fn clamp_confidence(confidence: f64) -> f64 {
  if confidence.is_nan() {
    0.0
  } else {
    confidence.clamp(0.0, 1.0)
  }
}

/// 将目标检测输出逐框转换为 [`Detection`]
pub fn normalize_boxes(result: &DetectResult) -> Vec<Detection> {
  let detections: Vec<Detection> = result
    .boxes
    .iter()
    .map(|item| Detection::with_bbox(result.label_of(item.cls), item.conf, item.xyxy))
    .collect();
  debug!("目标检测输出 {} 个框", detections.len());
  detections
}

/// 文字识别结果被识别为哪种格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShape {
  /// `[[ [polygon, [text, score]], ... ], ...]`
  Legacy,
  /// `[{ "rec_polys": [...], "rec_texts": [...], "rec_scores": [...] }, ...]`
  Current,
  /// 两种格式都不匹配
  Drift,
  /// 文字识别调用失败，没有可用输出
  Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextEvidence {
  pub shape: TextShape,
  pub regions: Vec<Detection>,
}

impl TextEvidence {
  pub fn unavailable() -> Self {
    Self {
      shape: TextShape::Unavailable,
      regions: Vec::new(),
    }
  }
}

#[derive(Deserialize)]
struct LegacyLine(Polygon, (String, f64));

// 没有识别到文字的页为 null
type LegacyPages = Vec<Option<Vec<LegacyLine>>>;

#[derive(Deserialize)]
struct CurrentPage {
  rec_polys: Vec<Polygon>,
  rec_texts: Vec<String>,
  rec_scores: Vec<f64>,
}

/// 依次尝试旧版与新版格式，全部失败时返回空证据而不是错误
pub fn normalize_text(raw: &Value) -> TextEvidence {
  match LegacyPages::deserialize(raw) {
    Ok(pages) => {
      let regions: Vec<Detection> = pages
        .into_iter()
        .flatten()
        .flatten()
        .map(|LegacyLine(polygon, (text, score))| Detection::with_polygon(text, score, polygon))
        .collect();
      debug!("文字识别结果为旧版格式，共 {} 个文本区域", regions.len());
      return TextEvidence {
        shape: TextShape::Legacy,
        regions,
      };
    }
    Err(e) => debug!("文字识别结果不是旧版格式: {}", e),
  }

  match Vec::<CurrentPage>::deserialize(raw) {
    Ok(pages) => {
      let mut regions = Vec::new();
      for (page_idx, page) in pages.into_iter().enumerate() {
        let (polys, texts, scores) = (
          page.rec_polys.len(),
          page.rec_texts.len(),
          page.rec_scores.len(),
        );
        if polys != texts || texts != scores {
          warn!(
            "第 {} 页文字识别结果长度不一致: 多边形 {}, 文本 {}, 分数 {}，按最短截断",
            page_idx, polys, texts, scores
          );
        }
        regions.extend(
          page
            .rec_polys
            .into_iter()
            .zip(page.rec_texts)
            .zip(page.rec_scores)
            .map(|((polygon, text), score)| Detection::with_polygon(text, score, polygon)),
        );
      }
      debug!("文字识别结果为新版格式，共 {} 个文本区域", regions.len());
      return TextEvidence {
        shape: TextShape::Current,
        regions,
      };
    }
    Err(e) => debug!("文字识别结果不是新版格式: {}", e),
  }

  warn!("文字识别结果格式无法识别，忽略文字证据");
  TextEvidence {
    shape: TextShape::Drift,
    regions: Vec::new(),
  }
}

pub fn text_regions(raw: &Value) -> Vec<Detection> {
  normalize_text(raw).regions
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;
  use serde_json::json;

  fn quad(x: f64, y: f64) -> Polygon {
    [[x, y], [x + 10.0, y], [x + 10.0, y + 5.0], [x, y + 5.0]]
  }

  #[test]
  fn boxes_use_the_name_table() {
    let result = DetectResult {
      names: [(39, "bottle".to_string()), (41, "cup".to_string())].into(),
      boxes: vec![
        DetectItem {
          cls: 39.0,
          conf: 0.91,
          xyxy: [1.0, 2.0, 30.0, 80.0],
        },
        DetectItem {
          cls: 41.0,
          conf: 1.3,
          xyxy: [0.0, 0.0, 5.0, 5.0],
        },
        DetectItem {
          cls: 7.0,
          conf: f64::NAN,
          xyxy: [0.0, 0.0, 1.0, 1.0],
        },
      ],
    };
    let detections = normalize_boxes(&result);

    assert_eq!(
      detections[0],
      Detection::with_bbox("bottle", 0.91, [1.0, 2.0, 30.0, 80.0])
    );
    assert_eq!(detections[1].label, "cup");
    assert_eq!(detections[1].confidence, 1.0);
    assert_eq!(detections[2].label, "class_7");
    assert_eq!(detections[2].confidence, 0.0);
  }

  #[test]
  fn legacy_and_current_shapes_agree() {
    let legacy = json!([[
      [[[0, 0], [10, 0], [10, 5], [0, 5]], ["PET", 0.98]],
      [[[20, 0], [30, 0], [30, 5], [20, 5]], ["1", 0.87]],
      [[[40, 10], [50, 10], [50, 15], [40, 15]], ["재활용", 0.75]]
    ]]);
    let current = json!([{
      "dt_polys": [],
      "rec_polys": [
        [[0, 0], [10, 0], [10, 5], [0, 5]],
        [[20, 0], [30, 0], [30, 5], [20, 5]],
        [[40, 10], [50, 10], [50, 15], [40, 15]]
      ],
      "rec_texts": ["PET", "1", "재활용"],
      "rec_scores": [0.98, 0.87, 0.75]
    }]);

    let legacy = normalize_text(&legacy);
    let current = normalize_text(&current);

    assert_eq!(legacy.shape, TextShape::Legacy);
    assert_eq!(current.shape, TextShape::Current);
    assert_eq!(legacy.regions, current.regions);
    assert_eq!(
      legacy.regions,
      vec![
        Detection::with_polygon("PET", 0.98, quad(0.0, 0.0)),
        Detection::with_polygon("1", 0.87, quad(20.0, 0.0)),
        Detection::with_polygon("재활용", 0.75, quad(40.0, 10.0)),
      ]
    );
  }

  #[test]
  fn empty_results_yield_no_regions() {
    let cases = [
      (json!([null]), TextShape::Legacy),
      (json!([[]]), TextShape::Legacy),
      (json!([]), TextShape::Legacy),
      (
        json!([{"rec_polys": [], "rec_texts": [], "rec_scores": []}]),
        TextShape::Current,
      ),
    ];
    for (raw, shape) in cases {
      let evidence = normalize_text(&raw);
      assert_eq!(evidence.shape, shape, "input: {}", raw);
      assert!(evidence.regions.is_empty());
    }
  }

  #[test]
  fn unknown_shapes_degrade_to_empty() {
    for raw in [
      json!(null),
      json!("PET"),
      json!({"rec_texts": ["PET"]}),
      json!([{"texts": ["PET"], "scores": [0.9]}]),
      json!([[["not a polygon", ["PET", 0.9]]]]),
    ] {
      let evidence = normalize_text(&raw);
      assert_eq!(evidence.shape, TextShape::Drift, "input: {}", raw);
      assert!(evidence.regions.is_empty());
    }
  }

  #[test]
  fn mismatched_arrays_are_truncated() {
    let raw = json!([{
      "rec_polys": [[[0, 0], [10, 0], [10, 5], [0, 5]], [[20, 0], [30, 0], [30, 5], [20, 5]]],
      "rec_texts": ["PET", "HDPE"],
      "rec_scores": [0.5]
    }]);
    let regions = text_regions(&raw);

    assert_eq!(regions, vec![Detection::with_polygon("PET", 0.5, quad(0.0, 0.0))]);
  }

  #[test]
  fn detections_serialize_with_their_region_kind() {
    let bbox = serde_json::to_value(Detection::with_bbox("cap", 0.5, [1.0, 1.0, 2.0, 2.0])).unwrap();
    assert_eq!(
      bbox,
      json!({"label": "cap", "confidence": 0.5, "bbox": [1.0, 1.0, 2.0, 2.0]})
    );

    let text = serde_json::to_value(Detection::with_polygon("PET", 0.25, quad(0.0, 0.0))).unwrap();
    assert_eq!(text["polygon"][2], json!([10.0, 5.0]));
  }
}
