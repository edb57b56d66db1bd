// 该文件是 Fenlei （分类） 项目的一部分。
// src/task.rs - 单次请求的处理流程
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

use std::time::Instant;

use tracing::{error, info, warn};

use crate::{
  advice::salvage,
  detection::{TextEvidence, normalize_boxes, normalize_text},
  envelope::{PipelineError, Provenance, ResultEnvelope},
  fusion::fuse,
  input::ImageUpload,
  model::{AdviceModel, ObjectDetector, TextRecognizer},
  output::{ArtifactStore, Discard},
};

/// 处理一次请求，总是返回一个结果封装
pub trait Task {
  fn run_task(&self, image: &ImageUpload) -> ResultEnvelope;
}

fn settle(result: Result<ResultEnvelope, PipelineError>) -> ResultEnvelope {
  result.unwrap_or_else(|err| {
    error!("{}", err);
    ResultEnvelope::from(err)
  })
}

/// 生成式模型流程：保存图像 -> 调用模型 -> 抢救解析
pub struct AdviceTask<M, S = Discard> {
  model: M,
  store: S,
}

impl<M: AdviceModel> AdviceTask<M> {
  pub fn new(model: M) -> Self {
    Self {
      model,
      store: Discard,
    }
  }
}

impl<M, S> AdviceTask<M, S> {
  pub fn with_store<T: ArtifactStore>(self, store: T) -> AdviceTask<M, T> {
    AdviceTask {
      model: self.model,
      store,
    }
  }
}

impl<M: AdviceModel, S: ArtifactStore> AdviceTask<M, S> {
  fn try_run(&self, image: &ImageUpload) -> Result<ResultEnvelope, PipelineError> {
    let temp_path = self.store.persist(image).map_err(PipelineError::artifact)?;

    let model = self.model.model_id();
    info!("调用生成式模型 {}...", model);
    let now = Instant::now();
    let raw = self
      .model
      .generate(image)
      .map_err(|e| PipelineError::upstream(model, e))?;
    info!("模型响应完成，耗时: {:.2?}", now.elapsed());

    let salvaged = salvage(&raw);
    info!(
      "解析阶段: {:?}，共 {} 条建议",
      salvaged.stage,
      salvaged.entries.len()
    );

    Ok(ResultEnvelope::advice(
      salvaged.entries,
      Provenance::new(model, temp_path.as_deref()),
    ))
  }
}

impl<M: AdviceModel, S: ArtifactStore> Task for AdviceTask<M, S> {
  fn run_task(&self, image: &ImageUpload) -> ResultEnvelope {
    settle(self.try_run(image))
  }
}

/// 本地模型流程：保存图像 -> 目标检测 -> 文字识别 -> 归一化 -> 融合
pub struct FusionTask<D, R, S = Discard> {
  detector: D,
  recognizer: R,
  store: S,
}

impl<D: ObjectDetector, R: TextRecognizer> FusionTask<D, R> {
  pub fn new(detector: D, recognizer: R) -> Self {
    Self {
      detector,
      recognizer,
      store: Discard,
    }
  }
}

impl<D, R, S> FusionTask<D, R, S> {
  pub fn with_store<T: ArtifactStore>(self, store: T) -> FusionTask<D, R, T> {
    FusionTask {
      detector: self.detector,
      recognizer: self.recognizer,
      store,
    }
  }
}

impl<D: ObjectDetector, R: TextRecognizer, S: ArtifactStore> FusionTask<D, R, S> {
  pub fn model_id(&self) -> String {
    format!(
      "{}+{}",
      self.detector.model_id(),
      self.recognizer.model_id()
    )
  }

  fn try_run(&self, image: &ImageUpload) -> Result<ResultEnvelope, PipelineError> {
    let temp_path = self.store.persist(image).map_err(PipelineError::artifact)?;

    info!("开始目标检测...");
    let now = Instant::now();
    let boxes = self
      .detector
      .detect(image)
      .map_err(|e| PipelineError::upstream(self.detector.model_id(), e))?;
    info!("目标检测完成，耗时: {:.2?}", now.elapsed());

    info!("开始文字识别...");
    let now = Instant::now();
    // 文字识别只提供证据，失败时不影响检测结果
    let evidence = match self.recognizer.recognize(image) {
      Ok(text) => normalize_text(&text),
      Err(e) => {
        warn!("文字识别模型 {} 调用失败，忽略文字证据: {}", self.recognizer.model_id(), e);
        TextEvidence::unavailable()
      }
    };
    info!("文字识别完成，耗时: {:.2?}", now.elapsed());

    let result = fuse(normalize_boxes(&boxes), evidence.regions);
    info!(
      "最终标签: {}，文字格式: {:?}",
      result.final_label(),
      evidence.shape
    );

    Ok(ResultEnvelope::fusion(
      result,
      Provenance::new(self.model_id(), temp_path.as_deref()),
    ))
  }
}

impl<D: ObjectDetector, R: TextRecognizer, S: ArtifactStore> Task for FusionTask<D, R, S> {
  fn run_task(&self, image: &ImageUpload) -> ResultEnvelope {
    settle(self.try_run(image))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{DetectItem, DetectResult};
  use serde_json::{Value, json};

  #[derive(Debug, thiserror::Error)]
  #[error("quota exceeded")]
  struct QuotaExceeded;

  struct Canned(&'static str);

  impl AdviceModel for Canned {
    type Error = QuotaExceeded;

    fn model_id(&self) -> &str {
      "gemini-2.0-flash"
    }

    fn generate(&self, _image: &ImageUpload) -> Result<String, Self::Error> {
      Ok(self.0.to_string())
    }
  }

  struct Exhausted;

  impl AdviceModel for Exhausted {
    type Error = QuotaExceeded;

    fn model_id(&self) -> &str {
      "gemini-2.0-flash"
    }

    fn generate(&self, _image: &ImageUpload) -> Result<String, Self::Error> {
      Err(QuotaExceeded)
    }
  }

  struct Boxes(DetectResult);

  impl ObjectDetector for Boxes {
    type Error = QuotaExceeded;

    fn model_id(&self) -> &str {
      "yolov8n"
    }

    fn detect(&self, _image: &ImageUpload) -> Result<DetectResult, Self::Error> {
      Ok(self.0.clone())
    }
  }

  struct Ocr(Value);

  impl TextRecognizer for Ocr {
    type Error = QuotaExceeded;

    fn model_id(&self) -> &str {
      "paddleocr"
    }

    fn recognize(&self, _image: &ImageUpload) -> Result<Value, Self::Error> {
      Ok(self.0.clone())
    }
  }

  #[test]
  fn advice_task_salvages_broken_output() {
    let task = AdviceTask::new(Canned(
      r#"{"object": "캔", "label": "metal", "instruction": "x"}{"object": "뚜껑", "label": "plastic", "instruction": "y"}"#,
    ));
    let envelope = task.run_task(&ImageUpload::default());
    let json = serde_json::to_value(&envelope).unwrap();

    assert!(!envelope.is_error());
    assert_eq!(json["gemini_advice"][1]["object"], "뚜껑");
    assert_eq!(json["model"], "gemini-2.0-flash");
  }

  #[test]
  fn advice_task_reports_upstream_failure() {
    let envelope = AdviceTask::new(Exhausted).run_task(&ImageUpload::default());

    assert_eq!(
      envelope,
      ResultEnvelope::Failure {
        error: "模型调用失败".to_string(),
        detail: "模型 gemini-2.0-flash 调用失败: quota exceeded".to_string(),
      }
    );
  }

  #[test]
  fn fusion_task_combines_both_models() {
    let detections = DetectResult {
      names: [(0, "bottle".to_string()), (1, "cap".to_string())].into(),
      boxes: vec![
        DetectItem {
          cls: 1.0,
          conf: 0.8,
          xyxy: [1.0, 1.0, 2.0, 2.0],
        },
        DetectItem {
          cls: 0.0,
          conf: 0.95,
          xyxy: [0.0, 0.0, 10.0, 10.0],
        },
      ],
    };
    let task = FusionTask::new(Boxes(detections), Ocr(json!({"unexpected": true})));
    let envelope = task.run_task(&ImageUpload::default());
    let json = serde_json::to_value(&envelope).unwrap();

    assert_eq!(json["final_label"], "bottle");
    assert_eq!(json["model"], "yolov8n+paddleocr");
    assert_eq!(json["text_regions"], json!([]));
    assert_eq!(json["detections"].as_array().map(Vec::len), Some(2));
  }

  struct OcrDown;

  impl TextRecognizer for OcrDown {
    type Error = QuotaExceeded;

    fn model_id(&self) -> &str {
      "paddleocr"
    }

    fn recognize(&self, _image: &ImageUpload) -> Result<Value, Self::Error> {
      Err(QuotaExceeded)
    }
  }

  #[test]
  fn recognizer_failure_keeps_the_detections() {
    let detections = DetectResult {
      names: [(0, "can".to_string())].into(),
      boxes: vec![DetectItem {
        cls: 0.0,
        conf: 0.7,
        xyxy: [0.0, 0.0, 3.0, 3.0],
      }],
    };
    let envelope = FusionTask::new(Boxes(detections), OcrDown).run_task(&ImageUpload::default());
    let json = serde_json::to_value(&envelope).unwrap();

    assert!(!envelope.is_error());
    assert_eq!(json["final_label"], "can");
    assert_eq!(json["text_regions"], json!([]));
    assert_eq!(json["model"], "yolov8n+paddleocr");
  }

  #[test]
  fn fusion_task_without_boxes_is_unknown() {
    let task = FusionTask::new(Boxes(DetectResult::default()), Ocr(json!([null])));
    let json = serde_json::to_value(task.run_task(&ImageUpload::default())).unwrap();

    assert_eq!(json["final_label"], "unknown");
    assert!(json.get("error").is_none());
  }
}
