// 该文件是 Fenlei （分类） 项目的一部分。
// src/bin/fuse_detections.rs - 本地模型结果融合
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use fenlei::{
  FromUrl,
  input::ImageFileInput,
  model::ReplayModel,
  output::{ArtifactWrapper, Discard, OutputWrapper, Render},
  task::{FusionTask, Task},
};
use tracing::info;

/// Fenlei 本地模型流程参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 目标检测输出，例如 replay:///path/det.json?model=yolov8n
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,
  /// 文字识别输出，例如 replay:///path/ocr.json?model=paddleocr
  #[arg(long, value_name = "RECOGNIZER")]
  pub recognizer: Url,
  /// 上传图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 图像保存目录
  #[arg(long, value_name = "RECORD")]
  pub record: Option<Url>,
  /// 结果输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("目标检测来源: {}", args.detector);
  info!("文字识别来源: {}", args.recognizer);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let image = ImageFileInput::from_url(&args.input)?.into_image();
  let detector = ReplayModel::from_url(&args.detector)?;
  let recognizer = ReplayModel::from_url(&args.recognizer)?;
  let store = match &args.record {
    Some(url) => ArtifactWrapper::from_url(url)?,
    None => ArtifactWrapper::Discard(Discard),
  };
  let output = OutputWrapper::from_url(&args.output)?;

  let task = FusionTask::new(detector, recognizer).with_store(store);
  info!("使用模型: {}", task.model_id());
  let envelope = task.run_task(&image);
  output.render_result(&envelope)?;

  Ok(())
}
