// 该文件是 Fenlei （分类） 项目的一部分。
// src/bin/salvage_advice.rs - 生成式模型响应解析
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
  task::{AdviceTask, Task},
};
use tracing::info;

/// Fenlei 生成式流程参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型响应来源，例如 replay:///path/response.txt?model=gemini-2.0-flash
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 上传图像，例如 image:///path/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 图像保存目录，例如 folder:///tmp/temp_images
  #[arg(long, value_name = "RECORD")]
  pub record: Option<Url>,
  /// 结果输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型响应来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let image = ImageFileInput::from_url(&args.input)?.into_image();
  let model = ReplayModel::from_url(&args.model)?;
  let store = match &args.record {
    Some(url) => ArtifactWrapper::from_url(url)?,
    None => ArtifactWrapper::Discard(Discard),
  };
  let output = OutputWrapper::from_url(&args.output)?;

  let envelope = AdviceTask::new(model).with_store(store).run_task(&image);
  output.render_result(&envelope)?;

  Ok(())
}
