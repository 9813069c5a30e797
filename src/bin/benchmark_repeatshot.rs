// 该文件是 Qianli （千里眼） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理基准测试
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use qianli::engine::InferenceContextBuilder;
use qianli::labels::ClassLabels;
use qianli::pipeline::DetectPipeline;
use qianli::postprocess::OutputLayout;
use qianli::visualizer::Visualizer;

/// 在同一上下文上重复推理同一张图像，验证上下文可反复使用并统计耗时
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径
  #[arg(long, value_name = "FILE")]
  pub model: PathBuf,

  /// 自定义算子扩展库路径，可重复指定
  #[arg(long = "extension", value_name = "LIB")]
  pub extensions: Vec<PathBuf>,

  /// 类别标签文件路径
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,

  /// 标注字体文件路径
  #[arg(long, value_name = "FONT")]
  pub font: PathBuf,

  /// 输入图像路径
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,

  /// 模型输出为定宽检测记录数组（默认为已合成图像）
  #[arg(long)]
  pub raw_boxes: bool,

  /// 重复次数
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub count: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let labels = ClassLabels::from_path(&args.labels)
    .with_context(|| format!("无法加载标签文件: {}", args.labels.display()))?;

  let mut builder = InferenceContextBuilder::new(&args.model);
  for extension in &args.extensions {
    builder = builder.extension(extension);
  }
  let context = builder
    .build()
    .with_context(|| format!("无法加载模型: {}", args.model.display()))?;

  let visualizer = Visualizer::from_font_path(&args.font, labels.len())
    .with_context(|| format!("无法加载字体: {}", args.font.display()))?;

  let layout = if args.raw_boxes {
    OutputLayout::RawDetections
  } else {
    OutputLayout::CompositedImage
  };

  let mut pipeline = DetectPipeline::new(context, labels, layout, visualizer);

  let image_bytes = std::fs::read(&args.input)
    .with_context(|| format!("无法读取输入图像: {}", args.input.display()))?;

  info!("开始基准测试: {} 次", args.count);
  let mut times = Vec::with_capacity(args.count);
  for i in 0..args.count {
    let result = pipeline.detect(&image_bytes)?;
    info!("({}) 推理完成，耗时: {:.2} ms", i, result.inference_time_ms);
    times.push(result.inference_time_ms);
  }

  // 前两次算预热，不计入平均
  let measured = times.len().saturating_sub(2).max(1);
  warn!(
    "平均推理时间: {:.2} ms",
    times.iter().skip(2).sum::<f64>() / measured as f64
  );

  Ok(())
}
