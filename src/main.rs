// 该文件是 Qianli （千里眼） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use qianli::engine::InferenceContextBuilder;
use qianli::labels::ClassLabels;
use qianli::pipeline::{DetectPipeline, DetectResult};
use qianli::postprocess::OutputLayout;
use qianli::visualizer::Visualizer;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model.display());
  info!("输入图像: {}", args.input.display());
  info!("输出路径: {}", args.output.display());

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

  info!("开始检测...");
  let result = pipeline.detect(&image_bytes)?;

  for det in &result.detections {
    println!(
      "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
      pipeline.labels().get(det.class_id).unwrap_or("unknown"),
      det.confidence * 100.0,
      det.cx - det.width / 2.0,
      det.cy - det.height / 2.0,
      det.width,
      det.height
    );
  }

  if let Some(record_path) = &args.record {
    write_record(&result, pipeline.labels(), record_path)?;
  }

  save_image(&result.output_image, &args.output)?;

  info!(
    "检测完成: {} 个对象, 推理耗时 {:.2} ms",
    result.detections.len(),
    result.inference_time_ms
  );

  Ok(())
}

fn save_image(image: &image::RgbImage, path: &Path) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)?;
  }

  image
    .save(path)
    .with_context(|| format!("无法保存输出图像: {}", path.display()))?;
  info!("保存图像到文件: {}", path.display());

  Ok(())
}

fn write_record(result: &DetectResult, labels: &ClassLabels, path: &Path) -> Result<()> {
  let mut records = Vec::new();
  for det in &result.detections {
    records.push(format!(
      "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
      labels.get(det.class_id).unwrap_or("unknown"),
      det.confidence,
      det.cx,
      det.cy,
      det.width,
      det.height
    ));
  }

  std::fs::write(path, records.join("\n"))
    .with_context(|| format!("无法写入检测记录: {}", path.display()))?;

  Ok(())
}
