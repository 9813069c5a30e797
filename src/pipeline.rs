// 该文件是 Qianli （千里眼） 项目的一部分。
// src/pipeline.rs - 检测流水线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{self, DecodeError};
use crate::engine::{InferenceContext, InferenceError, OutputKind, OutputTensor};
use crate::labels::ClassLabels;
use crate::postprocess::{self, Detection, MalformedOutputError, OutputLayout};
use crate::visualizer::Visualizer;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("图像解码错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("推理错误: {0}")]
  Inference(#[from] InferenceError),
  #[error("输出解码错误: {0}")]
  MalformedOutput(#[from] MalformedOutputError),
}

/// 一次检测调用的完整结果，构造后不再修改。
#[derive(Debug, Clone)]
pub struct DetectResult {
  /// 绘制了检测框与标签的输出图像
  pub output_image: RgbImage,
  /// 检测序列，保持模型输出顺序
  pub detections: Vec<Detection>,
  /// 推理耗时（毫秒）
  pub inference_time_ms: f64,
}

/// 检测流水线：推理 → 输出解析 → 标注渲染。
/// 上下文与标签表在初始化后只读，detect 需要独占借用，
/// 并发请求由调用方串行化或使用多个流水线实例。
pub struct DetectPipeline {
  context: InferenceContext,
  labels: ClassLabels,
  layout: OutputLayout,
  visualizer: Visualizer,
}

impl DetectPipeline {
  pub fn new(
    context: InferenceContext,
    labels: ClassLabels,
    layout: OutputLayout,
    visualizer: Visualizer,
  ) -> Self {
    DetectPipeline {
      context,
      labels,
      layout,
      visualizer,
    }
  }

  pub fn labels(&self) -> &ClassLabels {
    &self.labels
  }

  pub fn layout(&self) -> OutputLayout {
    self.layout
  }

  /// 对一份压缩图像字节执行一次完整检测。
  /// 单次请求内全有或全无：任何一步失败都不产生部分结果，也不重试。
  pub fn detect(&mut self, image_bytes: &[u8]) -> Result<DetectResult, DetectError> {
    debug!("收到 {} 字节的输入图像", image_bytes.len());

    let kind = match self.layout {
      OutputLayout::CompositedImage => OutputKind::Bytes,
      OutputLayout::RawDetections => OutputKind::Floats,
    };

    let start = std::time::Instant::now();
    let output = self.context.run(image_bytes, kind)?;
    let inference_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!("推理完成，耗时: {:.2} ms", inference_time_ms);

    let (base, detections) = match output {
      // 模型图已把框与标签合成进输出图像，检测序列为空
      OutputTensor::Bytes { data, .. } => (codec::decode(&data)?, Vec::new()),
      // 原始检测记录叠加到输入图像上
      OutputTensor::Floats { data, .. } => {
        let detections = postprocess::decode_detections(&data, self.labels.len())?;
        (codec::decode(image_bytes)?, detections)
      }
    };

    let output_image = self.visualizer.render(&base, &detections, &self.labels);

    Ok(DetectResult {
      output_image,
      detections,
      inference_time_ms,
    })
  }
}
