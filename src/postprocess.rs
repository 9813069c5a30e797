// 该文件是 Qianli （千里眼） 项目的一部分。
// src/postprocess.rs - 检测输出解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::debug;

/// 单条检测记录的定宽布局: [中心x, 中心y, 宽, 高, 置信度, 类别]
pub const RECORD_STRIDE: usize = 6;

/// 模型导出变体，初始化时由配置指定，不做运行时探测。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
  /// 输出张量是已绘制完成的图像，框与标签由模型图合成
  CompositedImage,
  /// 输出张量是定宽检测记录的平铺数组
  RawDetections,
}

/// 单个检测结果，像素空间的框中心与宽高。
#[derive(Debug, Clone)]
pub struct Detection {
  /// 框中心 x 坐标
  pub cx: f32,
  /// 框中心 y 坐标
  pub cy: f32,
  /// 框宽度
  pub width: f32,
  /// 框高度
  pub height: f32,
  /// 置信度
  pub confidence: f32,
  /// 类别索引
  pub class_id: usize,
}

#[derive(Error, Debug)]
pub enum MalformedOutputError {
  #[error("输出数组长度 {actual} 不是记录宽度 {stride} 的整数倍")]
  StrideMismatch { stride: usize, actual: usize },
  #[error("第 {index} 条记录的类别索引 {class_id} 超出标签范围 (共 {num_classes} 类)")]
  ClassOutOfRange {
    index: usize,
    class_id: i64,
    num_classes: usize,
  },
}

/// 将平铺的浮点数组按定宽记录切分为检测序列，保持模型输出顺序。
/// 置信度过滤与 NMS 已由模型图内部完成，这里是纯解码，不做任何筛选。
/// 类别索引越界按错误报告，不做截断。
pub fn decode_detections(
  data: &[f32],
  num_classes: usize,
) -> Result<Vec<Detection>, MalformedOutputError> {
  if data.len() % RECORD_STRIDE != 0 {
    return Err(MalformedOutputError::StrideMismatch {
      stride: RECORD_STRIDE,
      actual: data.len(),
    });
  }

  let mut detections = Vec::with_capacity(data.len() / RECORD_STRIDE);
  for (index, record) in data.chunks_exact(RECORD_STRIDE).enumerate() {
    let class_raw = record[5];
    if class_raw < 0.0 || class_raw as usize >= num_classes {
      return Err(MalformedOutputError::ClassOutOfRange {
        index,
        class_id: class_raw as i64,
        num_classes,
      });
    }

    detections.push(Detection {
      cx: record[0],
      cy: record[1],
      width: record[2],
      height: record[3],
      confidence: record[4],
      class_id: class_raw as usize,
    });
  }

  debug!("解码出 {} 条检测记录", detections.len());
  Ok(detections)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_records_in_model_order() {
    #[rustfmt::skip]
    let data = [
      100.0, 100.0, 40.0, 20.0, 0.9, 0.0,
      200.0, 150.0, 30.0, 60.0, 0.8, 2.0,
      50.0, 50.0, 10.0, 10.0, 0.7, 1.0,
    ];

    let detections = decode_detections(&data, 3).unwrap();

    assert_eq!(detections.len(), 3);
    assert_eq!(detections[0].class_id, 0);
    assert_eq!(detections[1].class_id, 2);
    assert_eq!(detections[2].class_id, 1);
    assert_eq!(detections[1].cx, 200.0);
    assert_eq!(detections[1].confidence, 0.8);
  }

  #[test]
  fn stride_mismatch_reports_lengths_and_yields_nothing() {
    let data = [1.0f32; 7];

    match decode_detections(&data, 80) {
      Err(MalformedOutputError::StrideMismatch { stride, actual }) => {
        assert_eq!(stride, RECORD_STRIDE);
        assert_eq!(actual, 7);
      }
      other => panic!("预期 StrideMismatch, 实际 {:?}", other),
    }
  }

  #[test]
  fn class_index_out_of_range_is_reported() {
    let data = [10.0, 10.0, 5.0, 5.0, 0.9, 3.0];

    match decode_detections(&data, 3) {
      Err(MalformedOutputError::ClassOutOfRange {
        index,
        class_id,
        num_classes,
      }) => {
        assert_eq!(index, 0);
        assert_eq!(class_id, 3);
        assert_eq!(num_classes, 3);
      }
      other => panic!("预期 ClassOutOfRange, 实际 {:?}", other),
    }
  }

  #[test]
  fn negative_class_index_is_reported() {
    let data = [10.0, 10.0, 5.0, 5.0, 0.9, -1.0];
    assert!(matches!(
      decode_detections(&data, 3),
      Err(MalformedOutputError::ClassOutOfRange { class_id: -1, .. })
    ));
  }

  #[test]
  fn empty_output_decodes_to_empty_sequence() {
    let detections = decode_detections(&[], 80).unwrap();
    assert!(detections.is_empty());
  }
}
