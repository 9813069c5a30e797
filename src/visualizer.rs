// 该文件是 Qianli （千里眼） 项目的一部分。
// src/output/visualizer.rs - 标注渲染
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::labels::ClassLabels;
use crate::postprocess::Detection;

#[derive(Error, Debug)]
pub enum FontLoadError {
  #[error("字体文件读取失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("无法解析字体文件")]
  InvalidFont,
}

/// 标注渲染器：在基础图像的可写副本上绘制检测框与类别标签。
pub struct Visualizer {
  /// 字体
  font: FontArc,
  /// 字体大小
  font_scale: PxScale,
  /// 每个类别一种颜色
  colors: Vec<Rgb<u8>>,
}

impl Visualizer {
  /// 从字体文件创建渲染器，并为每个类别生成一种颜色。
  pub fn from_font_path(path: &Path, num_classes: usize) -> Result<Self, FontLoadError> {
    let font_data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(font_data).map_err(|_| FontLoadError::InvalidFont)?;
    Ok(Self::with_font(font, num_classes))
  }

  pub fn with_font(font: FontArc, num_classes: usize) -> Self {
    let count = num_classes.max(1);
    let colors: Vec<Rgb<u8>> = (0..count)
      .map(|i| {
        let hue = (i as f32 / count as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Visualizer {
      font,
      font_scale: PxScale::from(16.0),
      colors,
    }
  }

  /// 在基础图像的独立副本上按给定顺序绘制检测结果。
  /// 后绘制的检测可以覆盖先绘制的，原图不被修改。
  pub fn render(
    &self,
    base: &RgbImage,
    detections: &[Detection],
    labels: &ClassLabels,
  ) -> RgbImage {
    let mut image = base.clone();

    for detection in detections {
      let color = self.colors[detection.class_id % self.colors.len()];
      let (anchor_x, anchor_y) = label_anchor(detection);

      // 绘制边界框
      let x = anchor_x.max(0.0) as i32;
      let y = anchor_y.max(0.0) as i32;
      let width = detection.width.min(image.width() as f32 - x as f32) as u32;
      let height = detection.height.min(image.height() as f32 - y as f32) as u32;

      if width > 0 && height > 0 {
        let rect = Rect::at(x, y).of_size(width, height);
        draw_hollow_rect_mut(&mut image, rect, color);

        // 再画一圈内框增加可见度
        if width > 2 && height > 2 {
          let inner = Rect::at(x + 1, y + 1).of_size(width - 2, height - 2);
          draw_hollow_rect_mut(&mut image, inner, color);
        }
      }

      // 标签锚定在框的左上角
      let name = labels.get(detection.class_id).unwrap_or("unknown");
      let label = label_text(name, detection.confidence);
      draw_text_mut(&mut image, color, x, y, self.font_scale, &self.font, &label);
    }

    image
  }
}

/// 标签文本锚点：检测框的左上角。
fn label_anchor(detection: &Detection) -> (f32, f32) {
  (
    detection.cx - detection.width / 2.0,
    detection.cy - detection.height / 2.0,
  )
}

fn label_text(name: &str, confidence: f32) -> String {
  format!("{}:{:.2}", name, confidence)
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(cx: f32, cy: f32, width: f32, height: f32, confidence: f32) -> Detection {
    Detection {
      cx,
      cy,
      width,
      height,
      confidence,
      class_id: 0,
    }
  }

  #[test]
  fn label_anchor_is_box_top_left() {
    let det = detection(100.0, 100.0, 40.0, 20.0, 0.9);
    assert_eq!(label_anchor(&det), (80.0, 90.0));
  }

  #[test]
  fn label_text_truncates_confidence_to_two_places() {
    assert_eq!(label_text("person", 0.8734), "person:0.87");
    assert_eq!(label_text("dog", 1.0), "dog:1.00");
  }

  #[test]
  fn missing_font_file_is_reported() {
    let result = Visualizer::from_font_path(Path::new("/nonexistent/font.ttf"), 80);
    assert!(matches!(result, Err(FontLoadError::Io(_))));
  }

  #[test]
  fn garbage_font_data_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, &[0u8; 32]).unwrap();

    let result = Visualizer::from_font_path(file.path(), 80);
    assert!(matches!(result, Err(FontLoadError::InvalidFont)));
  }
}
