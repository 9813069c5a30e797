// 该文件是 Qianli （千里眼） 项目的一部分。
// src/codec.rs - 图像编解码
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

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("输入图像为空")]
  EmptyInput,
  #[error("图像解码失败: {0}")]
  InvalidImage(image::ImageError),
}

#[derive(Error, Debug)]
pub enum EncodeError {
  #[error("图像编码失败: {0}")]
  Encode(image::ImageError),
}

/// 解码任意压缩格式的图像字节，统一为 RGB8 像素缓冲。
/// 任意宽高比与色深都可接受，通道格式在这里归一。
pub fn decode(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
  if bytes.is_empty() {
    return Err(DecodeError::EmptyInput);
  }

  let image = image::load_from_memory(bytes).map_err(DecodeError::InvalidImage)?;
  debug!("图像解码完成: {}x{}", image.width(), image.height());

  Ok(image.into())
}

/// 将像素缓冲序列化为 PNG 字节。
pub fn encode(image: &RgbImage) -> Result<Vec<u8>, EncodeError> {
  let mut buffer = Cursor::new(Vec::new());
  image
    .write_to(&mut buffer, ImageFormat::Png)
    .map_err(EncodeError::Encode)?;

  Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn decode_rejects_empty_input() {
    assert!(matches!(decode(&[]), Err(DecodeError::EmptyInput)));
  }

  #[test]
  fn decode_rejects_garbage_bytes() {
    let bytes = [0u8; 64];
    assert!(matches!(decode(&bytes), Err(DecodeError::InvalidImage(_))));
  }

  #[test]
  fn encode_then_decode_keeps_dimensions() {
    let mut image = RgbImage::new(13, 7);
    image.put_pixel(3, 2, Rgb([255, 0, 0]));
    image.put_pixel(12, 6, Rgb([0, 255, 0]));

    let bytes = encode(&image).unwrap();
    let decoded = decode(&bytes).unwrap();

    assert_eq!(decoded.dimensions(), (13, 7));
    assert_eq!(decoded.get_pixel(3, 2), &Rgb([255, 0, 0]));
  }
}
