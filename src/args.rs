// 该文件是 Qianli （千里眼） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;

/// Qianli 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径（图内已嵌入前后处理算子）
  #[arg(long, value_name = "FILE")]
  pub model: PathBuf,

  /// 自定义算子扩展库路径，可重复指定
  #[arg(long = "extension", value_name = "LIB")]
  pub extensions: Vec<PathBuf>,

  /// 类别标签文件路径，每行一个类别名
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,

  /// 标注字体文件路径 (TTF/OTF)
  #[arg(long, value_name = "FONT")]
  pub font: PathBuf,

  /// 输入图像路径
  /// 支持格式: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,

  /// 输出图像路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,

  /// 模型输出为定宽检测记录数组（默认为已合成图像）
  #[arg(long)]
  pub raw_boxes: bool,

  /// 检测记录文本输出路径（可选）
  #[arg(long, value_name = "FILE")]
  pub record: Option<PathBuf>,
}
