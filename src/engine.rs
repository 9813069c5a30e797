// 该文件是 Qianli （千里眼） 项目的一部分。
// src/engine.rs - ONNX Runtime 推理上下文
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use ort::session::Session;
use ort::value::Tensor;
use thiserror::Error;
use tracing::{debug, error, info};

/// 默认输入张量名。模型图内嵌的前处理算子直接消费压缩图像字节。
pub const DEFAULT_INPUT_NAME: &str = "image";
/// 默认输出张量名。
pub const DEFAULT_OUTPUT_NAME: &str = "image_out";

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型加载错误: {0}")]
  ModelRead(std::io::Error),
  #[error("扩展算子库缺失: {0}")]
  ExtensionMissing(PathBuf),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("会话创建失败: {0}")]
  SessionError(ort::Error),
}

impl From<std::io::Error> for ModelLoadError {
  fn from(err: std::io::Error) -> Self {
    ModelLoadError::ModelRead(err)
  }
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("输入张量构造失败: {0}")]
  InputTensor(ort::Error),
  #[error("推理执行失败: {0}")]
  Execution(ort::Error),
  #[error("模型缺少输出 '{0}'")]
  MissingOutput(String),
  #[error("输出张量提取失败: {0}")]
  OutputType(ort::Error),
}

/// 请求的输出元素类型，由模型导出变体在配置期决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
  Bytes,
  Floats,
}

/// 推理输出的自有拷贝。底层张量在提取完成后随调用作用域释放。
#[derive(Debug, Clone)]
pub enum OutputTensor {
  Bytes { shape: Vec<i64>, data: Vec<u8> },
  Floats { shape: Vec<i64>, data: Vec<f32> },
}

pub struct InferenceContextBuilder {
  model_path: PathBuf,
  extensions: Vec<PathBuf>,
  input_name: String,
  output_name: String,
}

impl InferenceContextBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    InferenceContextBuilder {
      model_path: model_path.into(),
      extensions: Vec::new(),
      input_name: DEFAULT_INPUT_NAME.to_string(),
      output_name: DEFAULT_OUTPUT_NAME.to_string(),
    }
  }

  /// 注册一个自定义算子扩展库，模型图内嵌的前后处理算子依赖它。
  pub fn extension(mut self, path: impl Into<PathBuf>) -> Self {
    self.extensions.push(path.into());
    self
  }

  pub fn input_name(mut self, name: impl Into<String>) -> Self {
    self.input_name = name.into();
    self
  }

  pub fn output_name(mut self, name: impl Into<String>) -> Self {
    self.output_name = name.into();
    self
  }

  /// 加载模型并创建推理上下文。任何一步失败都不会留下半初始化的上下文。
  pub fn build(self) -> Result<InferenceContext, ModelLoadError> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let mut builder = Session::builder().map_err(ModelLoadError::SessionError)?;

    for extension in &self.extensions {
      if !extension.is_file() {
        error!("找不到扩展算子库: {}", extension.display());
        return Err(ModelLoadError::ExtensionMissing(extension.clone()));
      }
      info!("注册扩展算子库: {}", extension.display());
      builder = builder
        .with_operator_library(extension)
        .map_err(ModelLoadError::SessionError)?;
    }

    info!("创建 ONNX Runtime 推理会话");
    let session = builder
      .commit_from_memory(&model_data)
      .map_err(ModelLoadError::SessionError)?;
    info!("模型加载完成");

    if !session
      .inputs
      .iter()
      .any(|input| input.name == self.input_name)
    {
      let declared: Vec<&str> = session
        .inputs
        .iter()
        .map(|input| input.name.as_str())
        .collect();
      error!("模型缺少输入 '{}', 实际声明: {:?}", self.input_name, declared);
      return Err(ModelLoadError::ModelInvalid(format!(
        "模型缺少输入 '{}', 实际声明: {:?}",
        self.input_name, declared
      )));
    }

    if !session
      .outputs
      .iter()
      .any(|output| output.name == self.output_name)
    {
      let declared: Vec<&str> = session
        .outputs
        .iter()
        .map(|output| output.name.as_str())
        .collect();
      error!("模型缺少输出 '{}', 实际声明: {:?}", self.output_name, declared);
      return Err(ModelLoadError::ModelInvalid(format!(
        "模型缺少输出 '{}', 实际声明: {:?}",
        self.output_name, declared
      )));
    }

    debug!("模型输入数量: {}", session.inputs.len());
    debug!("模型输出数量: {}", session.outputs.len());

    Ok(InferenceContext {
      session,
      input_name: self.input_name,
      output_name: self.output_name,
    })
  }
}

/// 推理上下文，独占持有已加载的模型会话。
/// run 要求独占借用，同一上下文上的并发调用由编译器排除；
/// 上下文析构时释放会话及其派生的全部张量。
pub struct InferenceContext {
  session: Session,
  input_name: String,
  output_name: String,
}

impl InferenceContext {
  /// 将压缩图像字节原样包装为一维 uint8 张量并执行一次推理。
  /// 解码与缩放由模型图内嵌的前处理算子完成，这里不触碰像素。
  /// 输入张量与会话输出都在本次调用结束时释放，成功与否皆然。
  pub fn run(
    &mut self,
    image_bytes: &[u8],
    kind: OutputKind,
  ) -> Result<OutputTensor, InferenceError> {
    debug!("构造输入张量: uint8 x {}", image_bytes.len());
    let shape = vec![image_bytes.len() as i64];
    let input = Tensor::from_array((shape, image_bytes.to_vec()))
      .map_err(InferenceError::InputTensor)?;

    debug!("执行模型推理");
    let outputs = self
      .session
      .run(ort::inputs![self.input_name.as_str() => input])
      .map_err(InferenceError::Execution)?;

    let value = outputs
      .get(self.output_name.as_str())
      .ok_or_else(|| InferenceError::MissingOutput(self.output_name.clone()))?;

    // 按配置期确定的元素类型拷出自有数据，不嗅探输出格式
    let output = match kind {
      OutputKind::Bytes => {
        let (shape, data) = value
          .try_extract_tensor::<u8>()
          .map_err(InferenceError::OutputType)?;
        OutputTensor::Bytes {
          shape: shape.to_vec(),
          data: data.to_vec(),
        }
      }
      OutputKind::Floats => {
        let (shape, data) = value
          .try_extract_tensor::<f32>()
          .map_err(InferenceError::OutputType)?;
        OutputTensor::Floats {
          shape: shape.to_vec(),
          data: data.to_vec(),
        }
      }
    };

    Ok(output)
  }

  pub fn input_name(&self) -> &str {
    &self.input_name
  }

  pub fn output_name(&self) -> &str {
    &self.output_name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn corrupt_artifact_fails_to_build() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"not an onnx model").unwrap();

    let result = InferenceContextBuilder::new(file.path()).build();
    assert!(matches!(result, Err(ModelLoadError::SessionError(_))));
  }

  #[test]
  fn missing_model_file_fails_to_build() {
    let result = InferenceContextBuilder::new("/nonexistent/model.onnx").build();
    assert!(matches!(result, Err(ModelLoadError::ModelRead(_))));
  }

  #[test]
  fn missing_extension_library_fails_to_build() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"whatever").unwrap();

    let result = InferenceContextBuilder::new(file.path())
      .extension("/nonexistent/libortextensions.so")
      .build();
    assert!(matches!(result, Err(ModelLoadError::ExtensionMissing(_))));
  }
}
