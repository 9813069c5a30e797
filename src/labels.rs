// 该文件是 Qianli （千里眼） 项目的一部分。
// src/labels.rs - 类别标签表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LabelLoadError {
  #[error("标签文件读取失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("标签表为空")]
  Empty,
}

/// 类别标签表。行号即类别索引，进程启动时加载一次，之后只读。
#[derive(Debug, Clone)]
pub struct ClassLabels {
  names: Vec<String>,
}

impl ClassLabels {
  pub fn from_path(path: &Path) -> Result<Self, LabelLoadError> {
    let text = std::fs::read_to_string(path)?;
    let labels = Self::from_text(&text)?;
    info!("加载 {} 个类别标签: {}", labels.len(), path.display());
    Ok(labels)
  }

  /// 每行一个类别名，第 N 行（从 0 数起）对应类别索引 N，空行忽略。
  pub fn from_text(text: &str) -> Result<Self, LabelLoadError> {
    let names: Vec<String> = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(String::from)
      .collect();

    if names.is_empty() {
      return Err(LabelLoadError::Empty);
    }

    Ok(ClassLabels { names })
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn line_number_is_class_index() {
    let labels = ClassLabels::from_text("person\nbicycle\ncar\n").unwrap();

    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(0), Some("person"));
    assert_eq!(labels.get(2), Some("car"));
    assert_eq!(labels.get(3), None);
  }

  #[test]
  fn windows_line_endings_are_trimmed() {
    let labels = ClassLabels::from_text("person\r\nbicycle\r\n").unwrap();
    assert_eq!(labels.get(1), Some("bicycle"));
  }

  #[test]
  fn empty_source_is_rejected() {
    assert!(matches!(ClassLabels::from_text(""), Err(LabelLoadError::Empty)));
    assert!(matches!(
      ClassLabels::from_text("\n\n  \n"),
      Err(LabelLoadError::Empty)
    ));
  }

  #[test]
  fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cat\ndog").unwrap();

    let labels = ClassLabels::from_path(file.path()).unwrap();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels.get(1), Some("dog"));
  }

  #[test]
  fn missing_file_is_io_error() {
    let result = ClassLabels::from_path(Path::new("/nonexistent/classes.txt"));
    assert!(matches!(result, Err(LabelLoadError::Io(_))));
  }
}
