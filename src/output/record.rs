// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::BatchFrame,
  model::RefineResult,
  output::Render,
};

#[derive(Error, Debug)]
pub enum RecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每个批次写一个 `<name>.txt`，每行 `标签, 分数, x1, y1, x2, y2`；
/// 带 `masks` 查询参数时另存每个目标的掩码 `<name>-<k>.png`
pub struct RecordOutput {
  directory: PathBuf,
  label_with_name: bool,
  save_masks: bool,
}

impl FromUrlWithScheme for RecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordOutput {
  type Error = RecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(RecordOutputError::SchemeMismatch);
    }

    let label_with_name = !uri.query_pairs().any(|(k, v)| k == "record" && v == "id");
    let save_masks = uri.query_pairs().any(|(k, _)| k == "masks");

    Ok(
      RecordOutput::new(uri.path())
        .with_label_name(label_with_name)
        .with_masks(save_masks),
    )
  }
}

impl RecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
      label_with_name: true,
      save_masks: false,
    }
  }

  pub fn with_masks(mut self, save_masks: bool) -> Self {
    self.save_masks = save_masks;
    self
  }

  pub fn with_label_name(mut self, label_with_name: bool) -> Self {
    self.label_with_name = label_with_name;
    self
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn format_records(&self, result: &RefineResult) -> String {
    result
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          item.label.clone()
        } else {
          item.class_id.to_string()
        };
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

impl Render<BatchFrame, RefineResult> for RecordOutput {
  type Error = RecordOutputError;

  fn render_result(&self, frame: &BatchFrame, result: &RefineResult) -> Result<(), Self::Error> {
    std::fs::create_dir_all(&self.directory)?;

    let record_path = self.directory.join(format!("{}.txt", frame.name));
    std::fs::write(&record_path, self.format_records(result))?;

    if self.save_masks {
      for (k, item) in result.iter().enumerate() {
        if item.mask.width() == 0 || item.mask.height() == 0 {
          warn!("{} 第 {} 个目标掩码为空，跳过保存", frame.name, k);
          continue;
        }
        let mask_path = self.directory.join(format!("{}-{:02}.png", frame.name, k));
        item.mask.save(&mask_path)?;
      }
    }

    info!(
      "保存 {} 个目标记录到: {}",
      result.len(),
      record_path.display()
    );
    Ok(())
  }
}
