// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/batch_file.rs - JSON 推理结果文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::BatchFrame,
  mask::MaskGrid,
  model::{BBox, Letterbox, RawBatch},
  refine::RefineError,
};

const DEFAULT_CANVAS_SIZE: usize = 640;

#[derive(Error, Debug)]
pub enum BatchFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("推理结果无效: {0}")]
  Invalid(#[from] RefineError),
  #[error("目录中没有 JSON 文件: {0}")]
  EmptyDirectory(String),
}

fn default_canvas_size() -> usize {
  DEFAULT_CANVAS_SIZE
}

/// 模型输出的磁盘格式，字段与模型的三个输出张量一一对应
#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
  #[serde(default = "default_canvas_size")]
  pub canvas_size: usize,
  pub pad_x: i32,
  pub pad_y: i32,
  pub original_width: u32,
  pub original_height: u32,
  /// 每行 [x1, y1, x2, y2, score]
  pub dets: Vec<[f32; 5]>,
  pub labels: Vec<u32>,
  /// 每个掩码为 canvas_size 行，每行 canvas_size 个值
  pub masks: Vec<Vec<Vec<f32>>>,
}

impl BatchFile {
  pub fn into_batch(self) -> Result<RawBatch, RefineError> {
    let letterbox = Letterbox {
      canvas_size: self.canvas_size,
      pad_x: self.pad_x,
      pad_y: self.pad_y,
      original_width: self.original_width,
      original_height: self.original_height,
    };

    // 模型输出浮点坐标，向零截断为整数像素
    let (boxes, scores): (Vec<BBox>, Vec<f32>) = self
      .dets
      .iter()
      .map(|d| ([d[0] as i32, d[1] as i32, d[2] as i32, d[3] as i32], d[4]))
      .unzip();

    let masks = self
      .masks
      .into_iter()
      .map(MaskGrid::from_rows)
      .collect::<Result<Vec<_>, _>>()?;

    RawBatch::from_parts(letterbox, boxes, scores, self.labels, masks)
  }

  pub fn load(path: &Path) -> Result<RawBatch, BatchFileInputError> {
    debug!("读取推理结果文件: {}", path.display());
    let file: BatchFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(file.into_batch()?)
  }
}

fn frame_name(path: &Path) -> String {
  path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "batch".to_string())
}

/// `batch:///path/file.json` 读取单个文件，`batch:///path/dir` 读取目录下全部 JSON 文件
pub struct BatchFileInput {
  paths: Vec<PathBuf>,
}

impl FromUrlWithScheme for BatchFileInput {
  const SCHEME: &'static str = "batch";
}

impl FromUrl for BatchFileInput {
  type Error = BatchFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(BatchFileInputError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::open(Path::new(url.path()))
  }
}

impl BatchFileInput {
  pub fn open(path: &Path) -> Result<Self, BatchFileInputError> {
    let paths = if path.is_dir() {
      let mut paths = std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
      paths.retain(|p| p.extension().is_some_and(|ext| ext == "json"));
      paths.sort();
      if paths.is_empty() {
        return Err(BatchFileInputError::EmptyDirectory(
          path.display().to_string(),
        ));
      }
      paths
    } else {
      // 单个文件在打开时即检查是否存在
      std::fs::metadata(path)?;
      vec![path.to_path_buf()]
    };

    info!("共 {} 个推理结果文件", paths.len());
    Ok(Self { paths })
  }

  pub fn paths(&self) -> &[PathBuf] {
    &self.paths
  }

  pub fn into_batches(self) -> BatchFileIter {
    BatchFileIter {
      paths: self.paths.into_iter(),
    }
  }
}

/// 逐个读取批次；读取失败时产出一次错误，随后结束迭代
pub struct BatchFileIter {
  paths: std::vec::IntoIter<PathBuf>,
}

impl Iterator for BatchFileIter {
  type Item = Result<BatchFrame, BatchFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.paths.next()?;
    match BatchFile::load(&path) {
      Ok(batch) => Some(Ok(BatchFrame {
        name: frame_name(&path),
        batch,
      })),
      Err(e) => {
        error!("读取 {} 失败: {}", path.display(), e);
        self.paths = Vec::new().into_iter();
        Some(Err(e))
      }
    }
  }
}
