// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 类别名称表
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use thiserror::Error;
use tracing::{debug, info};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum ClassTableError {
  #[error("类别文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别文件为空: {0}")]
  Empty(String),
}

/// 类别下标到名称的映射，每行一个类别，行号即下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTable {
  names: Vec<String>,
}

impl ClassTable {
  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      names: names.into_iter().map(Into::into).collect(),
    }
  }

  pub fn coco() -> Self {
    Self::from_names(COCO_CLASSES)
  }

  pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ClassTableError> {
    let names = reader
      .lines()
      .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()))
      .collect::<Result<Vec<_>, _>>()?;
    debug!("读取到 {} 个类别", names.len());
    Ok(Self { names })
  }

  pub fn from_file(path: &Path) -> Result<Self, ClassTableError> {
    info!("加载类别文件: {}", path.display());
    let table = Self::from_reader(BufReader::new(File::open(path)?))?;
    if table.is_empty() {
      return Err(ClassTableError::Empty(path.display().to_string()));
    }
    Ok(table)
  }

  pub fn resolve(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

impl Default for ClassTable {
  fn default() -> Self {
    Self::coco()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{Cursor, Write};

  #[test]
  fn coco_table_starts_with_person() {
    let table = ClassTable::coco();
    assert_eq!(table.len(), 80);
    assert_eq!(table.resolve(0), Some("person"));
    assert_eq!(table.resolve(79), Some("toothbrush"));
    assert_eq!(table.resolve(80), None);
  }

  #[test]
  fn reader_maps_line_numbers_to_ids() {
    let table = ClassTable::from_reader(Cursor::new("person\r\nbicycle\ncar\n")).unwrap();
    assert_eq!(table.resolve(0), Some("person"));
    assert_eq!(table.resolve(1), Some("bicycle"));
    assert_eq!(table.resolve(2), Some("car"));
    assert_eq!(table.resolve(3), None);
  }

  #[test]
  fn file_must_not_be_empty() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.flush().unwrap();
    assert!(matches!(
      ClassTable::from_file(file.path()),
      Err(ClassTableError::Empty(_))
    ));

    writeln!(file, "cat").unwrap();
    let table = ClassTable::from_file(file.path()).unwrap();
    assert_eq!(table.resolve(0), Some("cat"));
  }
}
