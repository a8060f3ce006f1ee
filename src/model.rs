// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 检测数据模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::GrayImage;
use tracing::error;

use crate::{mask::MaskGrid, refine::RefineError};

/// 整数像素框 [x1, y1, x2, y2]
pub type BBox = [i32; 4];

/// 对一个批次做后处理的组件
pub trait Refine {
  type Input;
  type Output;
  type Error;

  fn refine(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 两个框的最小外接框
pub fn union_box(a: &BBox, b: &BBox) -> BBox {
  [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
}

/// 预处理阶段留下的信箱填充信息，以及原图尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
  pub canvas_size: usize,
  pub pad_x: i32,
  pub pad_y: i32,
  pub original_width: u32,
  pub original_height: u32,
}

impl Letterbox {
  pub fn validate(&self) -> Result<(), RefineError> {
    let canvas = self.canvas_size as i64;
    let content_w = canvas - 2 * self.pad_x as i64;
    let content_h = canvas - 2 * self.pad_y as i64;
    if self.pad_x < 0 || self.pad_y < 0 || content_w <= 0 || content_h <= 0 {
      error!(
        "画布 {} 无法容纳填充 ({}, {})",
        self.canvas_size, self.pad_x, self.pad_y
      );
      return Err(RefineError::InvalidLetterbox {
        canvas_size: self.canvas_size,
        pad_x: self.pad_x,
        pad_y: self.pad_y,
      });
    }
    Ok(())
  }

  fn content_width(&self) -> f32 {
    (self.canvas_size as i32 - 2 * self.pad_x) as f32
  }

  fn content_height(&self) -> f32 {
    (self.canvas_size as i32 - 2 * self.pad_y) as f32
  }

  /// 画布坐标 -> 原图坐标，截断取整
  pub fn to_original(&self, bbox: &BBox) -> BBox {
    let map_x = |x: i32| {
      ((x - self.pad_x) as f32 / self.content_width() * self.original_width as f32) as i32
    };
    let map_y = |y: i32| {
      ((y - self.pad_y) as f32 / self.content_height() * self.original_height as f32) as i32
    };
    [map_x(bbox[0]), map_y(bbox[1]), map_x(bbox[2]), map_y(bbox[3])]
  }

  /// 原图坐标 -> 画布坐标，按像素中心取最近整数
  pub fn to_canvas(&self, bbox: &BBox) -> BBox {
    let map_x = |x: i32| {
      ((x as f32 + 0.5) / self.original_width as f32 * self.content_width() + self.pad_x as f32)
        .round() as i32
    };
    let map_y = |y: i32| {
      ((y as f32 + 0.5) / self.original_height as f32 * self.content_height()
        + self.pad_y as f32)
        .round() as i32
    };
    [map_x(bbox[0]), map_y(bbox[1]), map_x(bbox[2]), map_y(bbox[3])]
  }
}

/// 模型输出的单个候选
#[derive(Debug, Clone)]
pub struct RawDetection {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: u32,
  pub mask: MaskGrid,
}

/// 一次推理的全部候选，共享同一画布与填充
#[derive(Debug, Clone)]
pub struct RawBatch {
  pub letterbox: Letterbox,
  pub detections: Vec<RawDetection>,
}

impl RawBatch {
  /// 由按下标对齐的四组数组构造批次，长度或掩码尺寸不一致时直接报错
  pub fn from_parts(
    letterbox: Letterbox,
    boxes: Vec<BBox>,
    scores: Vec<f32>,
    labels: Vec<u32>,
    masks: Vec<MaskGrid>,
  ) -> Result<Self, RefineError> {
    let n = boxes.len();
    if scores.len() != n || labels.len() != n || masks.len() != n {
      error!(
        "输出数组长度不一致: boxes={}, scores={}, labels={}, masks={}",
        n,
        scores.len(),
        labels.len(),
        masks.len()
      );
      return Err(RefineError::LengthMismatch {
        boxes: n,
        scores: scores.len(),
        labels: labels.len(),
        masks: masks.len(),
      });
    }

    let detections = boxes
      .into_iter()
      .zip(scores)
      .zip(labels)
      .zip(masks)
      .map(|(((bbox, score), class_id), mask)| RawDetection {
        bbox,
        score,
        class_id,
        mask,
      })
      .collect();

    let batch = RawBatch {
      letterbox,
      detections,
    };
    batch.validate()?;
    Ok(batch)
  }

  pub fn validate(&self) -> Result<(), RefineError> {
    self.letterbox.validate()?;
    let canvas = self.letterbox.canvas_size;
    for (index, det) in self.detections.iter().enumerate() {
      if det.mask.width() != canvas || det.mask.height() != canvas {
        error!(
          "第 {} 个掩码尺寸为 {}x{}, 期望 {}x{}",
          index,
          det.mask.width(),
          det.mask.height(),
          canvas,
          canvas
        );
        return Err(RefineError::MaskShape {
          index,
          width: det.mask.width(),
          height: det.mask.height(),
          canvas,
        });
      }
    }
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 最终检测结果，坐标位于原图像素空间
#[derive(Debug, Clone)]
pub struct RefinedDetection {
  pub bbox: BBox,
  /// 尺寸恰为 (x2 - x1) × (y2 - y1) 的二值掩码
  pub mask: GrayImage,
  pub score: f32,
  pub class_id: u32,
  pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct RefineResult {
  pub items: Box<[RefinedDetection]>,
}

impl RefineResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, RefinedDetection> {
    self.items.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn letterbox() -> Letterbox {
    Letterbox {
      canvas_size: 640,
      pad_x: 0,
      pad_y: 80,
      original_width: 1280,
      original_height: 960,
    }
  }

  #[test]
  fn to_original_removes_padding_and_scales() {
    let mapped = letterbox().to_original(&[0, 80, 320, 560]);
    assert_eq!(mapped, [0, 0, 640, 960]);
  }

  #[test]
  fn to_canvas_inverts_to_original() {
    let lb = letterbox();
    let bbox = [100, 150, 400, 420];
    let back = lb.to_canvas(&lb.to_original(&bbox));
    for (a, b) in bbox.iter().zip(back.iter()) {
      assert!((a - b).abs() <= 1, "{:?} vs {:?}", bbox, back);
    }
  }

  #[test]
  fn letterbox_rejects_padding_that_fills_canvas() {
    let lb = Letterbox {
      pad_y: 320,
      ..letterbox()
    };
    assert!(matches!(
      lb.validate(),
      Err(RefineError::InvalidLetterbox { pad_y: 320, .. })
    ));
  }

  #[test]
  fn from_parts_rejects_misaligned_arrays() {
    let lb = Letterbox {
      canvas_size: 8,
      pad_x: 0,
      pad_y: 0,
      original_width: 8,
      original_height: 8,
    };
    let err = RawBatch::from_parts(
      lb,
      vec![[0, 0, 4, 4]; 2],
      vec![0.9],
      vec![0, 0],
      vec![MaskGrid::zeros(8, 8); 2],
    )
    .unwrap_err();
    assert!(matches!(
      err,
      RefineError::LengthMismatch {
        boxes: 2,
        scores: 1,
        ..
      }
    ));
  }

  #[test]
  fn from_parts_rejects_small_masks() {
    let lb = Letterbox {
      canvas_size: 8,
      pad_x: 0,
      pad_y: 0,
      original_width: 8,
      original_height: 8,
    };
    let err = RawBatch::from_parts(
      lb,
      vec![[0, 0, 4, 4]],
      vec![0.9],
      vec![0],
      vec![MaskGrid::zeros(8, 4)],
    )
    .unwrap_err();
    assert!(matches!(err, RefineError::MaskShape { index: 0, .. }));
  }

  #[test]
  fn union_box_is_componentwise() {
    assert_eq!(union_box(&[10, 10, 50, 50], &[12, 5, 52, 40]), [10, 5, 52, 50]);
  }
}
