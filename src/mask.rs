// 该文件是 Shanan （山南西风） 项目的一部分。
// src/mask.rs - 画布尺寸的软掩码
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

use image::{GrayImage, Luma, imageops::FilterType};

use crate::{model::BBox, refine::RefineError};

/// 最终二值掩码中前景像素的取值
pub const MASK_FOREGROUND: u8 = 255;
/// 最终二值掩码中背景像素的取值
pub const MASK_BACKGROUND: u8 = 0;

/// 将软掩码值四舍五入为 0/1
#[inline]
pub fn binarize(value: f32) -> u8 {
  if value.round() >= 1.0 { 1 } else { 0 }
}

/// 模型输出的单个候选掩码，尺寸等于整个画布，行优先存储
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGrid {
  width: usize,
  height: usize,
  data: Box<[f32]>,
}

impl MaskGrid {
  pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, RefineError> {
    if data.len() != width * height {
      return Err(RefineError::MaskDataLength {
        expected: width * height,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn zeros(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      data: vec![0.0; width * height].into_boxed_slice(),
    }
  }

  /// 由嵌套的行数组构造，所有行必须等长
  pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, RefineError> {
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let mut data = Vec::with_capacity(width * height);
    for (row_idx, row) in rows.into_iter().enumerate() {
      if row.len() != width {
        return Err(RefineError::RaggedMask {
          row: row_idx,
          expected: width,
          actual: row.len(),
        });
      }
      data.extend(row);
    }
    Self::new(width, height, data)
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  #[inline]
  pub fn get(&self, x: usize, y: usize) -> f32 {
    self.data[y * self.width + x]
  }

  #[inline]
  pub fn set(&mut self, x: usize, y: usize, value: f32) {
    self.data[y * self.width + x] = value;
  }

  #[inline]
  pub fn bit(&self, x: usize, y: usize) -> u8 {
    binarize(self.get(x, y))
  }

  /// 将闭区间框 `[x1, x2] × [y1, y2]` 内的像素全部设为 `value`
  pub fn fill_box(&mut self, bbox: &BBox, value: f32) {
    for (x, y) in inclusive_pixels(*bbox) {
      self.set(x, y, value);
    }
  }

  /// 在 `region` 闭区间内逐像素取最大值，把 `other` 融合进当前掩码
  pub fn fuse_max_within(&mut self, other: &MaskGrid, region: &BBox) {
    for (x, y) in inclusive_pixels(*region) {
      let fused = self.get(x, y).max(other.get(x, y));
      self.set(x, y, fused);
    }
  }

  /// 裁剪 `[x1, x2) × [y1, y2)`，二值化后最近邻缩放到 `out_width × out_height`
  pub fn rasterize(&self, bbox: &BBox, out_width: u32, out_height: u32) -> GrayImage {
    if out_width == 0 || out_height == 0 {
      return GrayImage::new(out_width, out_height);
    }

    let crop_width = (bbox[2] - bbox[0]).max(0) as u32;
    let crop_height = (bbox[3] - bbox[1]).max(0) as u32;
    if crop_width == 0 || crop_height == 0 {
      return GrayImage::new(out_width, out_height);
    }

    let (x0, y0) = (bbox[0] as usize, bbox[1] as usize);
    let crop = GrayImage::from_fn(crop_width, crop_height, |x, y| {
      let bit = self.bit(x0 + x as usize, y0 + y as usize);
      Luma([if bit == 1 {
        MASK_FOREGROUND
      } else {
        MASK_BACKGROUND
      }])
    });

    if crop.dimensions() == (out_width, out_height) {
      return crop;
    }

    image::imageops::resize(&crop, out_width, out_height, FilterType::Nearest)
  }
}

/// 闭区间框内的所有像素坐标，调用方保证框已被夹紧到画布内
pub(crate) fn inclusive_pixels(bbox: BBox) -> impl Iterator<Item = (usize, usize)> {
  let [x1, y1, x2, y2] = bbox;
  (y1..=y2).flat_map(move |y| (x1..=x2).map(move |x| (x as usize, y as usize)))
}
