// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine/normalize.rs - 框夹紧与退化框剔除
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use super::{Candidate, Status};
use crate::model::{BBox, Letterbox};

/// 将框夹紧到去除填充后的有效区域 `[pad, canvas - 1 - pad]`
pub(super) fn clamp_box(bbox: &BBox, letterbox: &Letterbox) -> BBox {
  let canvas = letterbox.canvas_size as i32;
  let (lo_x, hi_x) = (letterbox.pad_x, canvas - 1 - letterbox.pad_x);
  let (lo_y, hi_y) = (letterbox.pad_y, canvas - 1 - letterbox.pad_y);
  [
    bbox[0].clamp(lo_x, hi_x),
    bbox[1].clamp(lo_y, hi_y),
    bbox[2].clamp(lo_x, hi_x),
    bbox[3].clamp(lo_y, hi_y),
  ]
}

pub(super) fn apply(candidates: &mut [Candidate], letterbox: &Letterbox) {
  for (idx, cand) in candidates.iter_mut().enumerate() {
    if !cand.status.is_alive() {
      continue;
    }
    let clamped = clamp_box(&cand.bbox, letterbox);
    cand.bbox = clamped;
    if clamped[0] >= clamped[2] || clamped[1] >= clamped[3] {
      debug!("候选 {} 的框 {:?} 夹紧后退化", idx, clamped);
      cand.status = Status::Degenerate;
    }
  }
}
