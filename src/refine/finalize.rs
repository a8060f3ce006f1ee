// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine/finalize.rs - 坐标映射回原图并栅格化掩码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::{debug, error};

use super::{Candidate, RefineError, Status};
use crate::{
  label::ClassTable,
  mask::MaskGrid,
  model::{Letterbox, RawDetection, RefinedDetection},
};

pub(super) fn apply(
  candidates: &mut [Candidate],
  detections: &[RawDetection],
  fused: &[Option<MaskGrid>],
  letterbox: &Letterbox,
  min_box_size: i32,
  classes: &ClassTable,
) -> Result<Vec<RefinedDetection>, RefineError> {
  let mut items = Vec::new();

  for (idx, cand) in candidates.iter_mut().enumerate() {
    if !cand.status.is_alive() {
      continue;
    }

    let mapped = letterbox.to_original(&cand.bbox);
    let width = (mapped[2] - mapped[0]).max(0);
    let height = (mapped[3] - mapped[1]).max(0);
    if (width + 1) + (height + 1) < min_box_size {
      debug!("候选 {} 映射后的框 {:?} 过小", idx, mapped);
      cand.status = Status::TooSmall;
      continue;
    }

    let label = classes.resolve(cand.class_id).ok_or_else(|| {
      error!("类别表中没有类别 {}", cand.class_id);
      RefineError::UnknownClass(cand.class_id)
    })?;

    let mask = fused[idx].as_ref().unwrap_or(&detections[idx].mask);
    let raster = mask.rasterize(&cand.bbox, width as u32, height as u32);

    items.push(RefinedDetection {
      bbox: mapped,
      mask: raster,
      score: cand.score,
      class_id: cand.class_id,
      label: label.to_string(),
    });
  }

  Ok(items)
}
