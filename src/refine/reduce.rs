// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine/reduce.rs - 基于框 IoU 与掩码重叠的冗余消除
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use super::{Candidate, MergeGroups, Status};
use crate::{
  config::RefineConfig,
  mask::{MaskGrid, inclusive_pixels},
  model::{BBox, RawDetection, union_box},
};

pub const EPSILON: f32 = 1e-6;

fn box_area(bbox: &BBox) -> i64 {
  (bbox[2] - bbox[0] + 1) as i64 * (bbox[3] - bbox[1] + 1) as i64
}

/// 两个框的 IoU，宽高按包含端点的像素数计算（`x2 - x1 + 1`）
pub fn box_iou(a: &BBox, b: &BBox) -> f32 {
  let inter_w = a[2].min(b[2]) - a[0].max(b[0]) + 1;
  let inter_h = a[3].min(b[3]) - a[1].max(b[1]) + 1;
  if inter_w <= 0 || inter_h <= 0 {
    return 0.0;
  }

  let inter = inter_w as i64 * inter_h as i64;
  let union = box_area(a) + box_area(b) - inter;
  inter as f32 / (union as f32 + EPSILON)
}

/// 两个二值化掩码在同一裁剪区域内的像素统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskOverlap {
  pub intersection: u32,
  pub area_a: u32,
  pub area_b: u32,
}

impl MaskOverlap {
  pub fn measure(a: &MaskGrid, b: &MaskGrid, region: &BBox) -> Self {
    let mut stats = MaskOverlap::default();
    for (x, y) in inclusive_pixels(*region) {
      let (bit_a, bit_b) = (a.bit(x, y), b.bit(x, y));
      stats.area_a += bit_a as u32;
      stats.area_b += bit_b as u32;
      stats.intersection += (bit_a & bit_b) as u32;
    }
    stats
  }

  pub fn iou(&self) -> f32 {
    let inter = self.intersection as f32;
    inter / (self.area_a as f32 + self.area_b as f32 - inter + EPSILON)
  }

  /// `a` 自身面积中被 `b` 覆盖的比例
  pub fn coverage_a(&self) -> f32 {
    self.intersection as f32 / (self.area_a as f32 + EPSILON)
  }

  pub fn coverage_b(&self) -> f32 {
    self.intersection as f32 / (self.area_b as f32 + EPSILON)
  }
}

fn should_merge(
  a: &Candidate,
  b: &Candidate,
  mask_a: &MaskGrid,
  mask_b: &MaskGrid,
  config: &RefineConfig,
) -> bool {
  let iou = box_iou(&a.bbox, &b.bbox);
  // 框不相交的一对永远不合并
  if iou <= 0.0 {
    return false;
  }

  let same_class = a.class_id == b.class_id;
  if iou <= config.box_iou_threshold && !same_class {
    return false;
  }

  let overlap = MaskOverlap::measure(mask_a, mask_b, &union_box(&a.bbox, &b.bbox));
  let by_iou = iou > config.box_iou_threshold && overlap.iou() > config.mask_iou_threshold;
  let by_coverage =
    same_class && overlap.coverage_a().max(overlap.coverage_b()) > config.overlap_threshold;

  if by_iou || by_coverage {
    debug!(
      "框 IoU {:.3}, 掩码 IoU {:.3}, 覆盖率 ({:.3}, {:.3}) -> 合并",
      iou,
      overlap.iou(),
      overlap.coverage_a(),
      overlap.coverage_b()
    );
  }
  by_iou || by_coverage
}

/// 按 (i, j), i < j 的顺序两两比较存活候选，返回合并组。
///
/// 分数更高者成为代表，分数相同时保留下标较小者。
/// 一旦 `i` 被吸收，本轮内不再拿 `i` 与后续候选比较。
pub(super) fn apply(
  candidates: &mut [Candidate],
  detections: &[RawDetection],
  config: &RefineConfig,
) -> MergeGroups {
  let n = candidates.len();
  let mut groups = MergeGroups::new(n);

  for i in 0..n {
    if !candidates[i].status.is_alive() {
      continue;
    }
    for j in (i + 1)..n {
      if !candidates[j].status.is_alive() {
        continue;
      }
      if !should_merge(
        &candidates[i],
        &candidates[j],
        &detections[i].mask,
        &detections[j].mask,
        config,
      ) {
        continue;
      }

      let (rep, absorbed) = if candidates[i].score >= candidates[j].score {
        (i, j)
      } else {
        (j, i)
      };
      debug!("候选 {} 吸收候选 {}", rep, absorbed);
      groups.absorb(rep, absorbed);
      candidates[absorbed].status = Status::Merged { into: rep };

      if absorbed == i {
        break;
      }
    }
  }

  // 链式吸收后成员已迁移到新代表，按最终归属刷新状态
  for (idx, cand) in candidates.iter_mut().enumerate() {
    if let Some(rep) = groups.owner(idx) {
      cand.status = Status::Merged { into: rep };
    }
  }

  groups
}
