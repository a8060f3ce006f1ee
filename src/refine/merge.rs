// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine/merge.rs - 合并组的框并集与掩码融合
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use super::{Candidate, MergeGroups};
use crate::{
  mask::MaskGrid,
  model::{RawDetection, union_box},
};

/// 对每个非空合并组更新代表的框，并返回融合后的掩码（按下标，无组则为 `None`）。
///
/// 成员的贡献只限于成员自己（夹紧后）的框，写回画布上的相同位置。
pub(super) fn apply(
  candidates: &mut [Candidate],
  groups: &MergeGroups,
  detections: &[RawDetection],
) -> Vec<Option<MaskGrid>> {
  let mut fused = vec![None; candidates.len()];

  for (rep, members) in groups.representatives() {
    let mut bbox = candidates[rep].bbox;
    let mut mask = detections[rep].mask.clone();
    for &m in members {
      let member_box = candidates[m].bbox;
      bbox = union_box(&bbox, &member_box);
      mask.fuse_max_within(&detections[m].mask, &member_box);
    }
    debug!(
      "代表 {} 合并 {} 个成员，框 {:?} -> {:?}",
      rep,
      members.len(),
      candidates[rep].bbox,
      bbox
    );
    candidates[rep].bbox = bbox;
    fused[rep] = Some(mask);
  }

  fused
}
