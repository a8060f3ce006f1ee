// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine/threshold.rs - 置信度阈值过滤
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use super::{Candidate, Status};
use crate::config::ThresholdTable;

pub(super) fn apply(candidates: &mut [Candidate], thresholds: &ThresholdTable) {
  for (idx, cand) in candidates.iter_mut().enumerate() {
    if !cand.status.is_alive() {
      continue;
    }
    let threshold = thresholds.effective(cand.class_id);
    if cand.score < threshold {
      debug!(
        "候选 {} (类别 {}) 置信度 {:.3} 低于阈值 {:.3}",
        idx, cand.class_id, cand.score, threshold
      );
      cand.status = Status::BelowThreshold;
    }
  }
}
