// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine.rs - 实例分割检测结果后处理流水线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! 流水线严格按顺序执行五个阶段：阈值过滤、框规范化、冗余消除、合并、输出映射。
//! 每个候选携带一个 [`Status`]，各阶段只处理仍为 [`Status::Alive`] 的候选。

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  config::RefineConfig,
  input::BatchFrame,
  label::ClassTable,
  model::{BBox, RawBatch, Refine, RefineResult},
};

mod finalize;
mod merge;
mod merge_group;
mod normalize;
mod reduce;
mod threshold;

pub use self::merge_group::MergeGroups;
pub use self::reduce::{EPSILON, MaskOverlap, box_iou};

#[derive(Error, Debug)]
pub enum RefineError {
  #[error("输出数组长度不一致: boxes={boxes}, scores={scores}, labels={labels}, masks={masks}")]
  LengthMismatch {
    boxes: usize,
    scores: usize,
    labels: usize,
    masks: usize,
  },
  #[error("第 {index} 个掩码尺寸为 {width}x{height}, 与画布 {canvas}x{canvas} 不符")]
  MaskShape {
    index: usize,
    width: usize,
    height: usize,
    canvas: usize,
  },
  #[error("掩码数据长度错误: 期望 {expected}, 实际 {actual}")]
  MaskDataLength { expected: usize, actual: usize },
  #[error("掩码第 {row} 行长度为 {actual}, 期望 {expected}")]
  RaggedMask {
    row: usize,
    expected: usize,
    actual: usize,
  },
  #[error("画布 {canvas_size} 无法容纳填充 ({pad_x}, {pad_y})")]
  InvalidLetterbox {
    canvas_size: usize,
    pad_x: i32,
    pad_y: i32,
  },
  #[error("未知类别: {0}")]
  UnknownClass(u32),
}

/// 候选在流水线中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Alive,
  BelowThreshold,
  Degenerate,
  Merged { into: usize },
  TooSmall,
}

impl Status {
  pub fn is_alive(&self) -> bool {
    matches!(self, Status::Alive)
  }
}

/// 流水线工作状态，掩码仍留在批次中按下标访问
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: u32,
  pub status: Status,
}

impl Candidate {
  pub fn from_batch(batch: &RawBatch) -> Vec<Candidate> {
    batch
      .detections
      .iter()
      .map(|det| Candidate {
        bbox: det.bbox,
        score: det.score,
        class_id: det.class_id,
        status: Status::Alive,
      })
      .collect()
  }
}

fn count_alive(candidates: &[Candidate]) -> usize {
  candidates.iter().filter(|c| c.status.is_alive()).count()
}

#[derive(Debug, Clone, Default)]
pub struct Refiner {
  config: RefineConfig,
  classes: ClassTable,
}

impl Refiner {
  pub fn new(config: RefineConfig, classes: ClassTable) -> Self {
    Self { config, classes }
  }

  pub fn config(&self) -> &RefineConfig {
    &self.config
  }

  pub fn classes(&self) -> &ClassTable {
    &self.classes
  }

  /// 对一个批次执行完整流水线
  pub fn refine_batch(&self, batch: &RawBatch) -> Result<RefineResult, RefineError> {
    batch.validate()?;
    let now = std::time::Instant::now();
    let mut candidates = Candidate::from_batch(batch);
    debug!("候选数量: {}", candidates.len());

    threshold::apply(&mut candidates, &self.config.thresholds);
    debug!("阈值过滤后剩余: {}", count_alive(&candidates));

    normalize::apply(&mut candidates, &batch.letterbox);
    debug!("框规范化后剩余: {}", count_alive(&candidates));

    let groups = reduce::apply(&mut candidates, &batch.detections, &self.config);
    debug!(
      "冗余消除后剩余: {}, 合并组: {}",
      count_alive(&candidates),
      groups.representatives().count()
    );

    let fused = merge::apply(&mut candidates, &groups, &batch.detections);

    let items = finalize::apply(
      &mut candidates,
      &batch.detections,
      &fused,
      &batch.letterbox,
      self.config.min_box_size,
      &self.classes,
    )?;

    info!(
      "后处理完成: {} -> {} 个目标，耗时: {:.2?}",
      batch.len(),
      items.len(),
      now.elapsed()
    );

    Ok(RefineResult {
      items: items.into_boxed_slice(),
    })
  }
}

impl Refine for Refiner {
  type Input = BatchFrame;
  type Output = RefineResult;
  type Error = RefineError;

  fn refine(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("处理批次: {}", input.name);
    self.refine_batch(&input.batch)
  }
}
