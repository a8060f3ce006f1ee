// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::{
  config::{
    DEFAULT_BOX_IOU_THRESHOLD, DEFAULT_COMMON_THRESHOLD, DEFAULT_MASK_IOU_THRESHOLD,
    DEFAULT_MIN_BOX_SIZE, DEFAULT_OVERLAP_THRESHOLD, DEFAULT_PERSON_THRESHOLD, PERSON_CLASS_ID,
    RefineConfig, ThresholdTable, parse_class_threshold,
  },
  label::{ClassTable, ClassTableError},
  refine::Refiner,
};

/// 后处理参数，供各个可执行程序共用
#[derive(Args, Debug, Clone)]
pub struct RefineArgs {
  /// 类别名称文件，每行一个类别；缺省使用 COCO 80 类
  #[arg(long, value_name = "FILE")]
  pub classes: Option<PathBuf>,

  /// 通用置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_COMMON_THRESHOLD, value_name = "THRESHOLD")]
  pub common_threshold: f32,

  /// 按类别覆盖的阈值，格式为 类别=阈值，可重复；缺省为 0=0.25
  #[arg(long = "class-threshold", value_name = "CLASS=THRESHOLD", value_parser = parse_class_threshold)]
  pub class_thresholds: Vec<(u32, f32)>,

  /// 框 IoU 合并阈值
  #[arg(long, default_value_t = DEFAULT_BOX_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub box_iou: f32,

  /// 掩码 IoU 合并阈值
  #[arg(long, default_value_t = DEFAULT_MASK_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub mask_iou: f32,

  /// 同类别掩码覆盖率合并阈值
  #[arg(long, default_value_t = DEFAULT_OVERLAP_THRESHOLD, value_name = "THRESHOLD")]
  pub overlap: f32,

  /// 映射后 (宽 + 1) + (高 + 1) 的最小值
  #[arg(long, default_value_t = DEFAULT_MIN_BOX_SIZE, value_name = "PIXELS")]
  pub min_box_size: i32,
}

impl RefineArgs {
  pub fn config(&self) -> RefineConfig {
    let overrides = if self.class_thresholds.is_empty() {
      vec![(PERSON_CLASS_ID, DEFAULT_PERSON_THRESHOLD)]
    } else {
      self.class_thresholds.clone()
    };
    let thresholds = overrides
      .into_iter()
      .fold(ThresholdTable::new(self.common_threshold), |table, (class, thr)| {
        table.with_override(class, thr)
      });

    RefineConfig {
      thresholds,
      box_iou_threshold: self.box_iou,
      mask_iou_threshold: self.mask_iou,
      overlap_threshold: self.overlap,
      min_box_size: self.min_box_size,
    }
  }

  pub fn class_table(&self) -> Result<ClassTable, ClassTableError> {
    match &self.classes {
      Some(path) => ClassTable::from_file(path),
      None => Ok(ClassTable::coco()),
    }
  }

  pub fn build_refiner(&self) -> Result<Refiner, ClassTableError> {
    let refiner = Refiner::new(self.config(), self.class_table()?);
    let config = refiner.config();
    info!("通用阈值: {}", config.thresholds.common());
    for (class, thr) in config.thresholds.overrides() {
      info!("类别 {} 阈值: {}", class, thr);
    }
    info!(
      "框 IoU: {}, 掩码 IoU: {}, 覆盖率: {}, 最小框: {}",
      config.box_iou_threshold,
      config.mask_iou_threshold,
      config.overlap_threshold,
      config.min_box_size
    );
    info!("类别数: {}", refiner.classes().len());
    Ok(refiner)
  }
}
