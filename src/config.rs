// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 后处理阈值配置
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

use std::collections::BTreeMap;

pub const DEFAULT_COMMON_THRESHOLD: f32 = 0.3;
pub const PERSON_CLASS_ID: u32 = 0;
pub const DEFAULT_PERSON_THRESHOLD: f32 = 0.25;
pub const DEFAULT_BOX_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MASK_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.8;
pub const DEFAULT_MIN_BOX_SIZE: i32 = 20; // (w + 1) + (h + 1) 的下限

/// 通用置信度阈值以及按类别覆盖的阈值
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
  common: f32,
  overrides: BTreeMap<u32, f32>,
}

impl ThresholdTable {
  pub fn new(common: f32) -> Self {
    Self {
      common,
      overrides: BTreeMap::new(),
    }
  }

  pub fn with_override(mut self, class_id: u32, threshold: f32) -> Self {
    self.overrides.insert(class_id, threshold);
    self
  }

  pub fn common(&self) -> f32 {
    self.common
  }

  pub fn overrides(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
    self.overrides.iter().map(|(&k, &v)| (k, v))
  }

  pub fn effective(&self, class_id: u32) -> f32 {
    self
      .overrides
      .get(&class_id)
      .copied()
      .unwrap_or(self.common)
  }
}

impl Default for ThresholdTable {
  fn default() -> Self {
    ThresholdTable::new(DEFAULT_COMMON_THRESHOLD)
      .with_override(PERSON_CLASS_ID, DEFAULT_PERSON_THRESHOLD)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefineConfig {
  pub thresholds: ThresholdTable,
  pub box_iou_threshold: f32,
  pub mask_iou_threshold: f32,
  pub overlap_threshold: f32,
  pub min_box_size: i32,
}

impl Default for RefineConfig {
  fn default() -> Self {
    Self {
      thresholds: ThresholdTable::default(),
      box_iou_threshold: DEFAULT_BOX_IOU_THRESHOLD,
      mask_iou_threshold: DEFAULT_MASK_IOU_THRESHOLD,
      overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
      min_box_size: DEFAULT_MIN_BOX_SIZE,
    }
  }
}

impl RefineConfig {
  pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
    self.thresholds = thresholds;
    self
  }

  pub fn with_min_box_size(mut self, min_box_size: i32) -> Self {
    self.min_box_size = min_box_size;
    self
  }
}

/// 解析命令行中的 `类别=阈值`，例如 `0=0.25`
pub fn parse_class_threshold(s: &str) -> Result<(u32, f32), String> {
  let (class, threshold) = s
    .split_once('=')
    .ok_or_else(|| format!("格式应为 类别=阈值, 实际为 '{}'", s))?;
  let class = class
    .trim()
    .parse::<u32>()
    .map_err(|e| format!("无效的类别 '{}': {}", class, e))?;
  let threshold = threshold
    .trim()
    .parse::<f32>()
    .map_err(|e| format!("无效的阈值 '{}': {}", threshold, e))?;
  Ok((class, threshold))
}
