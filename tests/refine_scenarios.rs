// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/refine_scenarios.rs - 后处理流水线场景测试
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

use shanan_refine::{
  config::{RefineConfig, ThresholdTable},
  label::ClassTable,
  mask::{MASK_FOREGROUND, MaskGrid},
  model::{BBox, Letterbox, RawBatch},
  refine::{RefineError, Refiner, box_iou},
};

const CANVAS: usize = 64;

fn identity() -> Letterbox {
  Letterbox {
    canvas_size: CANVAS,
    pad_x: 0,
    pad_y: 0,
    original_width: CANVAS as u32,
    original_height: CANVAS as u32,
  }
}

fn filled_mask(bbox: &BBox) -> MaskGrid {
  let mut mask = MaskGrid::zeros(CANVAS, CANVAS);
  mask.fill_box(bbox, 1.0);
  mask
}

/// (box, score, class)，掩码为框内全前景
fn batch(letterbox: Letterbox, items: &[(BBox, f32, u32)]) -> RawBatch {
  RawBatch::from_parts(
    letterbox,
    items.iter().map(|i| i.0).collect(),
    items.iter().map(|i| i.1).collect(),
    items.iter().map(|i| i.2).collect(),
    items.iter().map(|i| filled_mask(&i.0)).collect(),
  )
  .unwrap()
}

fn refiner(config: RefineConfig) -> Refiner {
  Refiner::new(config, ClassTable::coco())
}

#[test]
fn duplicate_pair_merges_into_union_box() {
  let config = RefineConfig::default();
  assert_eq!(config.box_iou_threshold, 0.7);
  assert_eq!(config.mask_iou_threshold, 0.7);

  let a = [10, 10, 50, 50];
  let b = [12, 12, 52, 52];
  assert!(box_iou(&a, &b) > 0.8);

  // 两个候选使用同一张掩码
  let shared = {
    let mut mask = MaskGrid::zeros(CANVAS, CANVAS);
    mask.fill_box(&[10, 10, 52, 52], 1.0);
    mask
  };
  let batch = RawBatch::from_parts(
    identity(),
    vec![a, b],
    vec![0.9, 0.8],
    vec![0, 0],
    vec![shared.clone(), shared],
  )
  .unwrap();

  let result = refiner(config).refine_batch(&batch).unwrap();
  assert_eq!(result.len(), 1);
  let item = &result.items[0];
  assert_eq!(item.bbox, [10, 10, 52, 52]);
  assert_eq!(item.score, 0.9);
  assert_eq!(item.label, "person");
  assert_eq!(item.mask.dimensions(), (42, 42));
  assert!(item.mask.pixels().all(|p| p.0[0] == MASK_FOREGROUND));
}

#[test]
fn disjoint_boxes_never_merge() {
  // 掩码互相覆盖对方的框，但两个框不相交
  let a = [5, 5, 20, 20];
  let b = [30, 30, 50, 50];
  let mut mask = MaskGrid::zeros(CANVAS, CANVAS);
  mask.fill_box(&[0, 0, 63, 63], 1.0);
  let batch = RawBatch::from_parts(
    identity(),
    vec![a, b],
    vec![0.9, 0.8],
    vec![0, 0],
    vec![mask.clone(), mask],
  )
  .unwrap();

  let result = refiner(RefineConfig::default())
    .refine_batch(&batch)
    .unwrap();
  assert_eq!(result.len(), 2);
}

#[test]
fn tiny_mapped_box_is_dropped() {
  let batch = batch(
    identity(),
    &[([10, 10, 11, 11], 0.9, 0), ([30, 30, 50, 50], 0.9, 0)],
  );
  let config = RefineConfig::default().with_min_box_size(20);
  let result = refiner(config).refine_batch(&batch).unwrap();
  assert_eq!(result.len(), 1);
  assert_eq!(result.items[0].bbox, [30, 30, 50, 50]);
}

#[test]
fn person_override_applies_only_to_class_zero() {
  let batch = batch(
    identity(),
    &[([2, 2, 20, 20], 0.26, 0), ([30, 30, 50, 50], 0.26, 1)],
  );
  let config = RefineConfig::default()
    .with_thresholds(ThresholdTable::new(0.3).with_override(0, 0.25));
  let result = refiner(config).refine_batch(&batch).unwrap();
  assert_eq!(result.len(), 1);
  assert_eq!(result.items[0].label, "person");
}

#[test]
fn empty_batch_gives_empty_result() {
  let batch = RawBatch::from_parts(identity(), vec![], vec![], vec![], vec![]).unwrap();
  let result = refiner(RefineConfig::default())
    .refine_batch(&batch)
    .unwrap();
  assert!(result.is_empty());
}

#[test]
fn merged_box_is_minimal_cover_of_group() {
  // 0 与 1 按框/掩码 IoU 合并，2 作为同类被遮挡目标并入
  let batch = batch(
    identity(),
    &[
      ([10, 10, 40, 40], 0.9, 0),
      ([12, 11, 42, 41], 0.6, 0),
      ([9, 20, 16, 30], 0.5, 0),
    ],
  );
  let config = RefineConfig::default().with_min_box_size(0);
  let result = refiner(config).refine_batch(&batch).unwrap();
  assert_eq!(result.len(), 1);
  assert_eq!(result.items[0].bbox, [9, 10, 42, 41]);
}

#[test]
fn letterbox_padding_is_removed_from_output() {
  let letterbox = Letterbox {
    canvas_size: CANVAS,
    pad_x: 0,
    pad_y: 16,
    original_width: 128,
    original_height: 64,
  };
  // 框伸入上下填充区，会被夹紧到 [16, 47]
  let batch = batch(letterbox, &[([0, 4, 32, 60], 0.9, 2)]);
  let result = refiner(RefineConfig::default())
    .refine_batch(&batch)
    .unwrap();

  assert_eq!(result.len(), 1);
  let item = &result.items[0];
  assert_eq!(item.bbox, [0, 0, 64, 62]);
  assert_eq!(item.mask.dimensions(), (64, 62));
  assert_eq!(item.label, "car");
}

#[test]
fn unknown_class_propagates() {
  let batch = batch(identity(), &[([2, 2, 30, 30], 0.9, 3)]);
  let refiner = Refiner::new(
    RefineConfig::default(),
    ClassTable::from_names(["person", "bicycle"]),
  );
  assert!(matches!(
    refiner.refine_batch(&batch),
    Err(RefineError::UnknownClass(3))
  ));
}

#[test]
fn unknown_class_is_fine_when_filtered_out() {
  let batch = batch(identity(), &[([2, 2, 30, 30], 0.1, 3)]);
  let refiner = Refiner::new(
    RefineConfig::default(),
    ClassTable::from_names(["person", "bicycle"]),
  );
  assert!(refiner.refine_batch(&batch).unwrap().is_empty());
}
