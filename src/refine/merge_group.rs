// 该文件是 Shanan （山南西风） 项目的一部分。
// src/refine/merge_group.rs - 合并组记录
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 以候选下标寻址的并查集。
///
/// 每个下标要么是代表（可能拥有若干成员），要么属于唯一一个代表的组。
/// 组很小，吸收时直接把被吸收者的成员整体迁移到新代表下，不做路径压缩。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeGroups {
  owner: Vec<Option<usize>>,
  members: Vec<Vec<usize>>,
}

impl MergeGroups {
  pub fn new(len: usize) -> Self {
    Self {
      owner: vec![None; len],
      members: vec![Vec::new(); len],
    }
  }

  /// `representative` 吸收 `absorbed` 以及 `absorbed` 已经吸收的全部成员
  pub fn absorb(&mut self, representative: usize, absorbed: usize) {
    debug_assert_ne!(representative, absorbed);
    debug_assert!(self.owner[representative].is_none());
    debug_assert!(self.owner[absorbed].is_none());

    let carried = std::mem::take(&mut self.members[absorbed]);
    self.owner[absorbed] = Some(representative);
    for &m in &carried {
      self.owner[m] = Some(representative);
    }
    let group = &mut self.members[representative];
    group.push(absorbed);
    group.extend(carried);
  }

  pub fn members(&self, representative: usize) -> &[usize] {
    &self.members[representative]
  }

  /// 被吸收下标所属的代表
  pub fn owner(&self, index: usize) -> Option<usize> {
    self.owner[index]
  }

  /// 所有非空的组，按代表下标升序
  pub fn representatives(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
    self
      .members
      .iter()
      .enumerate()
      .filter(|(_, group)| !group.is_empty())
      .map(|(rep, group)| (rep, group.as_slice()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absorb_records_member() {
    let mut groups = MergeGroups::new(3);
    groups.absorb(0, 2);
    assert_eq!(groups.members(0), &[2]);
    assert_eq!(groups.owner(2), Some(0));
    assert_eq!(groups.owner(0), None);
    assert_eq!(groups.representatives().count(), 1);
  }

  #[test]
  fn absorbing_a_representative_carries_its_group() {
    let mut groups = MergeGroups::new(4);
    groups.absorb(1, 2);
    groups.absorb(1, 3);
    groups.absorb(0, 1);

    assert_eq!(groups.members(0), &[1, 2, 3]);
    assert!(groups.members(1).is_empty());
    for idx in 1..4 {
      assert_eq!(groups.owner(idx), Some(0));
    }
    let reps: Vec<_> = groups.representatives().map(|(rep, _)| rep).collect();
    assert_eq!(reps, vec![0]);
  }

  #[test]
  fn groups_stay_disjoint() {
    let mut groups = MergeGroups::new(6);
    groups.absorb(0, 1);
    groups.absorb(2, 3);
    groups.absorb(5, 2);
    groups.absorb(4, 0);

    let mut seen = vec![0; 6];
    for (rep, members) in groups.representatives() {
      seen[rep] += 1;
      for &m in members {
        seen[m] += 1;
      }
    }
    assert!(seen.iter().all(|&count| count == 1));
  }
}
