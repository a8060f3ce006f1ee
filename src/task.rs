// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 批次处理任务
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

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{model::Refine, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  IE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Refine<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入批次"))??;
    info!("输入批次获取成功，开始后处理...");
    let now = Instant::now();
    let result = model.refine(&frame)?;
    info!("后处理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("输出完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对第一个批次重复执行后处理，用于测量耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  times: usize,
}

const REPEAT_TIMES: usize = 1000;
const WARMUP_TIMES: usize = 2;

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      times: REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  IE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Refine<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入批次"))??;
    info!("输入批次获取成功，开始后处理...");
    let mut times = Vec::with_capacity(self.times);
    let mut last = None;
    for i in 0..self.times {
      let now = Instant::now();
      let result = model.refine(&frame)?;
      let elapsed = now.elapsed();
      info!("({})后处理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    let measured = times.iter().skip(WARMUP_TIMES).collect::<Vec<_>>();
    if measured.is_empty() {
      warn!("重复次数不足 {}，不计算平均耗时", WARMUP_TIMES + 1);
    } else {
      warn!(
        "平均后处理时间: {:.2?}",
        measured.iter().copied().sum::<Duration>() / measured.len() as u32
      );
    }

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  IE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Result<F, IE>>,
  M: Refine<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    // 批次之间检查中断，单个批次内不可取消
    if let Err(e) = ctrlc::set_handler(move || {
      info!("收到中断信号，处理完当前批次后退出...");
      flag.store(true, Ordering::SeqCst);
    }) {
      warn!("无法注册中断处理: {}", e);
    }

    let mut frame_index = 0;
    let mut now = Instant::now();
    for frame in input {
      let frame = frame?;
      frame_index += 1;
      info!("处理第 {} 个批次", frame_index);
      let result = model.refine(&frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!("后处理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定批次数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupted.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 个批次", frame_index);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{cell::RefCell, convert::Infallible};

  struct Doubler;

  impl Refine for Doubler {
    type Input = u32;
    type Output = u32;
    type Error = Infallible;

    fn refine(&self, input: &u32) -> Result<u32, Infallible> {
      Ok(input * 2)
    }
  }

  fn frames(values: &[u32]) -> impl Iterator<Item = Result<u32, Infallible>> + use<> {
    values.to_vec().into_iter().map(Ok)
  }

  #[derive(Default)]
  struct Collect(RefCell<Vec<(u32, u32)>>);

  impl Render<u32, u32> for &Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &u32, result: &u32) -> Result<(), Infallible> {
      self.0.borrow_mut().push((*frame, *result));
      Ok(())
    }
  }

  #[test]
  fn one_shot_uses_first_frame() {
    let sink = Collect::default();
    OneShotTask.run_task(frames(&[3, 4]), Doubler, &sink).unwrap();
    assert_eq!(*sink.0.borrow(), vec![(3, 6)]);
  }

  #[test]
  fn one_shot_without_input_fails() {
    let sink = Collect::default();
    assert!(OneShotTask
      .run_task(frames(&[]), Doubler, &sink)
      .is_err());
  }

  #[test]
  fn repeat_shot_renders_once() {
    let sink = Collect::default();
    RepeatShotTask::default()
      .with_times(5)
      .run_task(frames(&[7]), Doubler, &sink)
      .unwrap();
    assert_eq!(*sink.0.borrow(), vec![(7, 14)]);
  }

  #[test]
  fn continuous_respects_frame_limit() {
    let sink = Collect::default();
    ContinuousTask::default()
      .with_frame_number(Some(2))
      .run_task(frames(&[1, 2, 3]), Doubler, &sink)
      .unwrap();
    assert_eq!(*sink.0.borrow(), vec![(1, 2), (2, 4)]);
  }

  #[test]
  fn continuous_stops_on_input_error() {
    let sink = Collect::default();
    let input = vec![
      Ok(1),
      Err(std::io::Error::other("损坏的批次")),
      Ok(3),
    ];
    let err = ContinuousTask::default()
      .run_task(input.into_iter(), Doubler, &sink)
      .unwrap_err();
    assert!(err.to_string().contains("损坏的批次"));
    assert_eq!(*sink.0.borrow(), vec![(1, 2)]);
  }

  #[test]
  fn one_shot_reports_input_error() {
    let sink = Collect::default();
    let input = vec![Err::<u32, _>(std::io::Error::other("损坏的批次"))];
    assert!(OneShotTask.run_task(input.into_iter(), Doubler, &sink).is_err());
    assert!(sink.0.borrow().is_empty());
  }
}
