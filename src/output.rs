// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::BatchFrame, model::RefineResult};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod log_output;
mod record;
pub use self::log_output::{LogOutput, LogOutputError};
pub use self::record::{RecordOutput, RecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("记录输出错误: {0}")]
  RecordOutputError(#[from] RecordOutputError),
  #[error("日志输出错误: {0}")]
  LogOutputError(#[from] LogOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Record(RecordOutput),
  Log(LogOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      RecordOutput::SCHEME => Ok(OutputWrapper::Record(RecordOutput::from_url(url)?)),
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<BatchFrame, RefineResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &BatchFrame, result: &RefineResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Record(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::Log(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
