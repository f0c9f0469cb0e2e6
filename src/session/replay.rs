// 该文件是 Qiandao （签到） 项目的一部分。
// src/session/replay.rs - 回放会话
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{InputTensor, OutputTensor},
  session::InferSession,
};

#[derive(Error, Debug)]
pub enum ReplaySessionError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("回放文件解析错误: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("回放张量形状无效: 行数 {rows}, 槽位 {slots}, 数据长度 {len}")]
  InvalidShape {
    rows: usize,
    slots: usize,
    len: usize,
  },
}

/// 回放会话：加载一份预先导出的模型输出张量，推理时原样返回。
/// 用于在没有推理引擎的环境下调试与压测后处理管线。
pub struct ReplaySession {
  output: OutputTensor,
}

impl FromUrlWithScheme for ReplaySession {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplaySession {
  type Error = ReplaySessionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplaySessionError::SchemeMismatch(format!(
        "期望方案 '{}', 实际方案 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Self::from_file(Path::new(url.path()))
  }
}

impl ReplaySession {
  /// 文件格式: {"rows": R, "slots": D, "data": [R*D 个浮点数]}
  pub fn from_file(path: &Path) -> Result<Self, ReplaySessionError> {
    info!("加载回放张量文件: {}", path.display());
    let raw = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;

    let rows = value["rows"].as_u64().unwrap_or(0) as usize;
    let slots = value["slots"].as_u64().unwrap_or(0) as usize;
    let data: Vec<f32> = value["data"]
      .as_array()
      .map(|array| {
        array
          .iter()
          .filter_map(|v| v.as_f64())
          .map(|v| v as f32)
          .collect()
      })
      .unwrap_or_default();

    if rows == 0 || slots == 0 || data.len() != rows * slots {
      return Err(ReplaySessionError::InvalidShape {
        rows,
        slots,
        len: data.len(),
      });
    }

    debug!("回放张量: {} 行 × {} 槽位", rows, slots);
    Ok(Self {
      output: OutputTensor::new(data, rows, slots),
    })
  }
}

impl InferSession for ReplaySession {
  type Error = ReplaySessionError;

  fn infer(&self, _input: &InputTensor) -> Result<OutputTensor, Self::Error> {
    Ok(self.output.clone())
  }
}
