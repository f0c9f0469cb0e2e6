// 该文件是 Qiandao （签到） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 后处理延迟压测
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use qiandao::{
  FromUrl,
  input::ImageFileInput,
  model::{LabelTable, Yolo11Builder},
  output::OutputWrapper,
  session::ReplaySession,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Qiandao 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理会话来源（回放张量文件，如 replay:///path/output.json）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 类别元数据文件路径，缺省使用内置证件字段类别表
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 输入来源（如 image:///path/card.jpg）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径（image:///path/out.png 或 folder:///path/records）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("会话来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = match &args.labels {
    Some(path) => LabelTable::load(path),
    None => LabelTable::default(),
  };

  let session = ReplaySession::from_url(&args.model);
  let model = Yolo11Builder::new().labels(labels).build_with(session);

  let input = ImageFileInput::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask.run_task(input, model, output)?;

  Ok(())
}
