// 该文件是 Qiandao （签到） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧检测
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
  model::{LabelTable, SuppressionScope, Yolo11Builder},
  output::OutputWrapper,
  session::ReplaySession,
  task::{OneShotTask, Task},
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

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS 交并比阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 仅在同类别之间做重叠抑制
  #[arg(long)]
  pub per_class: bool,
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

  let scope = if args.per_class {
    SuppressionScope::PerClass
  } else {
    SuppressionScope::ClassAgnostic
  };

  let session = ReplaySession::from_url(&args.model);
  let model = Yolo11Builder::new()
    .labels(labels)
    .confidence_threshold(args.confidence)
    .iou_threshold(args.nms_threshold)
    .scope(scope)
    .build_with(session);

  let input = ImageFileInput::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, model, output)?;

  Ok(())
}
