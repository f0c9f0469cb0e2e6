// 该文件是 Qiandao （签到） 项目的一部分。
// src/output/directory_record.rs - 目录归档输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use thiserror::Error;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectBatch,
  output::{Render, draw::Draw},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按日期归档的扫描记录：标注图像加 JSON 侧车文件，
/// 供签到流程留存审计痕迹。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  frame_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    // always 参数表示空结果同样归档
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::new(),
      frame_counters: Arc::new(Mutex::new(0)),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counters.lock().unwrap();
    let id = *counter + 1;
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, std::io::Error> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn record_json(&self, batch: &DetectBatch) -> serde_json::Value {
    serde_json::json!({
      "image_width": batch.image_width,
      "image_height": batch.image_height,
      "inference_ms": batch.inference_time.as_millis() as u64,
      "detections": batch
        .items
        .iter()
        .map(|item| {
          serde_json::json!({
            "label": item.label,
            "class_id": item.class_id,
            "confidence": item.confidence,
            "bbox": [item.bbox.left, item.bbox.top, item.bbox.right, item.bbox.bottom],
          })
        })
        .collect::<Vec<_>>(),
    })
  }
}

impl Render<image::RgbImage, DetectBatch> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(
    &self,
    frame: &image::RgbImage,
    result: &DetectBatch,
  ) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.frame_path()?;
    let mut image = frame.clone();
    self.draw.draw_batch_on_image(&mut image, result);
    image.save(&path)?;

    let record = self.record_json(result);
    std::fs::write(path.with_extension("json"), record.to_string())?;

    Ok(())
  }
}
