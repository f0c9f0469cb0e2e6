// 该文件是 Qiandao （签到） 项目的一部分。
// src/model/yolo11.rs - 证件字段检测器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::frame::InputTensor;
use crate::model::{DecodeConfig, DetectBatch, LabelTable, Model, SuppressionScope};
use crate::session::InferSession;

/// 模型输入边长
const YOLO11_INPUT_SIZE: u32 = 640;
/// NMS 交并比阈值默认值
const YOLO11_IOU_THRESH: f32 = 0.3;

#[derive(Error, Debug)]
pub enum Yolo11Error {
  /// 会话初始化失败后检测器保持不可用。
  /// 调用方借此区分「没有检测器」与「运行了但没有检测到」。
  #[error("检测器不可用: 推理会话未初始化")]
  Unavailable,
  #[error("推理失败: {0}")]
  Infer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 证件字段检测器。
///
/// 构造后只读：类别表与会话句柄在初始化时固定，detect 以 &self 调用，
/// 不写任何共享状态。底层会话允许并发推理时可跨线程共享，否则由调用方
/// 串行化（应用侧的做法是每次拍摄一个后台工作线程）。close 消费自身，
/// 依靠所有权保证不会与进行中的 detect 竞争。
pub struct Yolo11<S> {
  session: Option<S>,
  labels: LabelTable,
  decode_config: DecodeConfig,
  iou_threshold: f32,
  scope: SuppressionScope,
  input_size: u32,
}

pub struct Yolo11Builder {
  labels: LabelTable,
  decode_config: DecodeConfig,
  iou_threshold: f32,
  scope: SuppressionScope,
  input_size: u32,
}

impl Default for Yolo11Builder {
  fn default() -> Self {
    Self {
      labels: LabelTable::default(),
      decode_config: DecodeConfig::default(),
      iou_threshold: YOLO11_IOU_THRESH,
      scope: SuppressionScope::default(),
      input_size: YOLO11_INPUT_SIZE,
    }
  }
}

impl Yolo11Builder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.decode_config.confidence_threshold = threshold;
    self
  }

  pub fn min_box_size(mut self, size: f32) -> Self {
    self.decode_config.min_box_size = size;
    self
  }

  pub fn max_box_ratio(mut self, ratio: f32) -> Self {
    self.decode_config.max_box_ratio = ratio;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn scope(mut self, scope: SuppressionScope) -> Self {
    self.scope = scope;
    self
  }

  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  /// 用会话初始化结果构建检测器。
  /// 初始化失败只记录错误，得到的检测器保持不可用：detect 返回
  /// Unavailable，而不是让调用方整帧失败。
  pub fn build_with<S, E>(self, session: Result<S, E>) -> Yolo11<S>
  where
    S: InferSession,
    E: std::fmt::Display,
  {
    let session = match session {
      Ok(session) => {
        info!("推理会话初始化完成, 类别数: {}", self.labels.len());
        Some(session)
      }
      Err(e) => {
        error!("推理会话初始化失败: {}", e);
        None
      }
    };

    Yolo11 {
      session,
      labels: self.labels,
      decode_config: self.decode_config,
      iou_threshold: self.iou_threshold,
      scope: self.scope,
      input_size: self.input_size,
    }
  }
}

impl<S: InferSession> Yolo11<S> {
  pub fn is_available(&self) -> bool {
    self.session.is_some()
  }

  /// 单帧检测：预处理 → 推理 → 解码 → 抑制。
  /// 解码失败产生空批次而不是错误；推理失败按本帧错误返回，
  /// 调用方可以继续使用原始照片。
  pub fn detect(&self, image: &RgbImage) -> Result<DetectBatch, Yolo11Error> {
    let session = self.session.as_ref().ok_or(Yolo11Error::Unavailable)?;

    let start = Instant::now();

    debug!(
      "预处理图像 {}x{} -> {}x{}",
      image.width(),
      image.height(),
      self.input_size,
      self.input_size
    );
    let input = InputTensor::from_rgb(image, self.input_size);

    debug!("执行模型推理");
    let output = session
      .infer(&input)
      .map_err(|e| Yolo11Error::Infer(Box::new(e)))?;

    debug!("后处理模型输出");
    let candidates = super::decode::decode(
      &output,
      image.width(),
      image.height(),
      &self.labels,
      &self.decode_config,
    );
    let items = super::nms::suppress(candidates, self.iou_threshold, self.scope);

    let inference_time = start.elapsed();
    debug!("检测到 {} 个字段, 耗时 {:.2?}", items.len(), inference_time);

    Ok(DetectBatch {
      items: items.into_boxed_slice(),
      inference_time,
      image_width: image.width(),
      image_height: image.height(),
    })
  }

  /// 释放推理会话，之后检测器不再可用。
  /// 不调用时会话资源在 Drop 时释放。
  pub fn close(mut self) {
    if self.session.take().is_some() {
      info!("推理会话已释放");
    }
  }
}

impl<S: InferSession> Model for Yolo11<S> {
  type Input = RgbImage;
  type Output = DetectBatch;
  type Error = Yolo11Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect(input)
  }
}
