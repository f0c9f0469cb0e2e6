// 该文件是 Qiandao （签到） 项目的一部分。
// src/output/draw.rs - 检测结果标注绘制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::model::{DetectBatch, DetectBox};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("字体加载错误: {0}")]
  Font(#[from] ab_glyph::InvalidFont),
}

/// 检测框标注绘制。
/// 未配置字体时只画边框，不渲染标签文本。
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  box_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      box_color: BOX_COLOR,
    }
  }
}

impl Draw {
  pub fn new() -> Self {
    Self::default()
  }

  /// 从文件加载标签字体，启用文本渲染
  pub fn with_font_file(mut self, path: &std::path::Path) -> Result<Self, DrawError> {
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  pub fn draw_batch_on_image(&self, image: &mut RgbImage, batch: &DetectBatch) {
    for item in batch.items.iter() {
      self.draw_box_with_label(image, item);
    }
  }

  fn draw_box_with_label(&self, image: &mut RgbImage, item: &DetectBox) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let x_min = (item.bbox.left.floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox.top.floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox.right.ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox.bottom.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框加粗为 2 像素
    for thickness in 0..BOX_THICKNESS {
      let left = (x_min + thickness).min(w - 1);
      let top = (y_min + thickness).min(h - 1);
      let right = (x_max - thickness).max(0);
      let bottom = (y_max - thickness).max(0);
      if left >= right || top >= bottom {
        break;
      }

      let rect = Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", item.label, item.confidence);
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本

    // 估算文本大小（粗略估计）
    let text_width = (label.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 标签背景放在边框上方
    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(self.box_color));

      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}
