// 该文件是 Qiandao （签到） 项目的一部分。
// src/model/decode.rs - 输出张量解码
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::{debug, warn};

use crate::frame::OutputTensor;
use crate::model::{BoundingBox, DetectBox, LabelTable};

/// 框坐标行数：中心 x、中心 y、宽、高
const BOX_ROWS: usize = 4;

/// 置信度硬下限，与配置阈值合并取较大者生效：
/// 有效阈值为 max(confidence_threshold, CONFIDENCE_FLOOR)，
/// 阈值配置得再低也不会低于此值。
pub const CONFIDENCE_FLOOR: f32 = 0.1;

/// 解码过滤参数
#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
  /// 置信度阈值
  pub confidence_threshold: f32,
  /// 最小框边长（像素），过滤退化的噪声框
  pub min_box_size: f32,
  /// 框边长与图像对应边长的最大比值，过滤异常大框
  pub max_box_ratio: f32,
}

impl Default for DecodeConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: 0.5,
      min_box_size: 50.0,
      max_box_ratio: 0.3,
    }
  }
}

/// 将模型输出张量解码为源图像像素坐标下的候选框。
///
/// 张量行数不足 4+C 时视为解码失败，返回空列表并告警，不中断调用方；
/// 单个槽位读取失败只跳过该槽位，批次内其余槽位继续。
pub fn decode(
  output: &OutputTensor,
  image_width: u32,
  image_height: u32,
  labels: &LabelTable,
  config: &DecodeConfig,
) -> Vec<DetectBox> {
  let classes = labels.len();
  if output.rows() < BOX_ROWS + classes {
    warn!(
      "输出张量行数无效: 期望至少 {}, 实际 {}",
      BOX_ROWS + classes,
      output.rows()
    );
    return Vec::new();
  }

  let width = image_width as f32;
  let height = image_height as f32;
  let threshold = config.confidence_threshold.max(CONFIDENCE_FLOOR);

  debug!("解码 {} 个候选槽位", output.slots());
  let mut items = Vec::new();

  for slot in 0..output.slots() {
    let Some((class_id, score, bbox)) =
      decode_slot(output, slot, classes, width, height, threshold, config)
    else {
      continue;
    };

    items.push(DetectBox {
      class_id,
      label: labels.resolve(class_id),
      confidence: score,
      bbox,
    });
  }

  debug!("解码得到 {} 个有效候选框", items.len());
  items
}

fn decode_slot(
  output: &OutputTensor,
  slot: usize,
  classes: usize,
  width: f32,
  height: f32,
  threshold: f32,
  config: &DecodeConfig,
) -> Option<(u32, f32, BoundingBox)> {
  // 严格大于比较，得分相同时取类别索引最小者
  let mut class_id = 0usize;
  let mut score = *output.row(BOX_ROWS)?.get(slot)?;
  for c in 1..classes {
    let s = *output.row(BOX_ROWS + c)?.get(slot)?;
    if s > score {
      score = s;
      class_id = c;
    }
  }

  if score < threshold {
    return None;
  }

  let center_x = *output.row(0)?.get(slot)? * width;
  let center_y = *output.row(1)?.get(slot)? * height;
  let box_width = *output.row(2)?.get(slot)? * width;
  let box_height = *output.row(3)?.get(slot)? * height;

  if center_x < 0.0 || center_y < 0.0 || box_width <= 0.0 || box_height <= 0.0 {
    return None;
  }
  if center_x > width || center_y > height {
    return None;
  }

  let bbox = BoundingBox {
    left: (center_x - box_width / 2.0).max(0.0),
    top: (center_y - box_height / 2.0).max(0.0),
    right: (center_x + box_width / 2.0).min(width),
    bottom: (center_y + box_height / 2.0).min(height),
  };

  // 尺寸过滤作用在裁剪后的框上
  if bbox.width() < config.min_box_size || bbox.height() < config.min_box_size {
    return None;
  }
  if bbox.width() > config.max_box_ratio * width || bbox.height() > config.max_box_ratio * height {
    return None;
  }

  Some((class_id as u32, score, bbox))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tensor(rows: Vec<Vec<f32>>) -> OutputTensor {
    let slots = rows[0].len();
    let count = rows.len();
    let data: Vec<f32> = rows.into_iter().flatten().collect();
    OutputTensor::new(data, count, slots)
  }

  fn labels() -> LabelTable {
    LabelTable::default()
  }

  #[test]
  fn decodes_single_candidate() {
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.1],
      vec![0.1],
      vec![0.9],
      vec![0.1],
      vec![0.1],
      vec![0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert_eq!(items.len(), 1);

    let item = &items[0];
    assert_eq!(item.class_id, 0);
    assert_eq!(item.label, "Date_of_Birth");
    assert!((item.confidence - 0.9).abs() < 1e-6);
    assert!((item.bbox.left - 288.0).abs() < 1e-3);
    assert!((item.bbox.top - 288.0).abs() < 1e-3);
    assert!((item.bbox.right - 352.0).abs() < 1e-3);
    assert!((item.bbox.bottom - 352.0).abs() < 1e-3);
  }

  #[test]
  fn tie_breaks_to_lowest_class_index() {
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.1],
      vec![0.1],
      vec![0.8],
      vec![0.8],
      vec![0.8],
      vec![0.8],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].class_id, 0);
  }

  #[test]
  fn rejects_below_confidence_threshold() {
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.1],
      vec![0.1],
      vec![0.49],
      vec![0.1],
      vec![0.1],
      vec![0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert!(items.is_empty());
  }

  #[test]
  fn effective_threshold_never_drops_below_floor() {
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.1],
      vec![0.1],
      vec![0.05],
      vec![0.0],
      vec![0.0],
      vec![0.0],
    ]);

    let config = DecodeConfig {
      confidence_threshold: 0.0,
      ..DecodeConfig::default()
    };
    let items = decode(&output, 640, 640, &labels(), &config);
    assert!(items.is_empty());
  }

  #[test]
  fn rejects_small_box_regardless_of_confidence() {
    // 30 像素宽，低于 50 像素下限
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![30.0 / 640.0],
      vec![0.2],
      vec![0.99],
      vec![0.1],
      vec![0.1],
      vec![0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert!(items.is_empty());
  }

  #[test]
  fn rejects_oversized_box() {
    // 0.5 × 640 = 320 像素，超过 0.3 × 640 = 192 的上限
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.5],
      vec![0.5],
      vec![0.9],
      vec![0.1],
      vec![0.1],
      vec![0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert!(items.is_empty());
  }

  #[test]
  fn rejects_out_of_bounds_center() {
    let output = tensor(vec![
      vec![1.05, -0.1],
      vec![0.5, 0.5],
      vec![0.1, 0.1],
      vec![0.1, 0.1],
      vec![0.9, 0.9],
      vec![0.1, 0.1],
      vec![0.1, 0.1],
      vec![0.1, 0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert!(items.is_empty());
  }

  #[test]
  fn rejects_non_positive_size() {
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.0],
      vec![0.1],
      vec![0.9],
      vec![0.1],
      vec![0.1],
      vec![0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert!(items.is_empty());
  }

  #[test]
  fn clamps_box_to_image_bounds() {
    // 中心靠近左边缘，框左侧会被裁剪到 0
    let output = tensor(vec![
      vec![0.07],
      vec![0.5],
      vec![0.2],
      vec![0.2],
      vec![0.9],
      vec![0.1],
      vec![0.1],
      vec![0.1],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].bbox.left, 0.0);
    assert!(items[0].bbox.right <= 640.0);
  }

  #[test]
  fn malformed_tensor_yields_empty() {
    // 4 类需要 8 行，这里只有 5 行
    let output = tensor(vec![
      vec![0.5],
      vec![0.5],
      vec![0.1],
      vec![0.1],
      vec![0.9],
    ]);

    let items = decode(&output, 640, 640, &labels(), &DecodeConfig::default());
    assert!(items.is_empty());
  }
}
