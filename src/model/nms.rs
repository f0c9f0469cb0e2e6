// 该文件是 Qiandao （签到） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::debug;

use crate::model::DetectBox;

/// 重叠抑制的比较范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuppressionScope {
  /// 跨类别抑制：不同类别的框重叠同样互相抑制。
  /// 证件字段在版面上不会重叠，保留为默认行为。
  #[default]
  ClassAgnostic,
  /// 仅同类别之间抑制
  PerClass,
}

impl SuppressionScope {
  fn competes(&self, a: &DetectBox, b: &DetectBox) -> bool {
    match self {
      SuppressionScope::ClassAgnostic => true,
      SuppressionScope::PerClass => a.class_id == b.class_id,
    }
  }
}

/// 贪心非极大值抑制。
///
/// 按置信度稳定降序遍历（得分相同保持原相对顺序），与任一已接受框的
/// 交并比超过阈值即视为重复丢弃。输出保持置信度降序，两两交并比不超过
/// 阈值；对自身输出再次抑制得到相同结果。调用之间不保留任何状态。
pub fn suppress(
  mut items: Vec<DetectBox>,
  iou_threshold: f32,
  scope: SuppressionScope,
) -> Vec<DetectBox> {
  if items.is_empty() {
    return items;
  }

  items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut accepted: Vec<DetectBox> = Vec::with_capacity(items.len());
  for item in items {
    let duplicate = accepted
      .iter()
      .any(|kept| scope.competes(&item, kept) && item.bbox.iou(&kept.bbox) > iou_threshold);
    if !duplicate {
      accepted.push(item);
    }
  }

  debug!("抑制后保留 {} 个检测框", accepted.len());
  accepted
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  fn boxed(left: f32, top: f32, right: f32, bottom: f32) -> BoundingBox {
    BoundingBox {
      left,
      top,
      right,
      bottom,
    }
  }

  fn detect(class_id: u32, confidence: f32, bbox: BoundingBox) -> DetectBox {
    DetectBox {
      class_id,
      label: format!("Class_{}", class_id),
      confidence,
      bbox,
    }
  }

  #[test]
  fn iou_is_symmetric() {
    let a = boxed(0.0, 0.0, 100.0, 100.0);
    let b = boxed(50.0, 50.0, 150.0, 150.0);
    assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = boxed(0.0, 0.0, 100.0, 100.0);
    let b = boxed(200.0, 200.0, 300.0, 300.0);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn iou_of_identical_boxes_is_one() {
    let a = boxed(10.0, 20.0, 110.0, 220.0);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_of_degenerate_boxes_is_zero() {
    let a = boxed(10.0, 10.0, 10.0, 10.0);
    assert_eq!(a.iou(&a), 0.0);
  }

  #[test]
  fn keeps_highest_confidence_among_duplicates() {
    // 两框交并比恰为 0.5，超过 0.3 阈值
    let high = detect(0, 0.9, boxed(0.0, 0.0, 120.0, 100.0));
    let low = detect(0, 0.6, boxed(40.0, 0.0, 160.0, 100.0));
    assert!((high.bbox.iou(&low.bbox) - 0.5).abs() < 1e-6);

    let result = suppress(vec![low, high], 0.3, SuppressionScope::ClassAgnostic);
    assert_eq!(result.len(), 1);
    assert!((result[0].confidence - 0.9).abs() < 1e-6);
  }

  #[test]
  fn output_is_confidence_descending_subset() {
    let items = vec![
      detect(0, 0.3, boxed(0.0, 0.0, 60.0, 60.0)),
      detect(1, 0.8, boxed(200.0, 0.0, 260.0, 60.0)),
      detect(2, 0.5, boxed(0.0, 200.0, 60.0, 260.0)),
    ];

    let result = suppress(items, 0.3, SuppressionScope::ClassAgnostic);
    assert_eq!(result.len(), 3);
    for pair in result.windows(2) {
      assert!(pair[0].confidence >= pair[1].confidence);
    }
    for i in 0..result.len() {
      for j in (i + 1)..result.len() {
        assert!(result[i].bbox.iou(&result[j].bbox) <= 0.3);
      }
    }
  }

  #[test]
  fn suppression_is_idempotent() {
    let items = vec![
      detect(0, 0.9, boxed(0.0, 0.0, 120.0, 100.0)),
      detect(1, 0.6, boxed(40.0, 0.0, 160.0, 100.0)),
      detect(2, 0.5, boxed(300.0, 300.0, 400.0, 400.0)),
    ];

    let once = suppress(items, 0.3, SuppressionScope::ClassAgnostic);
    let twice = suppress(once.clone(), 0.3, SuppressionScope::ClassAgnostic);
    assert_eq!(once.len(), twice.len());
    for (a, b) in once.iter().zip(twice.iter()) {
      assert_eq!(a.class_id, b.class_id);
      assert_eq!(a.bbox, b.bbox);
    }
  }

  #[test]
  fn cross_class_overlap_suppressed_by_default() {
    let a = detect(0, 0.9, boxed(0.0, 0.0, 120.0, 100.0));
    let b = detect(1, 0.6, boxed(40.0, 0.0, 160.0, 100.0));

    let result = suppress(vec![a, b], 0.3, SuppressionScope::ClassAgnostic);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].class_id, 0);
  }

  #[test]
  fn per_class_scope_keeps_cross_class_overlap() {
    let a = detect(0, 0.9, boxed(0.0, 0.0, 120.0, 100.0));
    let b = detect(1, 0.6, boxed(40.0, 0.0, 160.0, 100.0));

    let result = suppress(vec![a, b], 0.3, SuppressionScope::PerClass);
    assert_eq!(result.len(), 2);
  }

  #[test]
  fn equal_confidence_keeps_input_order() {
    let first = detect(0, 0.7, boxed(0.0, 0.0, 60.0, 60.0));
    let second = detect(1, 0.7, boxed(200.0, 200.0, 260.0, 260.0));

    let result = suppress(
      vec![first.clone(), second.clone()],
      0.3,
      SuppressionScope::ClassAgnostic,
    );
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].class_id, first.class_id);
    assert_eq!(result[1].class_id, second.class_id);
  }
}
