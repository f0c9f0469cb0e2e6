// 该文件是 Qiandao （签到） 项目的一部分。
// src/frame.rs - 张量定义
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

use image::RgbImage;

const RGB_CHANNELS: usize = 3;

/// 模型输入张量，形状 [1, 3, S, S]。
/// 三个通道按平面连续存放（整块 R 平面之后是 G、B 平面），
/// 数值为 8 位通道值除以 255 得到的 [0, 1] 浮点数。
#[derive(Debug, Clone)]
pub struct InputTensor {
  data: Box<[f32]>,
  size: u32,
}

impl InputTensor {
  /// 将任意尺寸的 RGB 图像缩放到 S×S 并归一化为平面张量
  pub fn from_rgb(image: &RgbImage, size: u32) -> Self {
    let resized =
      image::imageops::resize(image, size, size, image::imageops::FilterType::Triangle);

    let plane = (size as usize) * (size as usize);
    let mut data = vec![0.0f32; RGB_CHANNELS * plane].into_boxed_slice();

    for (i, pixel) in resized.pixels().enumerate() {
      data[i] = pixel[0] as f32 / 255.0;
      data[plane + i] = pixel[1] as f32 / 255.0;
      data[2 * plane + i] = pixel[2] as f32 / 255.0;
    }

    Self { data, size }
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

/// 模型输出张量，形状 [1, R, D]。
/// 行 0..3 为归一化的中心 x、中心 y、宽、高，行 4.. 为各类别得分；
/// 数据按行连续存放在单块缓冲中，行内偏移即槽位索引。
#[derive(Debug, Clone)]
pub struct OutputTensor {
  data: Box<[f32]>,
  rows: usize,
  slots: usize,
}

impl OutputTensor {
  pub fn new(data: Vec<f32>, rows: usize, slots: usize) -> Self {
    if data.len() != rows * slots {
      panic!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        rows * slots,
        data.len()
      );
    }

    Self {
      data: data.into_boxed_slice(),
      rows,
      slots,
    }
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn slots(&self) -> usize {
    self.slots
  }

  /// 第 r 行的全部槽位，越界返回 None
  pub fn row(&self, r: usize) -> Option<&[f32]> {
    if r >= self.rows {
      return None;
    }
    let start = r * self.slots;
    self.data.get(start..start + self.slots)
  }
}
