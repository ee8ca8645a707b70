// 该文件是 Panodet （街景探测） 项目的一部分。
// src/frame.rs - NHWC 帧定义
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

use image::{RgbImage, imageops::FilterType};

const RGB_CHANNELS: usize = 3;

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

/// 固定尺寸的 RGB NHWC 帧，作为模型输入
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame<const W: u32, const H: u32> {
  data: Box<[u8]>,
}

impl<const W: u32, const H: u32> Default for RgbNhwcFrame<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0u8; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> RgbNhwcFrame<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

/// 任意尺寸的图片缩放到帧尺寸，归一化坐标保持不变
impl<const W: u32, const H: u32> From<&RgbImage> for RgbNhwcFrame<W, H> {
  fn from(image: &RgbImage) -> Self {
    let resized = if image.dimensions() == (W, H) {
      image.clone()
    } else {
      image::imageops::resize(image, W, H, FilterType::Triangle)
    };

    // RgbImage 的内存布局即为 HWC
    Self {
      data: resized.into_raw().into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsNhwcFrame for RgbNhwcFrame<W, H> {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn resizes_into_hwc_layout() {
    let image = RgbImage::from_pixel(32, 16, Rgb([10, 20, 30]));
    let frame: RgbNhwcFrame<8, 4> = RgbNhwcFrame::from(&image);

    assert_eq!(frame.as_nhwc().len(), 8 * 4 * 3);
    assert_eq!(&frame.as_nhwc()[..6], &[10, 20, 30, 10, 20, 30]);
    assert_eq!(frame.width(), 8);
    assert_eq!(frame.height(), 4);
  }

  #[test]
  fn default_is_black() {
    let frame = RgbNhwcFrame::<2, 2>::default();
    assert!(frame.as_nhwc().iter().all(|&v| v == 0));
    assert_eq!(frame.channels(), 3);
  }
}
