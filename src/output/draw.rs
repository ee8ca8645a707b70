// 该文件是 Panodet （街景探测） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::model::{DetectItem, DetectResult};

const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const BOX_THICKNESS: u32 = 2;

pub struct Draw {
  color: Rgb<u8>,
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: Rgb(BOX_COLOR),
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  /// bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[f32; 4]) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;

    let x_min = ((bbox[0] * w).floor() as i32).clamp(0, max_x);
    let y_min = ((bbox[1] * h).floor() as i32).clamp(0, max_y);
    let x_max = ((bbox[2] * w).ceil() as i32).clamp(0, max_x);
    let y_max = ((bbox[3] * h).ceil() as i32).clamp(0, max_y);

    for t in 0..self.thickness as i32 {
      let width = x_max - x_min + 1 - 2 * t;
      let height = y_max - y_min + 1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, self.color);
    }
  }

  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectResult) {
    if image.width() == 0 || image.height() == 0 {
      return;
    }
    for DetectItem { bbox, .. } in result.items.iter() {
      self.draw_bbox(image, bbox);
    }
  }
}
