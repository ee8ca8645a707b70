// 该文件是 Panodet （街景探测） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 一次推理一批输入，结果顺序与输入顺序一致
  fn infer_batch(&self, inputs: &[Self::Input]) -> Result<Vec<Self::Output>, Self::Error> {
    inputs.iter().map(|input| self.infer(input)).collect()
  }
}

impl<M: Model + ?Sized> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }

  fn infer_batch(&self, inputs: &[Self::Input]) -> Result<Vec<Self::Output>, Self::Error> {
    (**self).infer_batch(inputs)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

/// 检测结果筛选：类别白名单与最大检测数
#[derive(Debug, Clone, PartialEq)]
pub struct DetectFilter {
  /// 为空表示保留所有类别
  pub classes: Vec<u32>,
  pub max_det: usize,
}

impl Default for DetectFilter {
  fn default() -> Self {
    DetectFilter {
      classes: Vec::new(),
      max_det: 1,
    }
  }
}

impl DetectFilter {
  /// 按得分从高到低保留至多 `max_det` 个目标
  pub fn apply(&self, result: DetectResult) -> DetectResult {
    let mut items: Vec<DetectItem> = result
      .items
      .into_vec()
      .into_iter()
      .filter(|item| self.classes.is_empty() || self.classes.contains(&item.class_id))
      .collect();
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items.truncate(self.max_det);
    DetectResult::from(items)
  }
}

#[cfg(feature = "model_yolo26")]
mod yolo26;
#[cfg(feature = "model_yolo26")]
pub use self::yolo26::{Yolo26, Yolo26Builder, Yolo26Error, Yolo26Input};

#[cfg(test)]
mod tests {
  use super::*;

  fn item(class_id: u32, score: f32) -> DetectItem {
    DetectItem {
      class_id,
      score,
      bbox: [0.1, 0.1, 0.2, 0.2],
    }
  }

  #[test]
  fn filter_keeps_best_of_selected_classes() {
    let result = DetectResult::from(vec![item(0, 0.6), item(2, 0.9), item(0, 0.8), item(1, 0.7)]);
    let filter = DetectFilter {
      classes: vec![0],
      max_det: 1,
    };
    assert_eq!(filter.apply(result).items.as_ref(), &[item(0, 0.8)]);
  }

  #[test]
  fn empty_class_list_keeps_everything() {
    let result = DetectResult::from(vec![item(3, 0.6), item(1, 0.9)]);
    let filter = DetectFilter {
      classes: vec![],
      max_det: 10,
    };
    let kept = filter.apply(result);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept.items[0], item(1, 0.9));
  }

  #[test]
  fn unmatched_classes_give_empty_result() {
    let result = DetectResult::from(vec![item(3, 0.6)]);
    assert!(DetectFilter::default().apply(result.clone()).len() == 1);
    let filter = DetectFilter {
      classes: vec![0],
      max_det: 1,
    };
    assert!(filter.apply(result).is_empty());
  }

  struct Doubler;

  impl Model for Doubler {
    type Input = u32;
    type Output = u32;
    type Error = ();

    fn infer(&self, input: &u32) -> Result<u32, ()> {
      Ok(input * 2)
    }
  }

  #[test]
  fn default_batch_keeps_order() {
    assert_eq!(Doubler.infer_batch(&[3, 1, 2]), Ok(vec![6, 2, 4]));
  }
}
