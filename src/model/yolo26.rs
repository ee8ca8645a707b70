// 该文件是 Panodet （街景探测） 项目的一部分。
// src/model/yolo26.rs - YOLO26 RKNN 检测模型
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

use rknpu::{Context, InitFlags, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{AsNhwcFrame, RgbNhwcFrame},
  model::{DetectFilter, DetectItem, DetectResult, Model},
};

const YOLO26_NUM_INPUTS: u32 = 1;
const YOLO26_NUM_OUTPUTS: u32 = 6;
const YOLO26_CLASS_NUM: usize = 80;
const YOLO26_INPUT_W: f32 = 640.0;
const YOLO26_INPUT_H: f32 = 640.0;
const YOLO26_HEAD_SIZES: [(usize, usize); 3] = [(80, 80), (40, 40), (20, 20)];
const YOLO26_STRIDES: [f32; 3] = [8.0, 16.0, 32.0];
const YOLO26_OBJECT_THRESH: f32 = 0.5;

/// 模型输入帧
pub type Yolo26Input = RgbNhwcFrame<640, 640>;

pub struct Yolo26<Frame = Yolo26Input> {
  context: Context,
  filter: DetectFilter,
  threshold: f32,
  _phantom: std::marker::PhantomData<Frame>,
}

#[derive(Error, Debug)]
pub enum Yolo26Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型参数错误: {0}={1}")]
  ParameterError(String, String),
}

impl Yolo26Error {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    Yolo26Error::ModelInvalid(msg.to_string(), e)
  }
}

pub struct Yolo26Builder {
  model_path: String,
  flags: InitFlags,
  filter: DetectFilter,
  threshold: f32,
}

impl FromUrlWithScheme for Yolo26Builder {
  const SCHEME: &'static str = "yolo26";
}

/// `yolo26:///path/model.rknn?class=0&max_det=1&threshold=0.5`
impl FromUrl for Yolo26Builder {
  type Error = Yolo26Error;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolo26Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut filter = DetectFilter::default();
    let mut threshold = YOLO26_OBJECT_THRESH;
    for (k, v) in url.query_pairs() {
      let invalid = || Yolo26Error::ParameterError(k.to_string(), v.to_string());
      match &*k {
        "class" => filter.classes.push(v.parse().map_err(|_| invalid())?),
        "max_det" => filter.max_det = v.parse().map_err(|_| invalid())?,
        "threshold" => threshold = v.parse().map_err(|_| invalid())?,
        _ => debug!("忽略未知模型参数: {}={}", k, v),
      }
    }

    Ok(Yolo26Builder {
      model_path: url.path().to_string(),
      flags: InitFlags::default(),
      filter,
      threshold,
    })
  }
}

impl Yolo26Builder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build<Frame>(self) -> Result<Yolo26<Frame>, Yolo26Error> {
    info!("加载模型文件: {}", self.model_path);
    let mode_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      mode_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&mode_data, self.flags)?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| Yolo26Error::invalid("无法获取输出数量", e))?;

    if num_inputs != YOLO26_NUM_INPUTS || num_outputs != YOLO26_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        YOLO26_NUM_INPUTS, YOLO26_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(Yolo26Error::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!(
      "模型加载完成, 类别筛选: {:?}, 最大检测数: {}, 阈值: {}",
      self.filter.classes, self.filter.max_det, self.threshold
    );

    Ok(Yolo26 {
      context,
      filter: self.filter,
      threshold: self.threshold,
      _phantom: std::marker::PhantomData,
    })
  }
}

/// 根据张量大小匹配回归和分类输出
fn match_reg_cls_tensors<'a>(
  tensor1: &'a [f32],
  tensor2: &'a [f32],
  reg_expected: usize,
  cls_expected: usize,
) -> Option<(&'a [f32], &'a [f32])> {
  if tensor1.len() == reg_expected && tensor2.len() == cls_expected {
    Some((tensor1, tensor2))
  } else if tensor1.len() == cls_expected && tensor2.len() == reg_expected {
    Some((tensor2, tensor1))
  } else {
    None
  }
}

impl<Frame: AsNhwcFrame> Model for Yolo26<Frame> {
  type Input = Frame;
  type Output = DetectResult;
  type Error = Yolo26Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.context.set_input(
      0,
      input.as_nhwc(),
      rknpu::TensorFormat::NHWC,
      TensorType::UInt8,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    let result = self.postprocess(output);
    Ok(self.filter.apply(result))
  }
}

impl<Frame> Yolo26<Frame> {
  fn postprocess(&self, output: rknpu::Output) -> DetectResult {
    let mut items = Vec::new();

    for (head_idx, (&(map_h, map_w), stride)) in
      YOLO26_HEAD_SIZES.iter().zip(YOLO26_STRIDES).enumerate()
    {
      let spatial = map_h * map_w;
      let reg_expected = 4 * spatial;
      let cls_expected = YOLO26_CLASS_NUM * spatial;

      // RKNN 输出顺序不固定，依据张量大小区分回归与分类
      let output_idx1 = head_idx * 2;
      let output_idx2 = head_idx * 2 + 1;

      let tensor1 = match output.get_f32(output_idx1) {
        Ok(data) => data,
        Err(e) => {
          error!("获取第 {} 个输出失败: {}", output_idx1, e);
          continue;
        }
      };

      let tensor2 = match output.get_f32(output_idx2) {
        Ok(data) => data,
        Err(e) => {
          error!("获取第 {} 个输出失败: {}", output_idx2, e);
          continue;
        }
      };

      let Some((reg, cls)) = match_reg_cls_tensors(tensor1, tensor2, reg_expected, cls_expected)
      else {
        error!(
          "检测头 {}: 输出大小不匹配 - 张量1: {}, 张量2: {}, 期望回归: {}, 期望分类: {}",
          head_idx,
          tensor1.len(),
          tensor2.len(),
          reg_expected,
          cls_expected
        );
        continue;
      };

      items.extend(decode_head(reg, cls, (map_h, map_w), stride, self.threshold));
    }

    debug!("检测到 {} 个物体", items.len());
    DetectResult::from(items)
  }
}

/// 解码单个检测头，回归与分类张量均为通道优先排列
fn decode_head(
  reg: &[f32],
  cls: &[f32],
  (map_h, map_w): (usize, usize),
  stride: f32,
  threshold: f32,
) -> Vec<DetectItem> {
  let spatial = map_h * map_w;
  let mut items = Vec::new();

  for idx in 0..spatial {
    let (class_id, max_logit) = (0..YOLO26_CLASS_NUM)
      .map(|c| (c, cls[c * spatial + idx]))
      .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
    let score = sigmoid(max_logit);
    if score <= threshold {
      continue;
    }

    let grid_x = (idx % map_w) as f32 + 0.5;
    let grid_y = (idx / map_w) as f32 + 0.5;
    let xmin = ((grid_x - reg[idx]) * stride).clamp(0.0, YOLO26_INPUT_W);
    let ymin = ((grid_y - reg[spatial + idx]) * stride).clamp(0.0, YOLO26_INPUT_H);
    let xmax = ((grid_x + reg[2 * spatial + idx]) * stride).clamp(0.0, YOLO26_INPUT_W);
    let ymax = ((grid_y + reg[3 * spatial + idx]) * stride).clamp(0.0, YOLO26_INPUT_H);

    if xmin < xmax && ymin < ymax {
      items.push(DetectItem {
        class_id: class_id as u32,
        score,
        bbox: [
          xmin / YOLO26_INPUT_W,
          ymin / YOLO26_INPUT_H,
          xmax / YOLO26_INPUT_W,
          ymax / YOLO26_INPUT_H,
        ],
      });
    }
  }
  items
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_reads_query_parameters() {
    let url = Url::parse("yolo26:///opt/models/hydrant.rknn?class=0&class=3&max_det=2&threshold=0.25")
      .unwrap();
    let builder = Yolo26Builder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, "/opt/models/hydrant.rknn");
    assert_eq!(builder.filter.classes, vec![0, 3]);
    assert_eq!(builder.filter.max_det, 2);
    assert_eq!(builder.threshold, 0.25);
  }

  #[test]
  fn builder_rejects_bad_input() {
    let url = Url::parse("file:///opt/models/hydrant.rknn").unwrap();
    assert!(matches!(
      Yolo26Builder::from_url(&url),
      Err(Yolo26Error::ModelPathError(_))
    ));

    let url = Url::parse("yolo26:///m.rknn?max_det=many").unwrap();
    assert!(matches!(
      Yolo26Builder::from_url(&url),
      Err(Yolo26Error::ParameterError(k, _)) if k == "max_det"
    ));
  }

  /// 2x2 网格，只有 (h=1, w=0) 处的类别 3 超过阈值
  fn synthetic_head() -> (Vec<f32>, Vec<f32>) {
    let spatial = 4;
    let mut reg = vec![0.5f32; 4 * spatial];
    let idx = 2;
    reg[idx] = 0.5;
    reg[spatial + idx] = 1.0;
    reg[2 * spatial + idx] = 1.5;
    reg[3 * spatial + idx] = 0.5;

    let mut cls = vec![-10.0f32; YOLO26_CLASS_NUM * spatial];
    cls[3 * spatial + idx] = 4.0;
    cls[5 * spatial + idx] = 1.0;
    cls[7 * spatial + 1] = -0.1;
    (reg, cls)
  }

  #[test]
  fn head_decodes_best_class_and_box() {
    let (reg, cls) = synthetic_head();
    let items = decode_head(&reg, &cls, (2, 2), 32.0, 0.5);
    assert_eq!(items.len(), 1);

    let item = &items[0];
    assert_eq!(item.class_id, 3);
    assert!((item.score - sigmoid(4.0)).abs() < 1e-6);
    // 网格中心 (0.5, 1.5)，步长 32
    let expected = [0.0, 16.0, 64.0, 64.0].map(|v: f32| v / 640.0);
    for (got, want) in item.bbox.iter().zip(expected) {
      assert!((got - want).abs() < 1e-6, "{:?}", item.bbox);
    }
  }

  #[test]
  fn head_respects_threshold() {
    let (reg, cls) = synthetic_head();
    assert!(decode_head(&reg, &cls, (2, 2), 32.0, 0.99).is_empty());
    // sigmoid(-0.1) 约为 0.475
    let items = decode_head(&reg, &cls, (2, 2), 32.0, 0.45);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].class_id, 7);
  }

  #[test]
  fn tensors_match_by_size() {
    let reg = [0.0f32; 4];
    let cls = [0.0f32; 80];
    assert!(match_reg_cls_tensors(&reg, &cls, 4, 80).is_some());
    let (r, c) = match_reg_cls_tensors(&cls, &reg, 4, 80).unwrap();
    assert_eq!((r.len(), c.len()), (4, 80));
    assert!(match_reg_cls_tensors(&reg, &reg, 4, 80).is_none());
  }
}
