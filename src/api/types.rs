// 该文件是 Panodet （街景探测） 项目的一部分。
// src/api/types.rs - API 数据结构
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

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// 单张图片的 STAC Item，未识别的字段原样保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
  pub id: String,
  /// 缺失或为 null 时视为没有位置
  #[serde(default)]
  pub geometry: Option<Geometry>,
  #[serde(default)]
  pub assets: BTreeMap<String, Asset>,
  #[serde(flatten)]
  pub other: Map<String, Value>,
}

impl Feature {
  /// 没有可用坐标时为空
  pub fn position(&self) -> &[f64] {
    self
      .geometry
      .as_ref()
      .map_or(&[][..], |geometry| geometry.coordinates.as_slice())
  }

  pub fn asset(&self, key: &str) -> Option<&Asset> {
    self.assets.get(key)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default, deserialize_with = "numeric_coordinates")]
  pub coordinates: Vec<f64>,
}

/// 坐标不是数字数组时按无坐标处理
fn numeric_coordinates<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
  let value = Value::deserialize(deserializer)?;
  let coordinates = match value {
    Value::Array(values) => values
      .iter()
      .map(Value::as_f64)
      .collect::<Option<Vec<f64>>>()
      .unwrap_or_default(),
    _ => Vec::new(),
  };
  Ok(coordinates)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
  pub href: String,
  #[serde(flatten)]
  pub other: Map<String, Value>,
}

impl Asset {
  /// 只接受绝对地址
  pub fn url(&self) -> Option<Url> {
    Url::parse(&self.href).ok()
  }
}

/// 图片序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub id: String,
  #[serde(flatten)]
  pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
  pub rel: String,
  pub href: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub media_type: Option<String>,
}

/// 列表接口的一页结果
///
/// 图片列表使用 `features`，序列列表使用 `collections`。
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
  #[serde(alias = "collections")]
  pub features: Vec<T>,
  #[serde(default)]
  pub links: Vec<Link>,
}

impl<T> Page<T> {
  /// 相对链接基于本页地址解析
  pub fn next_link(&self, base: &Url) -> Option<Url> {
    self
      .links
      .iter()
      .find(|link| link.rel == "next")
      .and_then(|link| base.join(&link.href).ok())
  }
}
