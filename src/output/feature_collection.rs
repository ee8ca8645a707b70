// 该文件是 Panodet （街景探测） 项目的一部分。
// src/output/feature_collection.rs - GeoJSON 结果汇总
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

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

use serde::Serialize;
use tracing::info;

use crate::{api::Feature, output::OutputError};

/// 按匹配顺序累积的要素集合，运行结束时一次性写出
#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
  #[serde(rename = "type")]
  kind: &'static str,
  features: Vec<Feature>,
}

impl Default for FeatureCollection {
  fn default() -> Self {
    FeatureCollection {
      kind: "FeatureCollection",
      features: Vec::new(),
    }
  }
}

impl FeatureCollection {
  pub fn push(&mut self, feature: Feature) {
    self.features.push(feature);
  }

  pub fn features(&self) -> &[Feature] {
    &self.features
  }

  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    info!("导出 {} 个要素到 GeoJSON: {}", self.len(), path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, self)?;
    writer.flush()?;
    Ok(())
  }
}

impl Extend<Feature> for FeatureCollection {
  fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
    self.features.extend(iter);
  }
}
