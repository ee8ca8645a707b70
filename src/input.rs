// 该文件是 Panodet （街景探测） 项目的一部分。
// src/input.rs - 图片与 GeoJSON 输入
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

use std::{fs::File, io::BufReader, path::Path};

use image::RgbImage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiError, Feature, Fetch, Geometry};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图片 {id} 缺少资源 '{key}'")]
  MissingAsset { id: String, key: String },
  #[error("API 错误: {0}")]
  ApiError(#[from] ApiError),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("GeoJSON 解析错误: {0}")]
  GeoJsonError(#[from] serde_json::Error),
}

/// 已下载并解码的图片
pub struct Picture {
  pub id: String,
  /// 下载得到的原始字节
  pub raw: Vec<u8>,
  pub image: RgbImage,
}

impl Picture {
  pub fn decode(id: impl Into<String>, raw: Vec<u8>) -> Result<Self, InputError> {
    let image = image::load_from_memory(&raw)?.to_rgb8();
    Ok(Picture {
      id: id.into(),
      raw,
      image,
    })
  }

  /// 下载图片的指定资源，地址无效或服务端未返回 200 时得到 `None`
  pub fn fetch(
    fetch: &impl Fetch,
    feature: &Feature,
    asset_key: &str,
  ) -> Result<Option<Picture>, InputError> {
    let asset = feature
      .asset(asset_key)
      .ok_or_else(|| InputError::MissingAsset {
        id: feature.id.clone(),
        key: asset_key.to_string(),
      })?;
    let Some(href) = asset.url() else {
      warn!("图片 {} 的资源地址无效: {}, 跳过", feature.id, asset.href);
      return Ok(None);
    };

    let Some(raw) = fetch.get_bytes(&href)? else {
      warn!("图片 {} 下载失败, 跳过", feature.id);
      return Ok(None);
    };
    debug!("图片 {} 已下载: {} 字节", feature.id, raw.len());

    Picture::decode(feature.id.clone(), raw).map(Some)
  }
}

#[derive(Deserialize)]
struct PointFeature {
  #[serde(default)]
  geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct PointCollection {
  features: Vec<PointFeature>,
}

/// 读取 GeoJSON 要素集合中每个要素的 [经度, 纬度]
pub fn read_point_features(path: impl AsRef<Path>) -> Result<Vec<(f64, f64)>, InputError> {
  let file = File::open(path.as_ref())?;
  let collection: PointCollection = serde_json::from_reader(BufReader::new(file))?;

  let mut points = Vec::with_capacity(collection.features.len());
  for (index, feature) in collection.features.into_iter().enumerate() {
    let coordinates = feature
      .geometry
      .as_ref()
      .map_or(&[][..], |geometry| geometry.coordinates.as_slice());
    match coordinates {
      [lon, lat, ..] => points.push((*lon, *lat)),
      _ => warn!("第 {} 个要素没有坐标, 跳过", index),
    }
  }
  Ok(points)
}
