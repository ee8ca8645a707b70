// 该文件是 Panodet （街景探测） 项目的一部分。
// src/api/endpoint.rs - API 地址构造
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

use tracing::error;
use url::Url;

use crate::{FromUrl, api::ApiError, bbox::BoundingBox};

/// 搜索接口的匹配距离范围（米）
const SEARCH_PLACE_DISTANCE: &str = "2-10";

#[derive(Debug, Clone)]
pub struct PanoramaxApi {
  base: Url,
}

impl FromUrl for PanoramaxApi {
  type Error = ApiError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "http" | "https" if !url.cannot_be_a_base() => Ok(PanoramaxApi { base: url.clone() }),
      scheme => {
        error!("API 地址必须使用 http 或 https 方案, 实际为 '{}'", scheme);
        Err(ApiError::InvalidBase(url.to_string()))
      }
    }
  }
}

impl PanoramaxApi {
  fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = self.base.clone();
    url.set_query(None);
    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidBase(self.base.to_string()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// `GET {api}/collections?bbox=...&limit=N`
  pub fn collections(&self, bbox: &BoundingBox, limit: usize) -> Result<Url, ApiError> {
    let mut url = self.endpoint(&["collections"])?;
    url
      .query_pairs_mut()
      .append_pair("bbox", &bbox.to_string())
      .append_pair("limit", &limit.to_string());
    Ok(url)
  }

  /// `GET {api}/collections/{id}/items?limit=N`
  pub fn collection_items(&self, collection_id: &str, limit: usize) -> Result<Url, ApiError> {
    let mut url = self.endpoint(&["collections", collection_id, "items"])?;
    url
      .query_pairs_mut()
      .append_pair("limit", &limit.to_string());
    Ok(url)
  }

  /// `GET {api}/search?place_distance=2-10&place_position=lon,lat`
  pub fn search_near(&self, lon: f64, lat: f64) -> Result<Url, ApiError> {
    let mut url = self.endpoint(&["search"])?;
    url
      .query_pairs_mut()
      .append_pair("place_distance", SEARCH_PLACE_DISTANCE)
      .append_pair("place_position", &format!("{},{}", lon, lat));
    Ok(url)
  }
}
