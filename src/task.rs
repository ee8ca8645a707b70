// 该文件是 Panodet （街景探测） 项目的一部分。
// src/task.rs - 任务流程
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

use std::path::PathBuf;

use image::RgbImage;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  api::{ApiError, Asset, Collection, Feature, Fetch, Page, Pages, PanoramaxApi, fetch_page},
  bbox::BoundingBox,
  dispatch::ChunkedDispatcher,
  input::Picture,
  model::{DetectResult, Model},
  output::{FeatureCollection, PictureDirectory, Render},
};

const DEFAULT_PAGE_LIMIT: usize = 100;
const DEFAULT_ASSET_KEY: &str = "sd";

pub trait Task<F, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, fetch: &F, output: O) -> Result<Self::Output, Self::Error>;
}

/// 遍历包围盒内的序列，对其中的图片分块检测
pub struct DetectTask<M> {
  api: PanoramaxApi,
  bbox: BoundingBox,
  model: M,
  dispatcher: ChunkedDispatcher,
  page_limit: usize,
  asset_key: String,
  object_name: String,
}

impl<M> DetectTask<M> {
  pub fn new(api: PanoramaxApi, bbox: BoundingBox, model: M) -> Self {
    DetectTask {
      api,
      bbox,
      model,
      dispatcher: ChunkedDispatcher::default(),
      page_limit: DEFAULT_PAGE_LIMIT,
      asset_key: DEFAULT_ASSET_KEY.to_string(),
      object_name: "Object".to_string(),
    }
  }

  pub fn with_dispatcher(mut self, dispatcher: ChunkedDispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  pub fn with_page_limit(mut self, page_limit: usize) -> Result<Self, ApiError> {
    if page_limit == 0 {
      return Err(ApiError::ZeroPageLimit);
    }
    self.page_limit = page_limit;
    Ok(self)
  }

  pub fn with_asset_key(mut self, asset_key: impl Into<String>) -> Self {
    self.asset_key = asset_key.into();
    self
  }

  pub fn with_object_name(mut self, object_name: impl Into<String>) -> Self {
    self.object_name = object_name.into();
    self
  }

  /// 逐页获取序列中的图片，只保留位于包围盒内的
  fn pictures_in_bbox<F: Fetch>(
    &self,
    fetch: &F,
    collection: &Collection,
  ) -> Result<Vec<Feature>, ApiError> {
    let first = self.api.collection_items(&collection.id, self.page_limit)?;
    let mut inside = Vec::new();
    for page in Pages::<_, Feature>::new(fetch, first, self.page_limit) {
      inside.extend(
        page?
          .into_iter()
          .filter(|feature| self.bbox.contains_position(feature.position())),
      );
    }
    Ok(inside)
  }
}

impl<M> DetectTask<M>
where
  M: Model<Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
  for<'a> M::Input: From<&'a RgbImage>,
{
  /// 下载一个分块的图片并一次性推理，结果与分块中的位置一一对应
  fn detect_chunk<F: Fetch>(
    &self,
    fetch: &F,
    chunk: &[Feature],
  ) -> anyhow::Result<Vec<Option<(Picture, DetectResult)>>> {
    let mut pictures = Vec::with_capacity(chunk.len());
    for feature in chunk {
      pictures.push(Picture::fetch(fetch, feature, &self.asset_key)?);
    }

    let frames: Vec<M::Input> = pictures
      .iter()
      .flatten()
      .map(|picture| From::from(&picture.image))
      .collect();
    let mut results = self.model.infer_batch(&frames)?.into_iter();

    let mut paired = Vec::with_capacity(pictures.len());
    for picture in pictures {
      match picture {
        Some(picture) => {
          let result = results
            .next()
            .ok_or_else(|| anyhow::anyhow!("检测结果数量少于图片数量"))?;
          paired.push(Some((picture, result)));
        }
        None => paired.push(None),
      }
    }
    Ok(paired)
  }

  fn process_collection<F: Fetch>(
    &self,
    fetch: &F,
    output: &PictureDirectory,
    collection: &Collection,
    matched: &mut FeatureCollection,
  ) -> anyhow::Result<()> {
    let pictures = self.pictures_in_bbox(fetch, collection)?;
    if pictures.is_empty() {
      info!("跳过序列 {}, 搜索区域内没有图片", collection.id);
      return Ok(());
    }

    info!("在 {} 张图片中检测目标...", pictures.len());
    self.dispatcher.dispatch::<_, _, anyhow::Error, _, _>(
      &pictures,
      |chunk| self.detect_chunk(fetch, chunk),
      |_, feature, detected| {
        if let Some((picture, result)) = detected
          && !result.is_empty()
        {
          info!("在图片 {} 中发现 {}", feature.id, self.object_name);
          output.render_result(&picture, &result)?;
          matched.push(feature.clone());
        }
        Ok(())
      },
    )
  }
}

impl<F, M> Task<F, PictureDirectory> for DetectTask<M>
where
  F: Fetch,
  M: Model<Output = DetectResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
  for<'a> M::Input: From<&'a RgbImage>,
{
  type Output = FeatureCollection;
  type Error = anyhow::Error;

  fn run_task(self, fetch: &F, output: PictureDirectory) -> Result<Self::Output, Self::Error> {
    info!("开始检测任务, 搜索区域: {}", self.bbox);
    output.recreate()?;

    let mut matched = FeatureCollection::default();
    let first = self.api.collections(&self.bbox, self.page_limit)?;
    for page in Pages::<_, Collection>::new(fetch, first, self.page_limit) {
      for collection in page? {
        info!("查找序列 {} 中的图片", collection.id);
        if let Err(e) = self.process_collection(fetch, &output, &collection, &mut matched) {
          error!("处理序列 {} 失败: {:#}", collection.id, e);
        }
      }
    }

    info!("任务完成, 共 {} 张图片包含 {}", matched.len(), self.object_name);
    Ok(matched)
  }
}

/// 为每个点位查找最接近的图片并下载，用于准备训练数据
pub struct CollectTask {
  api: PanoramaxApi,
  points: Vec<(f64, f64)>,
  wanted: usize,
  asset_key: String,
}

impl CollectTask {
  pub fn new(api: PanoramaxApi, points: Vec<(f64, f64)>, wanted: usize) -> Self {
    CollectTask {
      api,
      points,
      wanted,
      asset_key: DEFAULT_ASSET_KEY.to_string(),
    }
  }

  pub fn with_asset_key(mut self, asset_key: impl Into<String>) -> Self {
    self.asset_key = asset_key.into();
    self
  }

  /// 搜索接口的第一个结果即最佳匹配
  fn best_matches<F: Fetch>(&self, fetch: &F) -> Result<Vec<(String, Url)>, ApiError> {
    let mut matches = Vec::new();
    for &(lon, lat) in &self.points {
      if matches.len() >= self.wanted {
        break;
      }
      let url = self.api.search_near(lon, lat)?;
      let page: Page<Feature> = fetch_page(fetch, &url)?;
      let Some(best) = page.features.into_iter().next() else {
        continue;
      };
      match best.asset(&self.asset_key).and_then(Asset::url) {
        Some(href) => {
          info!("匹配 @ [{}, {}]: {}", lon, lat, best.id);
          matches.push((best.id.clone(), href));
        }
        None => warn!("图片 {} 缺少可用的资源 '{}', 跳过", best.id, self.asset_key),
      }
    }
    Ok(matches)
  }
}

impl<F: Fetch> Task<F, PictureDirectory> for CollectTask {
  type Output = Vec<PathBuf>;
  type Error = anyhow::Error;

  fn run_task(self, fetch: &F, output: PictureDirectory) -> Result<Self::Output, Self::Error> {
    info!("为 {} 个点位查找图片...", self.points.len());
    let matches = self.best_matches(fetch)?;
    info!("找到 {} 张图片", matches.len());

    output.recreate()?;
    let mut saved = Vec::with_capacity(matches.len());
    for (id, href) in matches {
      info!("下载 {}", href);
      match fetch.get_bytes(&href)? {
        Some(bytes) => {
          let path = output.picture_path(&id);
          output.save_raw(&path, &bytes)?;
          saved.push(path);
        }
        None => warn!("图片 {} 下载失败, 跳过", id),
      }
    }
    Ok(saved)
  }
}
