// 该文件是 Panodet （街景探测） 项目的一部分。
// src/bin/predict_pano.rs - 搜索区域内的街景目标检测
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use panodet::{
  FromUrl,
  api::{HttpFetcher, PanoramaxApi},
  bbox::BoundingBox,
  dispatch::ChunkedDispatcher,
  model::{Yolo26, Yolo26Builder},
  output::PictureDirectory,
  task::{DetectTask, Task},
};
use tracing::info;

/// 在 Panoramax 图片中检测目标并导出为 GeoJSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// Panoramax API 地址
  #[arg(long, default_value = "https://api.panoramax.xyz/api", value_name = "API")]
  pub api: Url,
  /// 搜索区域 (min X, min Y, max X, max Y)
  #[arg(
    long,
    default_value = "2.25256,48.96895,2.26447,48.97247",
    value_name = "BBOX"
  )]
  pub bbox: BoundingBox,
  /// RKNN 模型路径，例如 yolo26:///models/best.rknn?class=0&max_det=1
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 检测结果 GeoJSON 输出路径
  #[arg(long, default_value = "./detected_features.geojson", value_name = "FILE")]
  pub output_geojson: PathBuf,
  /// 检测结果图片输出目录
  #[arg(long, default_value = "folder:detected_features_pictures", value_name = "OUTPUT")]
  pub output_pictures: Url,
  /// 每次同时检测的图片数量
  #[arg(long, default_value = "10", value_name = "COUNT")]
  pub chunk_size: usize,
  /// 列表接口每页数量
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub page_limit: usize,
  /// 用于检测的图片资源
  #[arg(long, default_value = "sd", value_name = "ASSET")]
  pub asset: String,
  /// 目标名称（仅用于显示）
  #[arg(long, default_value = "Hydrant", value_name = "NAME")]
  pub object_name: String,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("API 地址: {}", args.api);
  info!("搜索区域: {}", args.bbox);
  info!("模型文件路径: {}", args.model);
  info!("输出路径: {} / {}", args.output_geojson.display(), args.output_pictures);

  let api = PanoramaxApi::from_url(&args.api)?;
  let model: Yolo26 = Yolo26Builder::from_url(&args.model)?.build()?;
  let output = PictureDirectory::from_url(&args.output_pictures)?;
  let fetcher = HttpFetcher::new()?;

  let matched = DetectTask::new(api, args.bbox, model)
    .with_dispatcher(ChunkedDispatcher::new(args.chunk_size)?)
    .with_page_limit(args.page_limit)?
    .with_asset_key(args.asset)
    .with_object_name(args.object_name)
    .run_task(&fetcher, output)?;

  matched.write_to(&args.output_geojson)?;
  info!("完成!");

  Ok(())
}
