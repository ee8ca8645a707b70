// 该文件是 Panodet （街景探测） 项目的一部分。
// src/bin/find_pics.rs - 按点位收集训练图片
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
  input::read_point_features,
  output::PictureDirectory,
  task::{CollectTask, Task},
};
use tracing::info;

/// 为 GeoJSON 中的每个点位下载最接近的 Panoramax 图片
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// Panoramax API 地址
  #[arg(long, default_value = "https://panoramax.ign.fr/api", value_name = "API")]
  pub api: Url,
  /// 点位 GeoJSON 文件
  #[arg(long, default_value = "./osm_hydrants_lyon.geojson", value_name = "FILE")]
  pub input: PathBuf,
  /// 需要的图片数量
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub wanted: usize,
  /// 图片保存目录
  #[arg(long, default_value = "folder:training_pictures", value_name = "OUTPUT")]
  pub output: Url,
  /// 下载的图片资源
  #[arg(long, default_value = "sd", value_name = "ASSET")]
  pub asset: String,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("读取点位文件: {}", args.input.display());
  let points = read_point_features(&args.input)?;
  info!("共 {} 个点位", points.len());

  let api = PanoramaxApi::from_url(&args.api)?;
  let output = PictureDirectory::from_url(&args.output)?;
  let fetcher = HttpFetcher::new()?;

  let saved = CollectTask::new(api, points, args.wanted)
    .with_asset_key(args.asset)
    .run_task(&fetcher, output)?;

  info!("完成! 已保存 {} 张图片", saved.len());

  Ok(())
}
