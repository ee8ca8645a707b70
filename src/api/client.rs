// 该文件是 Panodet （街景探测） 项目的一部分。
// src/api/client.rs - HTTP 客户端
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

use reqwest::{StatusCode, blocking::Client};
use tracing::{debug, warn};
use url::Url;

use crate::api::{ApiError, Fetch};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
  client: Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self, ApiError> {
    let client = Client::builder().user_agent(USER_AGENT).build()?;
    Ok(HttpFetcher { client })
  }
}

fn decode_json(url: &Url, body: &[u8]) -> Result<serde_json::Value, ApiError> {
  serde_json::from_slice(body).map_err(|source| ApiError::DecodeError {
    url: url.to_string(),
    source,
  })
}

impl Fetch for HttpFetcher {
  fn get_json(&self, url: &Url) -> Result<serde_json::Value, ApiError> {
    debug!("GET {}", url);
    let response = self.client.get(url.clone()).send()?;
    let status = response.status();
    if !status.is_success() {
      return Err(ApiError::StatusError {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }
    let body = response.bytes()?;
    decode_json(url, &body)
  }

  fn get_bytes(&self, url: &Url) -> Result<Option<Vec<u8>>, ApiError> {
    debug!("下载 {}", url);
    let response = self.client.get(url.clone()).send()?;
    if response.status() != StatusCode::OK {
      warn!("下载失败: {} 返回 {}", url, response.status());
      return Ok(None);
    }
    Ok(Some(response.bytes()?.to_vec()))
  }
}
