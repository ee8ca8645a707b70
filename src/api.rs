// 该文件是 Panodet （街景探测） 项目的一部分。
// src/api.rs - Panoramax API 访问
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

use thiserror::Error;
use url::Url;

mod client;
mod endpoint;
mod paging;
mod types;

pub use self::client::HttpFetcher;
pub use self::endpoint::PanoramaxApi;
pub use self::paging::{Pages, fetch_page, should_continue};
pub use self::types::{Asset, Collection, Feature, Geometry, Link, Page};

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("HTTP 请求错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("HTTP 状态异常: {url} 返回 {status}")]
  StatusError { url: String, status: u16 },
  #[error("JSON 解析错误: {url}: {source}")]
  DecodeError {
    url: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("API 地址无效: {0}")]
  InvalidBase(String),
  #[error("分页数量必须大于 0")]
  ZeroPageLimit,
}

/// 阻塞式数据获取，便于替换为内存实现
pub trait Fetch {
  /// 获取 JSON 文档，非成功状态视为错误
  fn get_json(&self, url: &Url) -> Result<serde_json::Value, ApiError>;

  /// 获取原始字节，状态码不是 200 时返回 `None`
  fn get_bytes(&self, url: &Url) -> Result<Option<Vec<u8>>, ApiError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
  fn get_json(&self, url: &Url) -> Result<serde_json::Value, ApiError> {
    (**self).get_json(url)
  }

  fn get_bytes(&self, url: &Url) -> Result<Option<Vec<u8>>, ApiError> {
    (**self).get_bytes(url)
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
  };

  use serde_json::Value;
  use url::Url;

  use super::{ApiError, Fetch};

  /// 内存中的 API，按完整 URL 应答
  #[derive(Default)]
  pub struct MemoryFetcher {
    json: HashMap<String, Value>,
    bytes: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    pub requests: RefCell<Vec<String>>,
  }

  impl MemoryFetcher {
    pub fn with_json(mut self, url: &str, value: Value) -> Self {
      self.json.insert(url.to_string(), value);
      self
    }

    pub fn with_bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
      self.bytes.insert(url.to_string(), bytes);
      self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
      self.failing.insert(url.to_string());
      self
    }
  }

  impl Fetch for MemoryFetcher {
    fn get_json(&self, url: &Url) -> Result<Value, ApiError> {
      self.requests.borrow_mut().push(url.to_string());
      if self.failing.contains(url.as_str()) {
        return Err(ApiError::StatusError {
          url: url.to_string(),
          status: 500,
        });
      }
      self
        .json
        .get(url.as_str())
        .cloned()
        .ok_or_else(|| ApiError::StatusError {
          url: url.to_string(),
          status: 404,
        })
    }

    fn get_bytes(&self, url: &Url) -> Result<Option<Vec<u8>>, ApiError> {
      self.requests.borrow_mut().push(url.to_string());
      Ok(self.bytes.get(url.as_str()).cloned())
    }
  }
}
