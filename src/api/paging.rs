// 该文件是 Panodet （街景探测） 项目的一部分。
// src/api/paging.rs - 列表分页遍历
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

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::api::{ApiError, Fetch, Page};

/// 只有存在 next 链接且本页已满时才继续
pub fn should_continue(has_next: bool, page_len: usize, limit: usize) -> bool {
  has_next && page_len == limit
}

pub fn fetch_page<T: DeserializeOwned>(
  fetch: &impl Fetch,
  url: &Url,
) -> Result<Page<T>, ApiError> {
  let value = fetch.get_json(url)?;
  serde_json::from_value(value).map_err(|source| ApiError::DecodeError {
    url: url.to_string(),
    source,
  })
}

/// 逐页遍历列表接口，每次产出一页的记录
///
/// 出错后遍历结束。
pub struct Pages<'a, F, T> {
  fetch: &'a F,
  next: Option<Url>,
  limit: usize,
  page_index: usize,
  _phantom: PhantomData<T>,
}

impl<'a, F: Fetch, T: DeserializeOwned> Pages<'a, F, T> {
  pub fn new(fetch: &'a F, first: Url, limit: usize) -> Self {
    Pages {
      fetch,
      next: Some(first),
      limit,
      page_index: 0,
      _phantom: PhantomData,
    }
  }
}

impl<F: Fetch, T: DeserializeOwned> Iterator for Pages<'_, F, T> {
  type Item = Result<Vec<T>, ApiError>;

  fn next(&mut self) -> Option<Self::Item> {
    let url = self.next.take()?;
    self.page_index += 1;
    debug!("获取第 {} 页: {}", self.page_index, url);

    let page: Page<T> = match fetch_page(self.fetch, &url) {
      Ok(page) => page,
      Err(e) => return Some(Err(e)),
    };

    let next = page.next_link(&url);
    if should_continue(next.is_some(), page.features.len(), self.limit) {
      self.next = next;
    } else {
      debug!(
        "分页结束: 本页 {} 条, 上限 {}, next 链接: {}",
        page.features.len(),
        self.limit,
        next.is_some()
      );
    }

    Some(Ok(page.features))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{Collection, testing::MemoryFetcher};
  use serde_json::{Value, json};

  const BASE: &str = "https://example.org/api/collections";

  fn page(ids: &[&str], next: Option<&str>) -> Value {
    let collections: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    let links: Vec<Value> = next
      .map(|href| vec![json!({ "rel": "next", "href": href })])
      .unwrap_or_default();
    json!({ "collections": collections, "links": links })
  }

  fn ids(fetcher: &MemoryFetcher, limit: usize) -> Vec<Result<Vec<String>, ()>> {
    Pages::<_, Collection>::new(fetcher, Url::parse(BASE).unwrap(), limit)
      .map(|page| {
        page
          .map(|items| items.into_iter().map(|c| c.id).collect())
          .map_err(|_| ())
      })
      .collect()
  }

  #[test]
  fn continue_rule() {
    assert!(should_continue(true, 10, 10));
    assert!(!should_continue(true, 9, 10));
    assert!(!should_continue(false, 10, 10));
    assert!(!should_continue(false, 0, 10));
  }

  #[test]
  fn follows_next_links_while_pages_are_full() {
    let fetcher = MemoryFetcher::default()
      .with_json(BASE, page(&["a", "b"], Some("https://example.org/api/collections?page=2")))
      .with_json(
        "https://example.org/api/collections?page=2",
        page(&["c", "d"], Some("https://example.org/api/collections?page=3")),
      )
      .with_json("https://example.org/api/collections?page=3", page(&["e"], None));

    assert_eq!(
      ids(&fetcher, 2),
      vec![
        Ok(vec!["a".to_string(), "b".to_string()]),
        Ok(vec!["c".to_string(), "d".to_string()]),
        Ok(vec!["e".to_string()]),
      ]
    );
  }

  #[test]
  fn short_page_stops_even_with_next_link() {
    let fetcher = MemoryFetcher::default().with_json(
      BASE,
      page(&["a"], Some("https://example.org/api/collections?page=2")),
    );

    assert_eq!(ids(&fetcher, 2), vec![Ok(vec!["a".to_string()])]);
    assert_eq!(fetcher.requests.borrow().len(), 1);
  }

  #[test]
  fn full_page_without_next_link_stops() {
    let fetcher = MemoryFetcher::default().with_json(BASE, page(&["a", "b"], None));
    assert_eq!(
      ids(&fetcher, 2),
      vec![Ok(vec!["a".to_string(), "b".to_string()])]
    );
  }

  #[test]
  fn relative_next_links_resolve_against_page() {
    let fetcher = MemoryFetcher::default()
      .with_json(BASE, page(&["a", "b"], Some("collections?page=2")))
      .with_json("https://example.org/api/collections?page=2", page(&["c"], None));

    assert_eq!(
      ids(&fetcher, 2),
      vec![
        Ok(vec!["a".to_string(), "b".to_string()]),
        Ok(vec!["c".to_string()]),
      ]
    );
  }

  #[test]
  fn errors_end_the_walk() {
    let fetcher = MemoryFetcher::default()
      .with_json(BASE, page(&["a", "b"], Some("https://example.org/api/collections?page=2")))
      .with_failure("https://example.org/api/collections?page=2");

    assert_eq!(
      ids(&fetcher, 2),
      vec![Ok(vec!["a".to_string(), "b".to_string()]), Err(())]
    );
  }

  #[test]
  fn malformed_pages_are_decode_errors() {
    let fetcher = MemoryFetcher::default().with_json(BASE, json!({ "links": [] }));
    let mut pages = Pages::<_, Collection>::new(&fetcher, Url::parse(BASE).unwrap(), 2);
    assert!(matches!(
      pages.next(),
      Some(Err(ApiError::DecodeError { .. }))
    ));
    assert!(pages.next().is_none());
  }
}
