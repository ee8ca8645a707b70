// 该文件是 Panodet （街景探测） 项目的一部分。
// src/dispatch.rs - 分块批量调度
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

use std::ops::Range;

use thiserror::Error;
use tracing::info;

const DEFAULT_CHUNK_SIZE: usize = 10;

#[derive(Error, Debug, PartialEq)]
pub enum DispatchError {
  #[error("分块大小必须大于 0")]
  ZeroChunkSize,
  #[error("分块 {start}..{end} 的结果数量不匹配: 期望 {expected}, 实际 {actual}")]
  ResultCountMismatch {
    start: usize,
    end: usize,
    expected: usize,
    actual: usize,
  },
}

/// 将有序输入切分为固定大小的连续分块，每块调用一次检测
#[derive(Debug, Clone, Copy)]
pub struct ChunkedDispatcher {
  chunk_size: usize,
}

impl Default for ChunkedDispatcher {
  fn default() -> Self {
    ChunkedDispatcher {
      chunk_size: DEFAULT_CHUNK_SIZE,
    }
  }
}

impl ChunkedDispatcher {
  pub fn new(chunk_size: usize) -> Result<Self, DispatchError> {
    if chunk_size == 0 {
      return Err(DispatchError::ZeroChunkSize);
    }
    Ok(ChunkedDispatcher { chunk_size })
  }

  pub fn chunk_size(&self) -> usize {
    self.chunk_size
  }

  /// 各分块在输入中的下标范围，最后一块可能较短
  pub fn chunks(&self, len: usize) -> impl Iterator<Item = Range<usize>> + use<> {
    let chunk_size = self.chunk_size;
    (0..len)
      .step_by(chunk_size)
      .map(move |start| start..(start + chunk_size).min(len))
  }

  /// 依次对每个分块调用 `detect`，再按输入顺序把每个结果连同其下标与原始条目交给 `sink`
  pub fn dispatch<T, R, E, D, S>(&self, items: &[T], mut detect: D, mut sink: S) -> Result<(), E>
  where
    D: FnMut(&[T]) -> Result<Vec<R>, E>,
    S: FnMut(usize, &T, R) -> Result<(), E>,
    E: From<DispatchError>,
  {
    for range in self.chunks(items.len()) {
      info!(
        "处理图片 {} 至 {} / {}",
        range.start + 1,
        range.end,
        items.len()
      );
      let chunk = &items[range.clone()];
      let results = detect(chunk)?;

      if results.len() != chunk.len() {
        return Err(
          DispatchError::ResultCountMismatch {
            start: range.start,
            end: range.end,
            expected: chunk.len(),
            actual: results.len(),
          }
          .into(),
        );
      }

      for (offset, (item, result)) in chunk.iter().zip(results).enumerate() {
        sink(range.start + offset, item, result)?;
      }
    }
    Ok(())
  }
}
