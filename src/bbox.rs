// 该文件是 Panodet （街景探测） 项目的一部分。
// src/bbox.rs - 经纬度包围盒
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

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BoundingBoxError {
  #[error("包围盒需要 4 个数值, 实际为 {0}")]
  WrongArity(usize),
  #[error("无法解析数值 '{0}'")]
  InvalidNumber(String),
  #[error("包围盒最小值大于最大值: {0}")]
  Inverted(String),
}

/// 闭区间经纬度包围盒 [min_lon, min_lat, max_lon, max_lat]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub min_lon: f64,
  pub min_lat: f64,
  pub max_lon: f64,
  pub max_lat: f64,
}

impl BoundingBox {
  pub fn new(
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
  ) -> Result<Self, BoundingBoxError> {
    let bbox = BoundingBox {
      min_lon,
      min_lat,
      max_lon,
      max_lat,
    };
    if min_lon > max_lon || min_lat > max_lat {
      return Err(BoundingBoxError::Inverted(bbox.to_string()));
    }
    Ok(bbox)
  }

  /// 边界上的点同样视为在包围盒内
  pub fn contains(&self, lon: f64, lat: f64) -> bool {
    lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
  }

  /// 坐标数组至少需要经度和纬度两项
  pub fn contains_position(&self, position: &[f64]) -> bool {
    match position {
      [lon, lat, ..] => self.contains(*lon, *lat),
      _ => false,
    }
  }
}

impl fmt::Display for BoundingBox {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{},{},{},{}",
      self.min_lon, self.min_lat, self.max_lon, self.max_lat
    )
  }
}

impl FromStr for BoundingBox {
  type Err = BoundingBoxError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let values = s
      .split(',')
      .map(|v| {
        let v = v.trim();
        v.parse::<f64>()
          .map_err(|_| BoundingBoxError::InvalidNumber(v.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()?;

    match values.as_slice() {
      &[min_lon, min_lat, max_lon, max_lat] => {
        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
      }
      other => Err(BoundingBoxError::WrongArity(other.len())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn search_area() -> BoundingBox {
    BoundingBox::new(2.25256, 48.96895, 2.26447, 48.97247).unwrap()
  }

  #[test]
  fn corners_and_edges_are_inside() {
    let bbox = search_area();
    assert!(bbox.contains(2.25256, 48.96895));
    assert!(bbox.contains(2.26447, 48.97247));
    assert!(bbox.contains(2.25256, 48.97));
    assert!(bbox.contains(2.26, 48.97247));
  }

  #[test]
  fn points_outside_are_rejected() {
    let bbox = search_area();
    assert!(!bbox.contains(2.25255, 48.97));
    assert!(!bbox.contains(2.26448, 48.97));
    assert!(!bbox.contains(2.26, 48.96894));
    assert!(!bbox.contains(2.26, 48.97248));
  }

  #[test]
  fn positions_need_two_values() {
    let bbox = search_area();
    assert!(bbox.contains_position(&[2.26, 48.97]));
    assert!(bbox.contains_position(&[2.26, 48.97, 35.0]));
    assert!(!bbox.contains_position(&[2.26]));
    assert!(!bbox.contains_position(&[]));
  }

  #[test]
  fn parse_and_display() {
    let bbox: BoundingBox = "2.25256, 48.96895,2.26447,48.97247".parse().unwrap();
    assert_eq!(bbox, search_area());
    assert_eq!(bbox.to_string(), "2.25256,48.96895,2.26447,48.97247");
  }

  #[test]
  fn parse_errors() {
    assert_eq!(
      "1,2,3".parse::<BoundingBox>(),
      Err(BoundingBoxError::WrongArity(3))
    );
    assert_eq!(
      "1,2,x,4".parse::<BoundingBox>(),
      Err(BoundingBoxError::InvalidNumber("x".to_string()))
    );
    assert!(matches!(
      "3,2,1,4".parse::<BoundingBox>(),
      Err(BoundingBoxError::Inverted(_))
    ));
  }
}
