// 该文件是 Panodet （街景探测） 项目的一部分。
// src/output/picture_directory.rs - 图片目录输出
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

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::Picture,
  model::DetectResult,
  output::{OutputError, Render, draw::Draw},
};

/// 每次运行都会重建的图片输出目录
///
/// 检测结果保存为 `<id>.jpg`，原图保存为 `<id>.orig.jpg`。
pub struct PictureDirectory {
  directory: PathBuf,
  draw: Draw,
}

impl FromUrlWithScheme for PictureDirectory {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for PictureDirectory {
  type Error = OutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    if uri.path().is_empty() {
      return Err(OutputError::EmptyPath);
    }
    Ok(PictureDirectory::new(uri.path()))
  }
}

impl PictureDirectory {
  pub fn new(directory: impl AsRef<Path>) -> Self {
    PictureDirectory {
      directory: directory.as_ref().to_path_buf(),
      draw: Draw::default(),
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// 删除旧目录（若存在）并重新创建
  pub fn recreate(&self) -> Result<(), OutputError> {
    match std::fs::remove_dir_all(&self.directory) {
      Ok(()) => debug!("已删除旧输出目录: {}", self.directory.display()),
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => return Err(e.into()),
    }
    std::fs::create_dir_all(&self.directory)?;
    info!("输出目录已创建: {}", self.directory.display());
    Ok(())
  }

  fn file_stem(id: &str) -> String {
    id.replace(['/', '\\'], "_")
  }

  pub fn picture_path(&self, id: &str) -> PathBuf {
    self.directory.join(format!("{}.jpg", Self::file_stem(id)))
  }

  pub fn original_path(&self, id: &str) -> PathBuf {
    self
      .directory
      .join(format!("{}.orig.jpg", Self::file_stem(id)))
  }

  /// 原样写入下载的字节
  pub fn save_raw(&self, path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    std::fs::write(path, bytes)?;
    debug!("保存图像到文件: {}", path.display());
    Ok(())
  }
}

impl Render<Picture, DetectResult> for PictureDirectory {
  type Error = OutputError;

  fn render_result(&self, picture: &Picture, result: &DetectResult) -> Result<(), Self::Error> {
    let mut image = picture.image.clone();
    self.draw.draw_detections(&mut image, result);

    let path = self.picture_path(&picture.id);
    image.save(&path)?;
    info!("保存检测结果到文件: {}", path.display());

    // 保留原图以便排查误检
    self.save_raw(&self.original_path(&picture.id), &picture.raw)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{input::tests::jpeg_bytes, model::DetectItem};

  #[test]
  fn url_selects_directory() {
    let output = PictureDirectory::from_url(&Url::parse("folder:///tmp/pictures").unwrap()).unwrap();
    assert_eq!(output.directory(), Path::new("/tmp/pictures"));

    let output = PictureDirectory::from_url(&Url::parse("folder:pictures").unwrap()).unwrap();
    assert_eq!(output.directory(), Path::new("pictures"));

    assert!(matches!(
      PictureDirectory::from_url(&Url::parse("image:///tmp/a.jpg").unwrap()),
      Err(OutputError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn recreate_clears_previous_run() {
    let root = tempfile::tempdir().unwrap();
    let directory = root.path().join("detected");
    let output = PictureDirectory::new(&directory);

    output.recreate().unwrap();
    std::fs::write(directory.join("stale.jpg"), b"old").unwrap();
    output.recreate().unwrap();

    assert!(directory.is_dir());
    assert_eq!(std::fs::read_dir(&directory).unwrap().count(), 0);
  }

  #[test]
  fn render_writes_annotated_and_original() {
    let root = tempfile::tempdir().unwrap();
    let output = PictureDirectory::new(root.path());
    let raw = jpeg_bytes(32, 32);
    let picture = Picture::decode("pic/1", raw.clone()).unwrap();
    let result = DetectResult::from(vec![DetectItem {
      class_id: 0,
      score: 0.8,
      bbox: [0.25, 0.25, 0.75, 0.75],
    }]);

    output.render_result(&picture, &result).unwrap();

    let annotated = output.picture_path("pic/1");
    assert_eq!(annotated, root.path().join("pic_1.jpg"));
    assert_eq!(image::open(&annotated).unwrap().width(), 32);
    assert_eq!(std::fs::read(output.original_path("pic/1")).unwrap(), raw);
  }
}
