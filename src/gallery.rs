use std::cmp::Reverse;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};
use rand::distr::{Alphanumeric, SampleString};
use walkdir::WalkDir;

use crate::{Error, Result};

/// 列出图片时识别的扩展名
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "svg"];

/// 存放图片文件的目录
#[derive(Debug, Clone)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    /// 打开图片目录，不存在时创建
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 将相对路径解析到图片目录下，拒绝绝对路径和 `..`
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        let valid = !relative.is_empty()
            && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(Error::InvalidPath(relative.to_string()));
        }
        Ok(self.dir.join(path))
    }

    /// 以不冲突的随机文件名保存上传的图片，保留原始扩展名
    pub async fn save_upload(&self, original_name: Option<&str>, data: &[u8]) -> Result<PathBuf> {
        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let path = loop {
            let stem = Alphanumeric.sample_string(&mut rand::rng(), 32);
            let path = self.dir.join(format!("{stem}{extension}"));
            if !tokio::fs::try_exists(&path).await? {
                break path;
            }
        };

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, data).await?;
        debug!("已保存上传文件: {}", path.display());
        Ok(path)
    }

    /// 列出目录下的图片文件名，按创建与修改时间中较晚者降序排列
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut images = vec![];
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                // 失效的符号链接
                Err(e) if e.depth() > 0 => {
                    warn!("跳过无法读取的文件: {e}");
                    continue;
                }
                Err(e) => return Err(std::io::Error::from(e).into()),
            };
            if !entry.file_type().is_file() || !is_image(entry.path()) {
                continue;
            }
            let metadata = entry.metadata().map_err(std::io::Error::from)?;
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let added = match metadata.created() {
                Ok(created) => created.max(modified),
                Err(_) => modified,
            };
            images.push((added, entry.file_name().to_string_lossy().into_owned()));
        }

        images.sort_by_key(|(added, _)| Reverse(*added));
        Ok(images.into_iter().map(|(_, name)| name).collect())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path()).unwrap();

        assert_eq!(gallery.resolve("a.png").unwrap(), dir.path().join("a.png"));
        assert_eq!(gallery.resolve("sub/a.png").unwrap(), dir.path().join("sub/a.png"));
        for bad in ["", "../a.png", "sub/../../a.png", "/etc/passwd"] {
            assert!(matches!(gallery.resolve(bad), Err(Error::InvalidPath(_))), "{bad}");
        }
    }

    #[test]
    fn list_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path()).unwrap();
        for name in ["a.PNG", "b.txt", "c.webp", "d"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("e.jpg")).unwrap();

        let mut names = gallery.list().unwrap();
        names.sort();
        assert_eq!(names, ["a.PNG", "c.webp"]);
    }

    #[cfg(unix)]
    #[test]
    fn list_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.png");
        std::fs::write(&source, b"x").unwrap();
        let images = dir.path().join("images");
        let gallery = Gallery::new(&images).unwrap();
        std::os::unix::fs::symlink(&source, images.join("linked.png")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.png"), images.join("broken.png")).unwrap();

        assert_eq!(gallery.list().unwrap(), ["linked.png"]);
    }

    #[tokio::test]
    async fn upload_names_keep_extension() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = Gallery::new(dir.path()).unwrap();

        let a = gallery.save_upload(Some("cat.jpg"), b"1").await.unwrap();
        let b = gallery.save_upload(Some("cat.jpg"), b"2").await.unwrap();
        let c = gallery.save_upload(None, b"3").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "jpg");
        assert!(c.extension().is_none());
        assert_eq!(std::fs::read(&b).unwrap(), b"2");
    }
}
