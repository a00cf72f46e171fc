use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use log::{debug, info};
use tokio::sync::RwLock;
use tokio::task::block_in_place;

use crate::model::ImageTextModel;
use crate::{Error, Result, metrics};

/// 图片名到预处理张量的映射，每次修改后整体写回快照文件
pub struct TensorStore {
    path: PathBuf,
    records: RwLock<HashMap<String, Tensor>>,
}

impl TensorStore {
    /// 打开快照文件，文件不存在时从空库开始
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let records = candle_core::safetensors::load(&path, &Device::Cpu)?;
            info!("从 {} 载入 {} 张图片", path.display(), records.len());
            records
        } else {
            info!("快照 {} 不存在，使用空库", path.display());
            HashMap::new()
        };
        Ok(Self { path, records: RwLock::new(records) })
    }

    /// 快照文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 预处理图片并以文件名为键保存，已存在的记录会被覆盖
    ///
    /// 返回图片的文件名
    pub async fn add(&self, path: &Path, model: &dyn ImageTextModel) -> Result<String> {
        if !path.is_file() {
            return Err(Error::ImageNotFound(path.to_path_buf()));
        }
        let name = file_name(path)?;
        let tensor = block_in_place(|| model.preprocess(path))?;
        self.insert(name.clone(), tensor).await?;
        info!("已添加图片: {}", name);
        Ok(name)
    }

    /// 保存一条已预处理的记录
    pub async fn insert(&self, name: String, tensor: Tensor) -> Result<()> {
        self.extend([(name, tensor)]).await
    }

    /// 批量保存已预处理的记录，只写一次快照
    ///
    /// 快照写入失败时内存中的记录保持不变
    pub async fn extend(&self, items: impl IntoIterator<Item = (String, Tensor)>) -> Result<()> {
        let mut records = self.records.write().await;
        let mut updated = records.clone();
        let mut count = 0;
        for (name, tensor) in items {
            updated.insert(name, tensor);
            count += 1;
        }
        if count == 0 {
            return Ok(());
        }
        block_in_place(|| self.save(&updated))?;
        *records = updated;
        metrics::inc_images_added(count);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.records.read().await.contains_key(name)
    }

    /// 所有图片名，按字典序排列
    pub async fn names(&self) -> Vec<String> {
        let mut names = self.records.read().await.keys().cloned().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// 取出当前所有记录的一致副本，张量只复制引用
    pub async fn entries(&self) -> (Vec<String>, Vec<Tensor>) {
        self.records.read().await.iter().map(|(k, v)| (k.clone(), v.clone())).unzip()
    }

    /// 原子地写入快照：先写临时文件，再重命名覆盖
    fn save(&self, records: &HashMap<String, Tensor>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = tmp_path(&self.path);
        candle_core::safetensors::save(records, &tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("快照已写入 {}，共 {} 张图片", self.path.display(), records.len());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(path.display().to_string()))
}
