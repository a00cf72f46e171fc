#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use candle_core::{DType, Device, Tensor};
use clipsearch::{ImageTextModel, Result, Searcher, TensorStore};

/// 测试用模型：图片文件的内容是一个浮点数 w，
/// 查询文本的 logit 为 10w，其余文本的 logit 为 0
#[derive(Default)]
pub struct StubModel {
    forward_calls: AtomicUsize,
}

impl StubModel {
    pub fn forward_calls(&self) -> usize {
        self.forward_calls.load(Ordering::SeqCst)
    }
}

impl ImageTextModel for StubModel {
    fn preprocess(&self, path: &Path) -> Result<Tensor> {
        let text = std::fs::read_to_string(path)?;
        let weight = text.trim().parse::<f64>().unwrap_or(0.);
        Ok(Tensor::ones((3, 4, 4), DType::F32, &Device::Cpu)?.affine(weight, 0.)?)
    }

    fn logits_per_image(&self, images: &Tensor, texts: &[&str]) -> Result<Tensor> {
        self.forward_calls.fetch_add(1, Ordering::SeqCst);
        let query = images.flatten_from(1)?.mean(1)?.affine(10., 0.)?;
        let mut columns = vec![query.clone()];
        for _ in 1..texts.len() {
            columns.push(query.zeros_like()?);
        }
        Ok(Tensor::stack(&columns, 1)?)
    }
}

/// 写入一张测试图片，内容为它的 w
pub fn write_image(dir: &Path, name: &str, weight: f32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, weight.to_string()).unwrap();
    path
}

pub fn searcher(snapshot: &Path) -> (Searcher, Arc<StubModel>) {
    let model = Arc::new(StubModel::default());
    let store = TensorStore::open(snapshot).unwrap();
    let searcher = Searcher::new(store, model.clone(), "other content".to_string());
    (searcher, model)
}
