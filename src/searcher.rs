use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, IndexOp, Tensor};
use log::debug;
use serde::Serialize;
use tokio::task::block_in_place;

use crate::model::ImageTextModel;
use crate::store::TensorStore;
use crate::{Result, metrics};

/// 命令行搜索使用的默认最低分数，HTTP 接口另有自己的默认值
pub const DEFAULT_MIN_SCORE: f32 = 20.0;

/// 默认的对照文本
pub const DEFAULT_NEGATIVE_PROMPT: &str = "other content";

/// 单条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub filename: String,
    /// 查询文本相对于对照文本的概率，乘以 100，范围 `[0, 100]`
    pub score: f32,
}

/// 检索服务，持有张量库与模型
pub struct Searcher {
    store: TensorStore,
    model: Arc<dyn ImageTextModel>,
    negative_prompt: String,
}

impl Searcher {
    pub fn new(store: TensorStore, model: Arc<dyn ImageTextModel>, negative_prompt: String) -> Self {
        Self { store, model, negative_prompt }
    }

    pub fn store(&self) -> &TensorStore {
        &self.store
    }

    pub fn model(&self) -> &dyn ImageTextModel {
        &*self.model
    }

    pub fn negative_prompt(&self) -> &str {
        &self.negative_prompt
    }

    /// 添加图片到张量库，返回图片的文件名
    pub async fn add_image(&self, path: &Path) -> Result<String> {
        self.store.add(path, &*self.model).await
    }

    /// 用文本搜索所有已添加的图片
    ///
    /// 每张图片都与 `[query, negative_prompt]` 两段文本做一次联合前向传播，
    /// 对每张图片在两段文本上取 softmax，查询文本一列的概率乘以 100 即为分数。
    /// 结果只保留分数不低于 `min_score` 的图片，按分数降序排列。
    ///
    /// # Arguments
    ///
    /// * `query` - 查询文本
    /// * `min_score` - 最低分数
    pub async fn search(&self, query: &str, min_score: f32) -> Result<Vec<SearchHit>> {
        let (names, tensors) = self.store.entries().await;
        if names.is_empty() {
            debug!("张量库为空，跳过搜索");
            return Ok(vec![]);
        }

        let start = Instant::now();
        let texts = [query, self.negative_prompt.as_str()];
        let probs = block_in_place(|| -> Result<Vec<f32>> {
            let images = Tensor::stack(&tensors, 0)?;
            let logits = self.model.logits_per_image(&images, &texts)?;
            let probs = candle_nn::ops::softmax(&logits, 1)?;
            Ok(probs.i((.., 0))?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
        })?;
        let elapsed = start.elapsed().as_secs_f32();

        let max_score = probs.iter().copied().fold(0f32, f32::max) * 100.;
        metrics::observe_search(names.len(), elapsed, max_score);
        debug!("搜索 {} 张图片，耗时 {:.2}s", names.len(), elapsed);

        let mut hits = names
            .into_iter()
            .zip(probs)
            .map(|(filename, prob)| SearchHit { filename, score: prob * 100. })
            .filter(|hit| hit.score >= min_score)
            .collect::<Vec<_>>();
        hits.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

        Ok(hits)
    }
}
