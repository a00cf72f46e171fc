mod clip;

use std::path::Path;

use candle_core::Tensor;

pub use self::clip::ClipEngine;
use crate::Result;

/// 图文联合模型
///
/// 检索只依赖这两个操作：把图片预处理成模型输入，以及对一批图片和若干文本做一次联合前向传播。
pub trait ImageTextModel: Send + Sync {
    /// 读取并预处理图片，返回 CPU 上形状为 `(3, S, S)` 的张量
    fn preprocess(&self, path: &Path) -> Result<Tensor>;

    /// 计算图片与文本之间的相似度 logits
    ///
    /// # Arguments
    ///
    /// * `images` - 形状为 `(N, 3, S, S)` 的图片批次
    /// * `texts` - 文本列表，长度为 T
    ///
    /// 返回形状为 `(N, T)` 的张量
    fn logits_per_image(&self, images: &Tensor, texts: &[&str]) -> Result<Tensor>;
}
