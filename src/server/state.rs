use std::sync::Arc;

use crate::{Gallery, Searcher};

/// 应用状态
pub struct AppState {
    /// 检索服务
    pub searcher: Searcher,
    /// 图片目录
    pub gallery: Gallery,
    /// 搜索接口未指定 `min_score` 时使用的最低分数
    pub min_score: f32,
    /// 请求体大小上限，单位为字节
    pub upload_limit: usize,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(searcher: Searcher, gallery: Gallery, min_score: f32, upload_limit: usize) -> Arc<Self> {
        Arc::new(AppState { searcher, gallery, min_score, upload_limit })
    }
}
