use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::SearchHit;

/// 上传请求
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
}

/// 上传表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的图片文件，类型必须为 `image/*`
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// 上传响应
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// 服务端生成的文件名
    pub filename: String,
    /// 文件在服务端的完整路径
    pub file_path: String,
    /// 是否已成功加入检索库
    pub indexed: bool,
}

/// 搜索参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// 最低分数，范围 0 到 100，默认为 90
    pub min_score: Option<f32>,
}

/// 单条搜索结果
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResult {
    pub filename: String,
    pub score: f32,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self { filename: hit.filename, score: hit.score }
    }
}

/// 搜索响应
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// 按分数降序排列的结果
    pub results: Vec<SearchResult>,
}

/// 添加图片响应
#[derive(Debug, Serialize, ToSchema)]
pub struct AddImageResponse {
    pub message: String,
    pub filename: String,
}

/// 健康检查响应
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// 根路径响应
#[derive(Debug, Serialize, ToSchema)]
pub struct InfoResponse {
    pub message: String,
    pub health: String,
}

/// 错误响应
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
