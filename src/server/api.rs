use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};
use log::{info, warn};
use tokio::task::block_in_place;

use super::error::{Result, rejected};
use super::state::AppState;
use super::types::*;
use crate::Error;

/// 健康检查
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "clipsearch backend is running".to_string(),
    })
}

/// 服务信息
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, body = InfoResponse),
    )
)]
pub async fn root_handler() -> Json<InfoResponse> {
    Json(InfoResponse { message: "Image Search API".to_string(), health: "/health".to_string() })
}

/// 将图片目录下已有的图片加入检索库
#[utoipa::path(
    get,
    path = "/add_image/{image_path}",
    params(("image_path" = String, Path, description = "相对于图片目录的路径")),
    responses(
        (status = 200, body = AddImageResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse),
    )
)]
pub async fn add_image_handler(
    State(state): State<Arc<AppState>>,
    image_path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<AddImageResponse>> {
    let Path(image_path) = image_path.map_err(rejected)?;
    let path = state.gallery.resolve(&image_path)?;
    let filename = state.searcher.add_image(&path).await?;
    Ok(Json(AddImageResponse { message: "Image added successfully".to_string(), filename }))
}

/// 使用文本搜索图片
#[utoipa::path(
    get,
    path = "/search_images/{query}",
    params(("query" = String, Path, description = "查询文本，需要 URL 编码"), SearchParams),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, body = ErrorResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Path<String>, PathRejection>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Path(query) = query.map_err(rejected)?;
    let Query(params) = params.map_err(rejected)?;
    let min_score = params.min_score.unwrap_or(state.min_score);
    info!("搜索: {query} (min_score = {min_score})");

    let hits = state.searcher.search(&query, min_score).await?;
    info!("搜索结果: {} 张图片", hits.len());

    Ok(Json(SearchResponse { results: hits.into_iter().map(Into::into).collect() }))
}

/// 上传图片并自动加入检索库
#[utoipa::path(
    post,
    path = "/upload_image",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, body = ErrorResponse),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<UploadRequest>, TypedMultipartError>,
) -> Result<Json<UploadResponse>> {
    let data = data.map_err(rejected)?;
    let metadata = &data.file.metadata;
    let content_type = metadata.content_type.clone().unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(Error::InvalidContentType(content_type).into());
    }

    let path = state.gallery.save_upload(metadata.file_name.as_deref(), &data.file.contents).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    // 加入检索库失败不影响上传结果
    let indexed = match state.searcher.add_image(&path).await {
        Ok(_) => {
            info!("已上传并加入检索库: {filename}");
            true
        }
        Err(e) => {
            warn!("上传的图片 {filename} 加入检索库失败: {e}");
            false
        }
    };

    Ok(Json(UploadResponse {
        message: "Image uploaded successfully".to_string(),
        filename,
        file_path: std::path::absolute(&path).unwrap_or(path).display().to_string(),
        indexed,
    }))
}

/// 列出图片目录中的图片，最新的在前
#[utoipa::path(
    get,
    path = "/list_images",
    responses(
        (status = 200, body = Vec<String>),
    )
)]
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    let images = block_in_place(|| state.gallery.list())?;
    Ok(Json(images))
}
