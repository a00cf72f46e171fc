use std::path::PathBuf;

use thiserror::Error;

/// 检索服务的错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 添加的图片文件不存在
    #[error("图片不存在: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// 路径试图跳出图片目录，或者为空
    #[error("非法路径: {0}")]
    InvalidPath(String),

    /// 上传文件的类型不是图片
    #[error("文件类型必须为图片，收到: {0}")]
    InvalidContentType(String),

    /// 请求参数无法解析
    #[error("请求无效: {0}")]
    Rejection(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 图片解码失败
    #[error("图片解码失败: {0}")]
    Image(#[from] image::ImageError),

    /// 张量运算或模型前向传播失败
    #[error("模型运算失败: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("分词失败: {0}")]
    Tokenizer(String),

    /// 模型权重下载失败
    #[error("模型下载失败: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
