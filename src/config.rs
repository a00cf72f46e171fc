use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::*;

#[derive(Parser, Debug, Clone)]
pub struct ModelOptions {
    /// Hugging Face 上的 CLIP 模型仓库
    #[arg(long, value_name = "REPO", default_value = "openai/clip-vit-base-patch32")]
    pub model_id: String,
    /// 模型仓库的版本
    #[arg(long, value_name = "REV", default_value = "refs/pr/15")]
    pub revision: String,
    /// 本地模型权重文件，指定后不再下载
    #[arg(long, value_name = "FILE")]
    pub weights: Option<PathBuf>,
    /// 本地 tokenizer.json 文件，指定后不再下载
    #[arg(long, value_name = "FILE")]
    pub tokenizer: Option<PathBuf>,
    /// 强制使用 CPU 推理
    #[arg(long)]
    pub cpu: bool,
    /// 与查询文本一起参与 softmax 的对照文本
    #[arg(long, value_name = "TEXT", default_value = "other content")]
    pub negative_prompt: String,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "clipsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 图片张量快照文件
    #[arg(short, long, env = "EMBED_FILE", default_value = "embeddings/embeddings.safetensors")]
    pub embed_file: PathBuf,
    /// 图片存放目录
    #[arg(short, long, env = "IMAGE_DIR", default_value = "./images")]
    pub image_dir: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 添加图片到检索库
    Add(AddCommand),
    /// 使用文本搜索图片
    Search(SearchCommand),
    /// 启动 HTTP 检索服务
    Server(ServerCommand),
    /// 列出图片目录中的图片，最新的在前
    List(ListCommand),
}
