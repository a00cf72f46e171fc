use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::info;
use rayon::prelude::*;
use regex::Regex;
use tokio::task::block_in_place;
use walkdir::WalkDir;

use super::open_searcher;
use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::utils::pb_style;
use crate::{Gallery, ImageTextModel};

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 图片文件或所在目录
    pub path: PathBuf,
    /// 扫描目录时的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,gif,bmp,webp,tiff")]
    pub suffix: String,
    /// 先将图片复制到图片目录，再加入检索库
    #[arg(long)]
    pub copy: bool,
    /// 每处理多少张图片写一次快照
    #[arg(short, long, value_name = "SIZE", default_value_t = 64)]
    pub batch_size: usize,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let re_suf = format!("(?i)^({})$", self.suffix.replace(',', "|"));
        let re_suf = Regex::new(&re_suf).expect("failed to build regex");

        let files = scan(&self.path, &re_suf)?;
        info!("找到 {} 张图片", files.len());
        if files.is_empty() {
            return Ok(());
        }

        let gallery = self.copy.then(|| Gallery::new(&opts.image_dir)).transpose()?;
        let searcher = open_searcher(opts, &self.model)?;
        let model = searcher.model();

        let pb = ProgressBar::new(files.len() as u64).with_style(pb_style());
        for chunk in files.chunks(self.batch_size.max(1)) {
            let records = block_in_place(|| {
                chunk
                    .par_iter()
                    .progress_with(pb.clone())
                    .filter_map(|path| match prepare(path, gallery.as_ref(), model) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            pb.println(format!("[ERR] {}: {e:#}", path.display()));
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            });
            searcher.store().extend(records).await?;
        }

        pb.finish_with_message("图片添加完成");
        info!("检索库中共有 {} 张图片", searcher.store().len().await);

        Ok(())
    }
}

/// 扫描单个文件或目录下所有匹配后缀的图片
fn scan(path: &Path, re_suf: &Regex) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    anyhow::ensure!(path.is_dir(), "路径不存在: {}", path.display());

    let mut files = vec![];
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matched = entry
            .path()
            .extension()
            .is_some_and(|ext| re_suf.is_match(&ext.to_string_lossy()));
        if matched {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// 按需复制到图片目录，然后预处理
fn prepare(
    path: &Path,
    gallery: Option<&Gallery>,
    model: &dyn ImageTextModel,
) -> anyhow::Result<(String, candle_core::Tensor)> {
    let name = path
        .file_name()
        .context("无法获取文件名")?
        .to_string_lossy()
        .into_owned();
    let path = match gallery {
        Some(gallery) => {
            let target = gallery.dir().join(&name);
            if !same_file(path, &target)? {
                std::fs::copy(path, &target)?;
            }
            target
        }
        None => path.to_path_buf(),
    };
    let tensor = model.preprocess(&path)?;
    Ok((name, tensor))
}

/// 源文件已经在图片目录中时不能复制到自身，否则会被截断
fn same_file(source: &Path, target: &Path) -> std::io::Result<bool> {
    if !target.exists() {
        return Ok(false);
    }
    Ok(std::fs::canonicalize(source)? == std::fs::canonicalize(target)?)
}
