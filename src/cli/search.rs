use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;

use super::open_searcher;
use crate::SearchHit;
use crate::cli::SubCommandExtend;
use crate::config::{ModelOptions, Opts};
use crate::searcher::DEFAULT_MIN_SCORE;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub model: ModelOptions,
    /// 查询文本
    pub query: String,
    /// 最低分数，范围 0 到 100
    #[arg(long, value_name = "SCORE", default_value_t = DEFAULT_MIN_SCORE)]
    pub min_score: f32,
    /// 显示的结果数量，不填则全部显示
    #[arg(long, value_name = "COUNT")]
    pub count: Option<usize>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let searcher = open_searcher(opts, &self.model)?;
        debug!("对照文本: {}", searcher.negative_prompt());

        let mut result = searcher.search(&self.query, self.min_score).await?;
        if let Some(count) = self.count {
            result.truncate(count);
        }

        print_result(&result, self)
    }
}

fn print_result(result: &[SearchHit], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for hit in result {
                println!("{:.2}\t{}", hit.score, hit.filename);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}
