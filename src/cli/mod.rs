mod add;
mod list;
mod search;
pub mod server;

pub use add::*;
pub use list::*;
pub use search::*;
pub use server::*;

use std::sync::Arc;

use tokio::task::block_in_place;

use crate::config::{ModelOptions, Opts};
use crate::{ClipEngine, Searcher, TensorStore};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 加载模型与张量库，组装检索服务
fn open_searcher(opts: &Opts, model: &ModelOptions) -> anyhow::Result<Searcher> {
    let store = TensorStore::open(&opts.embed_file)?;
    let engine = block_in_place(|| ClipEngine::load(model))?;
    Ok(Searcher::new(store, Arc::new(engine), model.negative_prompt.clone()))
}
