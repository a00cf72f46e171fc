pub mod cli;
pub mod config;
mod error;
pub mod gallery;
mod metrics;
pub mod model;
pub mod searcher;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use error::{Error, Result};
pub use gallery::Gallery;
pub use model::{ClipEngine, ImageTextModel};
pub use searcher::{SearchHit, Searcher};
pub use store::TensorStore;
