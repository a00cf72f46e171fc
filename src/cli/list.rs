use clap::Parser;

use crate::Gallery;
use crate::cli::SubCommandExtend;
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let gallery = Gallery::new(&opts.image_dir)?;
        for name in gallery.list()? {
            println!("{name}");
        }
        Ok(())
    }
}
