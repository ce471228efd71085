use crate::cli::run;

pub mod cli;
mod config;
pub mod domain;
pub mod download;
pub mod provider;
pub mod storage;
pub mod sync;

fn main() -> anyhow::Result<()> {
    run()
}
