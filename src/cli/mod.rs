mod analyze;
pub mod server;
mod trends;

pub use analyze::*;
pub use server::*;
pub use trends::*;

use log::info;
use tokio::task::spawn_blocking;

use crate::config::{ModelDir, Opts};
use crate::models::Models;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 在阻塞线程中加载模型
async fn load_models(dir: &ModelDir) -> anyhow::Result<Models> {
    info!("从 {} 加载模型", dir.path().display());
    let dir = dir.clone();
    Ok(spawn_blocking(move || Models::load(&dir)).await?)
}
