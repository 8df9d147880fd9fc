use anyhow::{Context, anyhow};
use clap::Parser;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tokio::time::{Duration, sleep};

use super::load_models;
use crate::cli::SubCommandExtend;
use crate::config::{PipelineOptions, ToolOptions, TrendOptions, build_analyzer};
use crate::{Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub pipeline: PipelineOptions,
    #[command(flatten)]
    pub trends: TrendOptions,
    #[command(flatten)]
    pub tools: ToolOptions,
    /// 监听地址
    #[arg(long, default_value = "0.0.0.0:8001")]
    pub addr: String,
    /// 上传大小限制，单位为 MiB
    #[arg(long, value_name = "MIB", default_value_t = 200)]
    pub body_limit: usize,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH")]
    pub prometheus_auth: Option<String>,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let models = load_models(&opts.model_dir).await?;
        for (name, loaded) in models.status() {
            info!("模型 {}: {}", name, if loaded { "已加载" } else { "未加载" });
        }

        let analyzer = build_analyzer(&models, &self.pipeline, &self.trends, &self.tools)?;

        // 创建应用状态
        let state = server::AppState::new(analyzer, models, self)?;

        // 创建应用
        let app = server::create_app(state, self.body_limit * 1024 * 1024);

        if let Some(url) = self.prometheus_push.clone() {
            let instance = self.prometheus_instance.clone().unwrap_or_else(|| self.addr.clone());
            let auth = match &self.prometheus_auth {
                Some(s) => {
                    let (username, password) =
                        s.split_once(':').ok_or_else(|| anyhow!("认证信息格式错误: {}", s))?;
                    Some((username.to_string(), password.to_string()))
                }
                None => None,
            };
            tokio::spawn(async move {
                loop {
                    let metric_families = prometheus::gather();
                    let url = url.clone();
                    let instance = instance.clone();
                    let auth = auth.clone();
                    let r = spawn_blocking(move || {
                        prometheus::push_metrics(
                            "vidlens",
                            labels! {
                                "instance".to_string() => instance.clone(),
                            },
                            &url,
                            metric_families,
                            auth.map(|(username, password)| BasicAuthentication {
                                username,
                                password,
                            }),
                        )
                    })
                    .await;
                    match r {
                        Ok(Err(e)) => error!("推送指标失败: {e}"),
                        Err(e) => error!("推送指标失败: {e}"),
                        Ok(Ok(())) => {}
                    }
                    sleep(Duration::from_secs(30)).await;
                }
            });
        }

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener =
            TcpListener::bind(&self.addr).await.with_context(|| format!("无法监听 {}", self.addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
