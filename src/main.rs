use clap::Parser;
use vidlens::Opts;
use vidlens::cli::SubCommandExtend;
use vidlens::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Server(cmd) => cmd.run(&opts).await,
        SubCommand::Analyze(cmd) => cmd.run(&opts).await,
        SubCommand::Trends(cmd) => cmd.run(&opts).await,
    }
}
