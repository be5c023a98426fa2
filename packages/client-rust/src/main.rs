use clap::Parser;
use cms_admin_client::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.json_logs);
    cli::run(cli).await
}
