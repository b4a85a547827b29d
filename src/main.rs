use question_pipeline::{cli, utils::logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 先解析参数，取得日志级别
    let cli = cli::parse_cli();

    // 初始化日志
    logging::init(&cli.log_level);

    cli::run_with_cli(cli).await
}
