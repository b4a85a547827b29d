//! 命令行入口
//!
//! 每个子命令只负责组装配置与参数，具体逻辑委托编排层。

use anyhow::bail;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::info;

use crate::clients::{LlmClient, QuestionGenerator, StorageClient};
use crate::config::Config;
use crate::models::GenreCatalog;
use crate::orchestrator::{
    merge_file, prepare_batch, shuffle_file, submit_batch, GenerationOptions, GenerationRunner,
};
use crate::services::GenerationMode;

/// 四选一题目流水线：生成、导入、合并、乱序
#[derive(Parser, Debug)]
#[command(name = "question-pipeline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 日志级别 (trace, debug, info, warn, error)，RUST_LOG 优先
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// 由知识数据生成题目 TSV
    #[command(alias = "gen")]
    Generate(GenerateArgs),
    /// 校验并导入题目到存储服务
    Import(ImportArgs),
    /// 合并 Markdown 文档中的 JSON 块
    Merge(MergeArgs),
    /// 乱序题库中所有题目的选项
    Shuffle(ShuffleArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// 知识数据 JSON 文件（文件名即分类ID，如 JP01.json）
    pub file: PathBuf,

    /// 生成模式，缺省取配置
    #[arg(short, long, value_enum)]
    pub mode: Option<GenerationMode>,

    /// 每块知识条数，缺省取配置
    #[arg(long)]
    pub chunk_size: Option<NonZeroUsize>,

    /// 输出目录，缺省取配置
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// 只构建提示词，不调用生成服务
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// 导入文件（.tsv / .json / .md），可指定多个
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// 批次ID，缺省按当前时间生成
    #[arg(long)]
    pub batch_id: Option<String>,

    /// 只校验，不提交
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Markdown 文档
    pub file: PathBuf,

    /// 输出路径，缺省为 <stem>.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ShuffleArgs {
    /// 题库 JSON 文件
    pub file: PathBuf,

    /// 输出路径，缺省为 <stem>_shuffled.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 随机种子
    #[arg(long)]
    pub seed: Option<u64>,
}

/// 解析命令行参数
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// 执行已解析的命令
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref()).await?;
    tracing::debug!("配置: {:?}", config);

    match cli.command {
        Commands::Generate(args) => run_generate(&config, args).await,
        Commands::Import(args) => run_import(&config, args).await,
        Commands::Merge(args) => {
            let summary = merge_file(&args.file, args.output.as_deref()).await?;
            if summary.output_file.is_none() {
                bail!("未在 {} 中找到JSON代码块", args.file.display());
            }
            Ok(())
        }
        Commands::Shuffle(args) => {
            let distribution = shuffle_file(&args.file, args.output.as_deref(), args.seed).await?;
            if distribution.unresolved > 0 {
                bail!("{} 道题无法确定正确答案，未乱序", distribution.unresolved);
            }
            Ok(())
        }
    }
}

async fn run_generate(config: &Config, args: GenerateArgs) -> anyhow::Result<()> {
    let catalog = GenreCatalog::builtin();
    let options = GenerationOptions {
        knowledge_file: args.file,
        mode: args.mode.unwrap_or(config.default_mode),
        chunk_size: args.chunk_size.unwrap_or(config.default_chunk_size),
        output_dir: args.output_dir.unwrap_or_else(|| config.output_dir.clone()),
        system_instruction_file: config.system_instruction_file.clone(),
        cooldown: config.chunk_cooldown(),
    };
    let runner = GenerationRunner::new(&catalog, options);

    let client = if args.dry_run {
        None
    } else {
        Some(LlmClient::new(config)?)
    };
    let generator = client.as_ref().map(|c| c as &dyn QuestionGenerator);

    let summary = runner.run(generator).await?;
    if summary.failed_chunks > 0 {
        bail!(
            "{}/{} 个分块生成失败",
            summary.failed_chunks,
            summary.total_chunks
        );
    }
    Ok(())
}

async fn run_import(config: &Config, args: ImportArgs) -> anyhow::Result<()> {
    let batch = prepare_batch(&args.files, args.batch_id.as_deref()).await?;

    if args.dry_run {
        info!("[DRY RUN] 批次 {} 校验通过，未提交", batch.id);
        return Ok(());
    }

    let store = StorageClient::new(config)?;
    submit_batch(&store, &batch).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "question-pipeline",
            "generate",
            "KNOWLEDGE/jp/JP01.json",
            "--mode",
            "standard",
            "--chunk-size",
            "5",
            "--dry-run",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.mode, Some(GenerationMode::Standard));
        assert_eq!(args.chunk_size.map(NonZeroUsize::get), Some(5));
        assert!(args.dry_run);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(Cli::try_parse_from(["question-pipeline", "generate", "a.json", "--chunk-size", "0"]).is_err());
    }

    #[test]
    fn test_parse_import_multiple_files() {
        let cli = Cli::try_parse_from([
            "question-pipeline",
            "--log-level",
            "debug",
            "import",
            "a.tsv",
            "b.json",
            "--batch-id",
            "batch_manual",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Commands::Import(args) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.batch_id.as_deref(), Some("batch_manual"));
    }

    #[test]
    fn test_import_requires_a_file() {
        assert!(Cli::try_parse_from(["question-pipeline", "import"]).is_err());
    }

    #[test]
    fn test_parse_shuffle_seed() {
        let cli = Cli::try_parse_from(["question-pipeline", "shuffle", "book.json", "--seed", "42"]).unwrap();
        let Commands::Shuffle(args) = cli.command else {
            panic!("expected shuffle");
        };
        assert_eq!(args.seed, Some(42));
    }
}
