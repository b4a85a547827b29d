/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化日志
///
/// # 参数
/// - `level`: 默认日志级别，设置了 `RUST_LOG` 时以环境变量为准
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // 重复初始化（测试中）时忽略
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}

/// 记录任务启动信息
///
/// # 参数
/// - `title`: 任务标题
/// - `details`: 附加信息（键, 值）
pub fn log_startup(title: &str, details: &[(&str, String)]) {
    info!("{}", "=".repeat(60));
    info!("🚀 {}", title);
    for (key, value) in details {
        info!("📋 {}: {}", key, value);
    }
    info!(
        "🕐 开始时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录分块开始信息
///
/// # 参数
/// - `chunk_num`: 分块编号（从1开始）
/// - `total_chunks`: 分块总数
/// - `item_count`: 本块知识条数
pub fn log_chunk_start(chunk_num: usize, total_chunks: usize, item_count: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "📦 处理第 {}/{} 块 ({} 条知识)",
        chunk_num, total_chunks, item_count
    );
    info!("{}", "─".repeat(60));
}

/// 打印生成统计信息
///
/// # 参数
/// - `processed`: 成功处理的分块数
/// - `failed`: 失败的分块数
/// - `written`: 写出的题目数
/// - `output`: 输出文件（dry run 时为 None）
pub fn print_generation_stats(processed: usize, failed: usize, written: usize, output: Option<&str>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 生成完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功分块: {}", processed);
    info!("❌ 失败分块: {}", failed);
    info!("📝 写出题目: {}", written);
    if let Some(path) = output {
        info!("💾 输出文件: {}", path);
    }
    info!("{}", "=".repeat(60));
}

/// 打印导入统计信息
///
/// # 参数
/// - `total`: 题目总数
/// - `by_subject`: 各科目题数（已排序）
pub fn print_import_breakdown(total: usize, by_subject: &[(String, usize)]) {
    info!("\n{}", "─".repeat(60));
    info!("📊 导入题目: {} 道", total);
    for (subject, count) in by_subject {
        info!("  - {}: {} 道", subject, count);
    }
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
