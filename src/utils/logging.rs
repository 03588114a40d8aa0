/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 日志级别由 RUST_LOG 环境变量控制，默认 info。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 记录程序启动信息
pub fn log_startup() {
    info!("{}", "=".repeat(60));
    info!("🚀 QForge 启动 - 题库格式互换与 AI 生成");
    info!("{}", "=".repeat(60));
}

/// 记录一次转换的统计信息
///
/// # 参数
/// - `imported`: 入库题目数
/// - `skipped`: 跳过的块数
/// - `exported`: 导出文件路径
pub fn log_conversion_stats(imported: usize, skipped: usize, exported: &str) {
    info!("{}", "─".repeat(60));
    info!("✅ 导入: {} 题", imported);
    info!("⏭️  跳过: {} 块", skipped);
    info!("📄 已导出至: {}", exported);
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
