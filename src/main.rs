use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use qforge::codecs::ExportFormat;
use qforge::models::QuestionBank;
use qforge::services::{ExportService, ImportService, TaxonomyService};
use qforge::store::{BankStore, MemoryStore};
use qforge::utils::logging;

const CLI_USER: &str = "cli";

/// 命令行格式转换器：读入一种题目格式，写出另一种
#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();
    logging::log_startup();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        eprintln!("uso: qforge <entrada> <gift|aiken|moodle> <saída> <gift|aiken|moodle>");
        std::process::exit(2);
    }

    let input_path = &args[1];
    let input_format = ExportFormat::parse(&args[2])?;
    let output_path = &args[3];
    let output_format = ExportFormat::parse(&args[4])?;

    let raw = std::fs::read_to_string(input_path)
        .with_context(|| format!("não foi possível ler {}", input_path))?;

    // 转换通过内存存储走完整的导入/导出流程，和服务端行为一致
    let store = Arc::new(MemoryStore::new());
    let bank_title = Path::new(input_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("banco")
        .to_string();
    let bank = store
        .insert_bank(QuestionBank::new(bank_title, CLI_USER))
        .await?;

    let taxonomy = Arc::new(TaxonomyService::new(store.clone()));
    let importer = ImportService::new(store.clone(), store.clone(), taxonomy.clone());
    let exporter = ExportService::new(store.clone(), store.clone(), taxonomy);

    let report = importer
        .import(CLI_USER, &bank.id, input_format, &raw)
        .await?;
    let payload = exporter
        .export(CLI_USER, &bank.id, output_format, None)
        .await?;

    std::fs::write(output_path, &payload.content)
        .with_context(|| format!("não foi possível escrever {}", output_path))?;

    logging::log_conversion_stats(report.questions.len(), report.skipped_count, output_path);
    Ok(())
}
