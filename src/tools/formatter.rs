//! 输出格式化模块
//!
//! 负责控制台进度与结果展示，以及每个条件的运行摘要（JSON）。

use super::batch_state::{ConditionStats, failures_by_category};
use super::cli::AppConfig;
use super::constants::naming::SUMMARY_FILE;
use super::processor::{ConditionJob, ConditionReport, RunReport};
use crate::core::{QuantificationTable, SampleFailure};
use crate::error::{ColocError, ColocResult, ErrorCategory};
use crate::imaging::SampleDescriptor;
use crate::tools::constants::channel_layout::{CHANNEL_COUNT, REFERENCE_CHANNEL};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 单个条件的运行摘要
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    tool_version: &'static str,
    generated_at: String,
    condition: &'a str,
    input_dir: String,
    output_dir: String,
    threshold_mode: &'static str,
    gaussian_blur: bool,
    save_mask: bool,
    save_thresholded: bool,
    force: bool,
    channel_tokens: Vec<String>,
    channel_names: &'a [String; CHANNEL_COUNT],
    records: usize,
    stats: &'a ConditionStats,
    degenerate_samples: Vec<&'a str>,
    failures: &'a [SampleFailure],
}

/// 写出条件的运行摘要，返回文件路径
pub fn write_run_summary(
    job: &ConditionJob,
    config: &AppConfig,
    table: &QuantificationTable,
    stats: &ConditionStats,
) -> ColocResult<PathBuf> {
    let summary = RunSummary {
        tool_version: VERSION,
        generated_at: chrono::Local::now().to_rfc3339(),
        condition: job.label(),
        input_dir: job.input_dir().display().to_string(),
        output_dir: job.output_dir().display().to_string(),
        threshold_mode: config.mode.as_str(),
        gaussian_blur: config.gaussian_blur,
        save_mask: config.save_mask,
        save_thresholded: config.save_thresholded,
        force: config.force,
        channel_tokens: (0..CHANNEL_COUNT).map(|c| config.naming.token(c)).collect(),
        channel_names: &config.channel_names,
        records: table.len(),
        stats,
        degenerate_samples: table
            .records()
            .iter()
            .filter(|r| r.is_degenerate())
            .map(|r| r.file_name.as_str())
            .collect(),
        failures: table.failures(),
    };

    let path = job.output_dir().join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&path, json).map_err(ColocError::IoError)?;
    Ok(path)
}

/// 显示单个样本失败信息
pub fn show_sample_failure(
    sample: &SampleDescriptor,
    error: &ColocError,
    index: usize,
    total: usize,
    verbose: bool,
) {
    let category = ErrorCategory::from_coloc_error(error);
    if verbose {
        println!("   [FAIL] 处理失败 / Processing failed");
        println!("      样本 / Sample: {}", sample.path(0).display());
        println!("      类别 / Category: {}", category.display_name());
        println!("      错误 / Error: {error}");
        if let Some(source) = std::error::Error::source(error) {
            println!("      原因 / Cause: {source}");
        }
    } else {
        // 静默模式：至少显示失败的样本
        println!(
            "[FAIL] [{}/{}] {} - [{}] {error} / 处理失败",
            index + 1,
            total,
            sample.id(),
            category.display_name()
        );
    }
}

/// 构建样本结果概览表（控制台展示用，完整指标见CSV）
pub fn records_overview(table: &QuantificationTable) -> Table {
    let names = table.channel_names();
    let mut overview = Table::new();
    overview.load_preset(UTF8_FULL);
    overview.set_content_arrangement(ContentArrangement::Dynamic);
    overview.set_header(vec![
        "File name / 文件".to_string(),
        "Cell line / 细胞系".to_string(),
        "Organoid / 编号".to_string(),
        format!("{} (total)", names[REFERENCE_CHANNEL]),
        "Triple mask (px)".to_string(),
        "Degenerate / 退化".to_string(),
    ]);

    for record in table.records() {
        let label = record.degenerate_label();
        overview.add_row(vec![
            Cell::new(&record.file_name),
            Cell::new(&record.identity.cell_line),
            Cell::new(&record.identity.organoid_number),
            Cell::new(record.metrics.channel(REFERENCE_CHANNEL).positive_count)
                .set_alignment(CellAlignment::Right),
            Cell::new(record.metrics.mask_count).set_alignment(CellAlignment::Right),
            Cell::new(if label.is_empty() { "-".to_string() } else { label }),
        ]);
    }

    overview
}

/// 显示单个条件的处理结果
pub fn show_condition_results(report: &ConditionReport, config: &AppConfig) {
    let stats = &report.stats;
    let total = stats.total();

    if config.verbose && !report.table.is_empty() {
        println!("{}", records_overview(&report.table));
    }

    println!();
    println!("📊 条件 {} 处理完成 / Condition finished", report.label);
    println!("   成功处理 / Processed: {} / {total}", stats.processed);
    if stats.degenerate > 0 {
        println!("   退化样本 / Degenerate: {}", stats.degenerate);
    }
    if stats.failed > 0 {
        println!("   失败样本 / Failed: {}", stats.failed);
        for (category, files) in failures_by_category(&report.table) {
            println!("      {}: {}", category.display_name(), files.join(", "));
        }
    }
    println!("📄 生成的文件 / Outputs:");
    println!("   🗂️  定量结果 / Table: {}", report.table_path.display());
    println!("   🧾 运行摘要 / Summary: {}", report.summary_path.display());
    println!();
}

/// 显示整个运行的完成信息
pub fn show_run_completion(run: &RunReport) {
    let mut totals = ConditionStats::default();
    for condition in &run.conditions {
        totals.accumulate(&condition.stats);
    }
    let (processed, failed) = (totals.processed, totals.failed);
    println!(
        "✅ 共处理 {} 个条件：{processed} 个样本成功，{failed} 个失败 / {} conditions, {processed} ok, {failed} failed",
        run.conditions.len(),
        run.conditions.len()
    );
    if let Some(path) = &run.combined_path {
        println!("   🗂️  合并结果 / Combined table: {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SampleIdentity, SampleRecord, ThresholdMode, quantify};
    use crate::imaging::{ChannelImage, ChannelSet};

    #[test]
    fn test_records_overview_rows() {
        let img = ChannelImage::from_u8(2, 1, &[3, 0]).unwrap();
        let set = ChannelSet::new([img.clone(), img.clone(), img.clone(), img]).unwrap();
        let (_, metrics) = quantify(&set);

        let mut table = QuantificationTable::new(["a", "b", "DAPI", "d"].map(String::from));
        table.push(SampleRecord {
            file_name: "305_1_C1.tif".to_string(),
            identity: SampleIdentity::parse("305_1_C1"),
            condition: "control".to_string(),
            mode: ThresholdMode::Otsu,
            gaussian_blur: false,
            metrics,
        });

        let rendered = records_overview(&table).to_string();
        assert!(rendered.contains("305_1_C1.tif"));
        assert!(rendered.contains("DAPI (total)"));
    }
}
