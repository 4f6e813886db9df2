//! coloc-summary - 定量结果分组统计工具
//!
//! 读取 organoid-coloc 生成的 quantification.csv / quantification_all.csv，
//! 按 条件 x 细胞系 分组输出每个指标的描述统计（NaN 不参与统计）。

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;

// ============================================================================
// 常量定义
// ============================================================================

// 非数值列（标识与运行参数）
const LABEL_COLUMNS: &[&str] = &[
    "File name",
    "Gaussian filter",
    "Threshold type",
    "Condition",
    "Organoid number",
    "Cell line",
    "Degenerate",
];

const CONDITION_COLUMN: &str = "Condition";
const CELL_LINE_COLUMN: &str = "Cell line";

// ============================================================================
// CLI 定义
// ============================================================================

#[derive(Parser)]
#[command(name = "coloc-summary")]
#[command(about = "定量结果分组统计 / Grouped statistics for quantification tables")]
#[command(version)]
struct Cli {
    /// 定量结果CSV路径
    /// Quantification CSV path
    input: PathBuf,

    /// 分组方式
    /// Grouping
    #[arg(long, short = 'g', value_enum, default_value_t = GroupBy::Both)]
    group_by: GroupBy,

    /// 只统计列名包含该子串的指标
    /// Only metrics whose column name contains this substring
    #[arg(long, short = 'm')]
    metric: Option<String>,

    /// 输出格式
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GroupBy {
    Condition,
    CellLine,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

// ============================================================================
// 数据结构
// ============================================================================

/// 描述统计
#[derive(Clone, Debug, Serialize)]
struct Statistics {
    count: usize,
    median: f64,
    average: f64,
    stddev: f64,
    min: f64,
    max: f64,
}

#[derive(Clone, Debug, Serialize)]
struct MetricSummary {
    metric: String,
    stats: Statistics,
}

#[derive(Clone, Debug, Serialize)]
struct GroupSummary {
    condition: Option<String>,
    cell_line: Option<String>,
    samples: usize,
    metrics: Vec<MetricSummary>,
}

#[derive(Clone, Debug, Serialize)]
struct SummaryReport {
    source: String,
    timestamp: String,
    groups: Vec<GroupSummary>,
}

// ============================================================================
// 统计计算
// ============================================================================

/// 计算统计值（NaN 已在调用前剔除）
fn calculate_stats(values: &[f64]) -> Statistics {
    if values.is_empty() {
        return Statistics {
            count: 0,
            median: f64::NAN,
            average: f64::NAN,
            stddev: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }

    let n = values.len() as f64;
    let average = values.iter().sum::<f64>() / n;

    // 样本标准差 (n-1)
    let variance = if values.len() > 1 {
        values.iter().map(|v| (v - average).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let stddev = variance.sqrt();

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let median = if sorted.len() % 2 == 0 {
        let mid = sorted.len() / 2;
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    Statistics {
        count: values.len(),
        median,
        average,
        stddev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    }
}

/// 读取CSV并生成分组报告
fn build_report(cli: &Cli) -> Result<SummaryReport> {
    let mut reader = csv::Reader::from_path(&cli.input)
        .with_context(|| format!("Cannot open / 无法打开: {}", cli.input.display()))?;
    let headers = reader
        .headers()
        .context("Cannot read header / 无法读取表头")?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let condition_idx = column(CONDITION_COLUMN);
    let cell_line_idx = column(CELL_LINE_COLUMN);

    let metric_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !LABEL_COLUMNS.contains(h))
        .filter(|(_, h)| cli.metric.as_deref().is_none_or(|m| h.contains(m)))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    // 分组键 -> (样本数, 每个指标的取值)
    type GroupKey = (Option<String>, Option<String>);
    let mut groups: BTreeMap<GroupKey, (usize, Vec<Vec<f64>>)> = BTreeMap::new();

    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Bad CSV row / CSV行错误: {}", line + 2))?;
        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::to_string);

        let key = match cli.group_by {
            GroupBy::Condition => (field(condition_idx), None),
            GroupBy::CellLine => (None, field(cell_line_idx)),
            GroupBy::Both => (field(condition_idx), field(cell_line_idx)),
        };

        let entry = groups
            .entry(key)
            .or_insert_with(|| (0, vec![Vec::new(); metric_columns.len()]));
        entry.0 += 1;
        for (slot, (idx, _)) in metric_columns.iter().enumerate() {
            if let Some(value) = row.get(*idx).and_then(|v| v.trim().parse::<f64>().ok())
                && !value.is_nan()
            {
                entry.1[slot].push(value);
            }
        }
    }

    let groups = groups
        .into_iter()
        .map(|((condition, cell_line), (samples, values))| GroupSummary {
            condition,
            cell_line,
            samples,
            metrics: metric_columns
                .iter()
                .zip(values)
                .map(|((_, name), values)| MetricSummary {
                    metric: name.clone(),
                    stats: calculate_stats(&values),
                })
                .collect(),
        })
        .collect();

    Ok(SummaryReport {
        source: cli.input.display().to_string(),
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        groups,
    })
}

// ============================================================================
// 输出格式化
// ============================================================================

/// 输出 JSON 格式
fn output_json(report: &SummaryReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("JSON serialization / JSON序列化失败")?
    );
    Ok(())
}

/// 输出终端表格格式
fn output_table(report: &SummaryReport) {
    println!("Quantification Summary / 定量结果统计");
    println!("================================");
    println!("Source / 来源: {}", report.source);
    println!("Timestamp / 时间戳: {}\n", report.timestamp);

    for group in &report.groups {
        let mut title = Vec::new();
        if let Some(condition) = &group.condition {
            title.push(format!("Condition / 条件: {condition}"));
        }
        if let Some(cell_line) = &group.cell_line {
            title.push(format!("Cell line / 细胞系: {cell_line}"));
        }
        println!("{} (n = {})", title.join("  "), group.samples);

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Metric", "n", "Median", "Average", "StdDev", "Min", "Max"]);
        for metric in &group.metrics {
            add_stats_row(&mut table, &metric.metric, &metric.stats, 3);
        }
        println!("{table}\n");
    }
}

/// 添加统计行到表格
fn add_stats_row(table: &mut Table, name: &str, stats: &Statistics, precision: usize) {
    let number = |v: f64| {
        Cell::new(format!("{v:.precision$}")).set_alignment(CellAlignment::Right)
    };
    table.add_row(vec![
        Cell::new(name),
        Cell::new(stats.count).set_alignment(CellAlignment::Right),
        number(stats.median),
        number(stats.average),
        number(stats.stddev),
        number(stats.min),
        number(stats.max),
    ]);
}

// ============================================================================
// 主函数
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    let report = build_report(&cli)?;

    match cli.format {
        OutputFormat::Table => output_table(&report),
        OutputFormat::Json => output_json(&report)?,
    }

    Ok(())
}
