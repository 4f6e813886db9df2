//! 样本处理模块
//!
//! 负责单个样本的读取、阈值化、定量与结果持久化，
//! 以及条件目录级别和多条件运行级别的流程编排。

use super::batch_state::{BatchProgress, ConditionStats};
use super::cli::AppConfig;
use super::constants::naming::{COMBINED_FILE, COMPARISON_DIR, QUANTIFICATION_FILE};
use super::{formatter, parallel_processor, scanner, utils};
use crate::core::{
    QuantificationTable, SampleFailure, SampleIdentity, SampleRecord, Thresholder, quantify,
};
use crate::error::{ColocError, ColocResult, ErrorCategory};
use crate::imaging::{
    ChannelImage, ChannelSet, OutputNaming, SampleDescriptor, WriteOutcome, read_channel_image,
    write_channel_image, write_channel_image_if_absent,
};
use crate::tools::constants::channel_layout::CHANNEL_COUNT;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 单个条件目录的处理上下文
#[derive(Debug, Clone)]
pub struct ConditionJob {
    label: String,
    input_dir: PathBuf,
    output: OutputNaming,
}

impl ConditionJob {
    /// 由条件目录创建上下文：标签为目录名，输出目录为同级的 `<名称>_thresholded_<模式>`
    pub fn new(input_dir: &Path, config: &AppConfig) -> ColocResult<Self> {
        let label = input_dir
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ColocError::InvalidInput(format!("无法识别条件目录名: {}", input_dir.display()))
            })?
            .to_string();

        let output_dir = utils::get_parent_dir(input_dir)
            .join(format!("{label}_thresholded_{}", config.mode));

        Ok(Self {
            label,
            input_dir: input_dir.to_path_buf(),
            output: OutputNaming::new(output_dir, config.gaussian_blur, config.mode.as_str()),
        })
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    #[inline]
    pub fn output_dir(&self) -> &Path {
        self.output.out_dir()
    }

    #[inline]
    pub fn output_naming(&self) -> &OutputNaming {
        &self.output
    }
}

/// 单个条件的处理结果
#[derive(Debug)]
pub struct ConditionReport {
    pub label: String,
    pub output_dir: PathBuf,
    pub table_path: PathBuf,
    pub summary_path: PathBuf,
    pub table: QuantificationTable,
    pub stats: ConditionStats,
}

/// 一次运行（可能包含多个条件）的处理结果
#[derive(Debug)]
pub struct RunReport {
    pub conditions: Vec<ConditionReport>,
    /// 多条件时生成的合并结果表
    pub combined_path: Option<PathBuf>,
}

/// 获取样本的四通道阈值化结果
///
/// 四个阈值化文件均已存在且未要求强制重算时直接复用，否则从原始通道计算。
fn load_or_threshold(
    sample: &SampleDescriptor,
    job: &ConditionJob,
    config: &AppConfig,
) -> ColocResult<ChannelSet> {
    let naming = job.output_naming();
    let cached: [PathBuf; CHANNEL_COUNT] =
        std::array::from_fn(|c| naming.thresholded_path(sample, c));

    if !config.force && cached.iter().all(|p| p.is_file()) {
        debug!(sample = sample.id(), "复用已有阈值化结果");
        let [c0, c1, c2, c3] = &cached;
        return ChannelSet::new([
            read_channel_image(c0)?,
            read_channel_image(c1)?,
            read_channel_image(c2)?,
            read_channel_image(c3)?,
        ]);
    }

    let [p0, p1, p2, p3] = sample.paths();
    let raw: [ChannelImage; CHANNEL_COUNT] = [
        read_channel_image(p0)?,
        read_channel_image(p1)?,
        read_channel_image(p2)?,
        read_channel_image(p3)?,
    ];

    let thresholded =
        Thresholder::new(config.mode, config.gaussian_blur).threshold_channels(raw)?;

    if config.save_thresholded {
        std::fs::create_dir_all(job.output_dir())?;
        for (channel, path) in cached.iter().enumerate() {
            write_channel_image(path, thresholded.channel(channel))?;
        }
    }

    Ok(thresholded)
}

/// 处理单个样本：校验 → 阈值化 → 定量 → 掩膜保存 → 生成记录
pub fn process_sample(
    sample: &SampleDescriptor,
    job: &ConditionJob,
    config: &AppConfig,
) -> ColocResult<SampleRecord> {
    sample.validate()?;

    let channels = load_or_threshold(sample, job, config)?;
    let (mask, metrics) = quantify(&channels);

    if config.save_mask {
        std::fs::create_dir_all(job.output_dir())?;
        let mask_path = job.output_naming().mask_path(sample);
        let depth = channels.channel(0).depth();
        match write_channel_image_if_absent(&mask_path, &mask.to_image(depth))? {
            WriteOutcome::Written => debug!(path = %mask_path.display(), "掩膜已保存"),
            WriteOutcome::Skipped => debug!(path = %mask_path.display(), "掩膜已存在，跳过"),
        }
    }

    let identity = SampleIdentity::parse(sample.id_stem());
    if !identity.is_complete() {
        warn!(
            sample = sample.id(),
            "文件名无法拆分出细胞系与类器官编号，缺失字段记为空"
        );
    }

    for warning in &metrics.warnings {
        warn!(sample = sample.id(), %warning, "退化样本，未定义的比值记为NaN");
    }

    Ok(SampleRecord {
        file_name: sample.id().to_string(),
        identity,
        condition: job.label().to_string(),
        mode: config.mode,
        gaussian_blur: config.gaussian_blur,
        metrics,
    })
}

/// 串行处理样本列表，结果顺序与输入一致
pub fn process_samples_serial(
    samples: &[SampleDescriptor],
    job: &ConditionJob,
    config: &AppConfig,
) -> Vec<ColocResult<SampleRecord>> {
    let progress = BatchProgress::new(samples.len());
    let mut results = Vec::with_capacity(samples.len());

    for (index, sample) in samples.iter().enumerate() {
        if config.verbose {
            println!(
                "[PROCESSING] [{}/{}] 处理 / Processing: {}",
                index + 1,
                progress.total(),
                sample.id()
            );
        }

        let result = process_sample(sample, job, config);
        progress.tick();
        match &result {
            Ok(_) => {
                if config.verbose {
                    println!("   [OK] 处理成功 / Processing succeeded");
                }
            }
            Err(e) => {
                formatter::show_sample_failure(sample, e, index, progress.total(), config.verbose);
            }
        }
        results.push(result);
    }

    results
}

/// 将有序的样本结果汇总为结果表
fn collect_table(
    samples: &[SampleDescriptor],
    results: Vec<ColocResult<SampleRecord>>,
    job: &ConditionJob,
    config: &AppConfig,
) -> QuantificationTable {
    let mut table = QuantificationTable::with_capacity(config.channel_names.clone(), samples.len());
    for (sample, result) in samples.iter().zip(results) {
        match result {
            Ok(record) => table.push(record),
            Err(e) => table.push_failure(SampleFailure {
                file_name: sample.id().to_string(),
                condition: job.label().to_string(),
                category: ErrorCategory::from_coloc_error(&e),
                message: e.to_string(),
            }),
        }
    }
    table
}

/// 处理单个条件目录：扫描样本、逐样本定量、写出结果表与运行摘要
///
/// 单个样本失败只记录在结果中，不中断整个条件。
pub fn process_condition(condition_dir: &Path, config: &AppConfig) -> ColocResult<ConditionReport> {
    let job = ConditionJob::new(condition_dir, config)?;
    info!(condition = job.label(), mode = %config.mode, "开始处理条件");

    let samples = scanner::scan_samples(condition_dir, &config.naming)?;
    scanner::show_scan_results(condition_dir, &samples, config.verbose);

    let results = match config.parallel_files {
        Some(requested) => {
            let degree = utils::effective_parallel_degree(requested, Some(samples.len()));
            if degree <= 1 {
                if config.verbose {
                    println!("[INFO] 并发度为1，使用串行模式 / Parallelism=1, using serial mode");
                }
                process_samples_serial(&samples, &job, config)
            } else {
                parallel_processor::process_samples_parallel(&samples, &job, config, degree)
                    .unwrap_or_else(|e| {
                        eprintln!(
                            "[WARNING] 并行处理失败 / Parallel processing failed: {e}，回退到串行模式 / fallback to serial"
                        );
                        process_samples_serial(&samples, &job, config)
                    })
            }
        }
        None => process_samples_serial(&samples, &job, config),
    };

    let table = collect_table(&samples, results, &job, config);
    let stats = ConditionStats::from_table(&table);

    std::fs::create_dir_all(job.output_dir())?;
    let table_path = job.output_dir().join(QUANTIFICATION_FILE);
    table.write_csv(&table_path)?;
    let summary_path = formatter::write_run_summary(&job, config, &table, &stats)?;

    info!(
        condition = job.label(),
        processed = stats.processed,
        failed = stats.failed,
        "条件处理完成"
    );

    Ok(ConditionReport {
        label: job.label().to_string(),
        output_dir: job.output_dir().to_path_buf(),
        table_path,
        summary_path,
        table,
        stats,
    })
}

/// 合并结果表的默认路径：`<首个条件的上级目录>/comparison_results/<模式>/quantification_all.csv`
pub fn combined_output_path(config: &AppConfig) -> PathBuf {
    config.output_path.clone().unwrap_or_else(|| {
        let root = config
            .conditions
            .first()
            .map(|dir| utils::get_parent_dir(dir).to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        root.join(COMPARISON_DIR)
            .join(config.mode.as_str())
            .join(COMBINED_FILE)
    })
}

/// 运行全部条件
///
/// 条件目录本身不可读时整个运行失败；样本级失败只记录。
pub fn run(config: &AppConfig) -> ColocResult<RunReport> {
    let mut reports = Vec::with_capacity(config.conditions.len());
    for condition_dir in &config.conditions {
        let report = process_condition(condition_dir, config)?;
        formatter::show_condition_results(&report, config);
        reports.push(report);
    }

    let combined_path = if config.is_multi_condition() {
        let mut combined = QuantificationTable::with_capacity(
            config.channel_names.clone(),
            reports.iter().map(|r| r.table.len()).sum(),
        );
        for report in &reports {
            combined.merge(report.table.clone());
        }
        let path = combined_output_path(config);
        combined.write_csv(&path)?;
        info!(path = %path.display(), records = combined.len(), "合并结果表已写出");
        Some(path)
    } else {
        None
    };

    Ok(RunReport {
        conditions: reports,
        combined_path,
    })
}
