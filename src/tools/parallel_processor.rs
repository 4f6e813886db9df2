//! 多样本并行处理模块
//!
//! 使用rayon实现样本级并行处理，保证结果顺序与串行一致

use super::batch_state::BatchProgress;
use super::cli::AppConfig;
use super::formatter;
use super::processor::{ConditionJob, process_sample};
use crate::core::SampleRecord;
use crate::error::{ColocResult, configuration_error};
use crate::imaging::SampleDescriptor;
use rayon::prelude::*;

/// 有序结果容器（保证输出顺序）
struct OrderedResult {
    /// 原始样本索引（用于排序）
    index: usize,

    /// 处理结果
    result: ColocResult<SampleRecord>,
}

/// 多样本并行处理
///
/// 核心特性：
/// - 使用rayon线程池精确控制并发度
/// - 共享完成计数，仅用于进度显示（统计由有序结果表派生）
/// - 索引排序保证结果顺序与串行模式完全一致
pub fn process_samples_parallel(
    samples: &[SampleDescriptor],
    job: &ConditionJob,
    config: &AppConfig,
    parallel_degree: usize,
) -> ColocResult<Vec<ColocResult<SampleRecord>>> {
    println!("⚡ 启用多样本并行处理：{parallel_degree} 并发度");

    let progress = BatchProgress::new(samples.len());

    // 自定义rayon线程池（精确控制并发度）
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_degree)
        .thread_name(|i| format!("coloc-worker-{i}"))
        .build()
        .map_err(|e| configuration_error("线程池创建失败", e))?;

    let results: Vec<OrderedResult> = pool.install(|| {
        samples
            .par_iter()
            .enumerate()
            .map(|(index, sample)| {
                // 简短进度提示（避免并发输出混乱）
                if !config.verbose {
                    print!(".");
                    use std::io::Write;
                    std::io::stdout().flush().ok();
                }

                let result = process_sample(sample, job, config);
                let completed = progress.tick();

                match &result {
                    Ok(_) => {
                        if config.verbose {
                            println!("✅ [{completed}/{}] {}", progress.total(), sample.id());
                        }
                    }
                    Err(e) => {
                        formatter::show_sample_failure(
                            sample,
                            e,
                            index,
                            progress.total(),
                            config.verbose,
                        );
                    }
                }

                OrderedResult { index, result }
            })
            .collect()
    });

    if !config.verbose {
        println!(); // 进度点换行
    }

    // 按原始顺序排序（关键：保证输出顺序）
    let mut sorted = results;
    sorted.sort_by_key(|r| r.index);

    Ok(sorted.into_iter().map(|r| r.result).collect())
}
