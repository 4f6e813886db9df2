//! 批处理状态
//!
//! 处理过程中只维护一个完成计数用于进度显示。
//! 成功/失败/退化统计与失败分类在条件处理结束后由有序结果表派生，
//! 因此串行与并行运行得到完全相同的统计与摘要。

use crate::core::QuantificationTable;
use crate::error::ErrorCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 条件级统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConditionStats {
    /// 成功输出记录的样本数
    pub processed: usize,
    /// 失败的样本数
    pub failed: usize,
    /// 成功但带退化警告的样本数（同时计入 processed）
    pub degenerate: usize,
}

impl ConditionStats {
    /// 由结果表计算统计
    pub fn from_table(table: &QuantificationTable) -> Self {
        Self {
            processed: table.len(),
            failed: table.failures().len(),
            degenerate: table.records().iter().filter(|r| r.is_degenerate()).count(),
        }
    }

    /// 扫描到的样本总数
    #[inline]
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    /// 累加另一个条件的统计（多条件运行汇总用）
    pub fn accumulate(&mut self, other: &ConditionStats) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.degenerate += other.degenerate;
    }
}

/// 按错误类别分组的失败样本名，组内保持结果表中的样本顺序
pub fn failures_by_category(table: &QuantificationTable) -> BTreeMap<ErrorCategory, Vec<&str>> {
    let mut groups: BTreeMap<ErrorCategory, Vec<&str>> = BTreeMap::new();
    for failure in table.failures() {
        groups
            .entry(failure.category)
            .or_default()
            .push(failure.file_name.as_str());
    }
    groups
}

/// 样本完成进度（克隆后在工作线程间共享同一计数）
#[derive(Debug, Clone)]
pub struct BatchProgress {
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total,
        }
    }

    /// 记录一个样本完成，返回当前完成数（1起）
    #[inline]
    pub fn tick(&self) -> usize {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SampleFailure, SampleIdentity, SampleRecord, ThresholdMode, quantify};
    use crate::imaging::{BitDepth, ChannelImage, ChannelSet};

    fn record(file_name: &str, empty_reference: bool) -> SampleRecord {
        let positive = ChannelImage::from_u8(2, 1, &[7, 0]).unwrap();
        let reference = if empty_reference {
            ChannelImage::zeros(2, 1, BitDepth::Eight)
        } else {
            positive.clone()
        };
        let set = ChannelSet::new([positive.clone(), positive.clone(), reference, positive])
            .unwrap();
        SampleRecord {
            file_name: file_name.to_string(),
            identity: SampleIdentity::parse(file_name),
            condition: "control".to_string(),
            mode: ThresholdMode::Otsu,
            gaussian_blur: false,
            metrics: quantify(&set).1,
        }
    }

    fn failure(file_name: &str, category: ErrorCategory) -> SampleFailure {
        SampleFailure {
            file_name: file_name.to_string(),
            condition: "control".to_string(),
            category,
            message: "test".to_string(),
        }
    }

    fn sample_table() -> QuantificationTable {
        let mut table = QuantificationTable::new(["a", "b", "c", "d"].map(String::from));
        table.push(record("305_1_C1.tif", false));
        table.push_failure(failure("305_2_C1.tif", ErrorCategory::Io));
        table.push(record("306_1_C1.tif", true));
        table.push_failure(failure("306_2_C1.tif", ErrorCategory::Shape));
        table.push_failure(failure("307_1_C1.tif", ErrorCategory::Io));
        table
    }

    #[test]
    fn test_stats_from_table() {
        let stats = ConditionStats::from_table(&sample_table());
        assert_eq!(
            stats,
            ConditionStats {
                processed: 2,
                failed: 3,
                degenerate: 1,
            }
        );
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_stats_of_empty_table() {
        let table = QuantificationTable::new(["a", "b", "c", "d"].map(String::from));
        assert_eq!(ConditionStats::from_table(&table), ConditionStats::default());
    }

    #[test]
    fn test_accumulate() {
        let mut total = ConditionStats::default();
        let one = ConditionStats::from_table(&sample_table());
        total.accumulate(&one);
        total.accumulate(&one);
        assert_eq!(total.processed, 4);
        assert_eq!(total.failed, 6);
        assert_eq!(total.degenerate, 2);
    }

    #[test]
    fn test_failures_grouped_in_table_order() {
        let table = sample_table();
        let groups = failures_by_category(&table);

        let categories: Vec<_> = groups.keys().copied().collect();
        assert_eq!(categories, vec![ErrorCategory::Shape, ErrorCategory::Io]);
        assert_eq!(groups[&ErrorCategory::Io], vec!["305_2_C1.tif", "307_1_C1.tif"]);
        assert_eq!(groups[&ErrorCategory::Shape], vec!["306_2_C1.tif"]);
    }

    #[test]
    fn test_progress_shared_across_threads() {
        use rayon::prelude::*;

        let progress = BatchProgress::new(100);
        let ticks: Vec<usize> = (0..100)
            .into_par_iter()
            .map(|_| progress.clone().tick())
            .collect();

        assert_eq!(progress.completed(), 100);
        assert_eq!(progress.total(), 100);
        let mut sorted = ticks;
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=100).collect::<Vec<_>>());
    }
}
