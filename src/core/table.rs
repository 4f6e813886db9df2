//! 定量结果表
//!
//! 按样本处理顺序逐条追加记录，失败样本单独登记，最终一次性写出CSV。
//! 列名由4个通道的显示名称生成。

use crate::core::record::SampleRecord;
use crate::error::{ColocResult, ErrorCategory};
use crate::tools::constants::channel_layout::{
    CHANNEL_COUNT, MARKER_CHANNELS, PAIRWISE_ORDER, REFERENCE_CHANNEL,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// 处理失败的样本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleFailure {
    /// 通道1文件名
    pub file_name: String,
    pub condition: String,
    pub category: ErrorCategory,
    pub message: String,
}

/// 有序定量结果表
#[derive(Debug, Clone)]
pub struct QuantificationTable {
    channel_names: [String; CHANNEL_COUNT],
    records: Vec<SampleRecord>,
    failures: Vec<SampleFailure>,
}

impl QuantificationTable {
    pub fn new(channel_names: [String; CHANNEL_COUNT]) -> Self {
        Self::with_capacity(channel_names, 0)
    }

    /// 按预计样本数预分配
    pub fn with_capacity(channel_names: [String; CHANNEL_COUNT], capacity: usize) -> Self {
        Self {
            channel_names,
            records: Vec::with_capacity(capacity),
            failures: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, record: SampleRecord) {
        self.records.push(record);
    }

    #[inline]
    pub fn push_failure(&mut self, failure: SampleFailure) {
        self.failures.push(failure);
    }

    /// 追加另一张表（用于多条件合并），保持先后顺序
    pub fn merge(&mut self, other: QuantificationTable) {
        self.records.extend(other.records);
        self.failures.extend(other.failures);
    }

    #[inline]
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    #[inline]
    pub fn failures(&self) -> &[SampleFailure] {
        &self.failures
    }

    #[inline]
    pub fn channel_names(&self) -> &[String; CHANNEL_COUNT] {
        &self.channel_names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 表头
    pub fn headers(&self) -> Vec<String> {
        let n = &self.channel_names;
        let reference = &n[REFERENCE_CHANNEL];
        let mask_partners = MARKER_CHANNELS
            .iter()
            .map(|&c| n[c].as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut headers = vec!["File name".to_string()];
        for c in 0..CHANNEL_COUNT {
            headers.push(if c == REFERENCE_CHANNEL {
                format!("{reference} amount (total)")
            } else {
                format!("{} amount normalized by {reference}", n[c])
            });
        }
        for name in n {
            headers.push(format!("{name} mean intensity"));
        }
        for name in n {
            headers.push(format!(
                "{name} colocalized with {mask_partners} (Coverage in %)"
            ));
        }
        for &(from, to) in &PAIRWISE_ORDER {
            headers.push(format!(
                "{} colocalized with {} (Coverage in %)",
                n[from], n[to]
            ));
        }
        headers.extend(
            [
                "Gaussian filter",
                "Threshold type",
                "Condition",
                "Organoid number",
                "Cell line",
                "Degenerate",
            ]
            .map(String::from),
        );
        headers
    }

    /// 单条记录对应的一行
    fn row(record: &SampleRecord) -> Vec<String> {
        let m = &record.metrics;
        let mut row = Vec::with_capacity(25);
        row.push(record.file_name.clone());
        for c in 0..CHANNEL_COUNT {
            let value = m.channel(c).normalized_abundance;
            row.push(if c == REFERENCE_CHANNEL {
                m.channel(c).positive_count.to_string()
            } else {
                format_value(value)
            });
        }
        row.extend(m.channels.iter().map(|c| format_value(c.mean_intensity)));
        row.extend(m.channels.iter().map(|c| format_value(c.mask_coverage)));
        row.extend(m.pairwise.iter().map(|p| format_value(p.percent)));
        row.push(if record.gaussian_blur { "True" } else { "False" }.to_string());
        row.push(record.mode.to_string());
        row.push(record.condition.clone());
        row.push(record.identity.organoid_number.clone());
        row.push(record.identity.cell_line.clone());
        row.push(record.degenerate_label());
        row
    }

    /// 写出到任意Writer
    pub fn write_to<W: Write>(&self, writer: W) -> ColocResult<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.headers())?;
        for record in &self.records {
            csv_writer.write_record(Self::row(record))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// 写出CSV文件（父目录不存在时创建）
    pub fn write_csv(&self, path: &Path) -> ColocResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }
}

/// 数值格式化：NaN 原样写为 `NaN`
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}
