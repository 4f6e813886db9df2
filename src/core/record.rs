//! 样本记录
//!
//! 一条记录 = 样本标识 + 运行参数 + 指标，创建后不再修改。

use crate::core::colocalization::SampleMetrics;
use crate::core::threshold::ThresholdMode;
use crate::tools::constants::naming::IDENTITY_DELIMITER;
use serde::Serialize;
use std::fmt;

/// 退化样本警告（不是错误：记录照常输出，未定义值记为NaN）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DegenerateWarning {
    /// 参考通道无阳性像素，归一化丰度无定义
    EmptyReference,
    /// 某标记通道无阳性像素
    EmptyMarker { channel: usize },
}

impl fmt::Display for DegenerateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateWarning::EmptyReference => f.write_str("empty_reference"),
            DegenerateWarning::EmptyMarker { channel } => {
                write!(f, "empty_marker_ch{}", channel + 1)
            }
        }
    }
}

/// 由文件标识拆分出的细胞系与类器官编号
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SampleIdentity {
    pub cell_line: String,
    pub organoid_number: String,
}

impl SampleIdentity {
    /// 按 `_` 拆分标识主干：字段0为细胞系，字段1为类器官编号
    ///
    /// 字段缺失时返回空字符串，由调用方决定是否告警。
    pub fn parse(stem: &str) -> Self {
        let mut fields = stem.split(IDENTITY_DELIMITER);
        let cell_line = fields.next().unwrap_or_default().to_string();
        let organoid_number = fields.next().unwrap_or_default().to_string();
        Self {
            cell_line,
            organoid_number,
        }
    }

    /// 两个字段是否都存在
    pub fn is_complete(&self) -> bool {
        !self.cell_line.is_empty() && !self.organoid_number.is_empty()
    }
}

/// 单个样本的定量记录
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// 文件标识（通道1文件名）
    pub file_name: String,
    pub identity: SampleIdentity,
    /// 条件标签（条件目录名）
    pub condition: String,
    pub mode: ThresholdMode,
    pub gaussian_blur: bool,
    pub metrics: SampleMetrics,
}

impl SampleRecord {
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.metrics.is_degenerate()
    }

    /// 退化标记文本（多个警告以 `;` 连接，无警告为空）
    pub fn degenerate_label(&self) -> String {
        self.metrics
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}
