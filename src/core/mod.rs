//! 核心算法模块
//!
//! 包含阈值化与共定位定量的核心数据结构和算法实现。

pub mod colocalization;
pub mod histogram;
pub mod record;
pub mod table;
pub mod threshold;

// 重新导出公共接口
pub use colocalization::{ChannelMetrics, PairwiseCoverage, SampleMetrics, TripleMask, quantify};
pub use histogram::IntensityHistogram;
pub use record::{DegenerateWarning, SampleIdentity, SampleRecord};
pub use table::{QuantificationTable, SampleFailure};
pub use threshold::{ChannelOp, ThresholdMode, Thresholder};
