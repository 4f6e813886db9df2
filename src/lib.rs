//! Organoid Colocalization Tool
//!
//! 类器官四通道荧光图像的阈值化与共定位定量工具。
//!
//! ## 核心特性
//! - 8种阈值模式（Otsu / Triangle / 局部均值自适应 / 强度下限及其组合），可选5x5高斯预平滑
//! - 三个标记通道的三重共定位掩膜
//! - 以核染色参考通道归一化的标记丰度、阳性像素平均强度
//! - 掩膜覆盖率与六个有向两两覆盖率
//! - 多条件批量处理，可选样本级并行，结果顺序与串行一致

pub mod core;
pub mod error;
pub mod imaging;
pub mod processing;
pub mod tools;

// 重新导出核心类型
pub use core::{
    QuantificationTable, SampleMetrics, SampleRecord, ThresholdMode, Thresholder, TripleMask,
    quantify,
};
pub use error::{ColocError, ColocResult, ErrorCategory};
pub use imaging::{BitDepth, ChannelImage, ChannelNaming, ChannelSet, SampleDescriptor};
