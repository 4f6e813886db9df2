//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 通道布局常量（每个样本固定4个通道）
pub mod channel_layout {
    /// 每个样本的通道数
    pub const CHANNEL_COUNT: usize = 4;

    /// 参考通道（核染色 / DAPI）索引，0起，对应文件中的第3通道
    pub const REFERENCE_CHANNEL: usize = 2;

    /// 三个标记通道索引（0起），对应文件中的第1、2、4通道
    pub const MARKER_CHANNELS: [usize; 3] = [0, 1, 3];

    /// 有向两两共定位的输出顺序：(from, to)
    ///
    /// 百分比分母为 from 通道的阳性像素数
    pub const PAIRWISE_ORDER: [(usize, usize); 6] = [(0, 3), (3, 0), (1, 3), (3, 1), (0, 1), (1, 0)];
}

/// 阈值算法常量
pub mod threshold {
    /// `super_low_intensities_filtered` 及 "greater_1_on_rest" 模式的强度下限
    pub const SUPER_LOW_FLOOR: u16 = 2;

    /// `low_intensities_filtered` 模式的强度下限
    pub const LOW_FLOOR: u16 = 5;

    /// 自适应阈值的邻域窗口边长（像素，奇数）
    pub const ADAPTIVE_BLOCK_SIZE: usize = 21;

    /// 自适应阈值的均值偏移量
    pub const ADAPTIVE_OFFSET: f64 = 0.0;

    /// 自适应阈值的输出前景值（与位深无关，固定为255）
    pub const ADAPTIVE_FOREGROUND: u16 = 255;

    /// 5x5 高斯核的一维系数（和为16，二维归一化因子256）
    pub const GAUSSIAN_KERNEL_5: [u32; 5] = [1, 4, 6, 4, 1];
}

/// 文件命名常量
pub mod naming {
    /// 默认通道前缀（显微镜导出的 "C" 表示 channel）
    pub const DEFAULT_PREFIX: &str = "C";

    /// 默认通道后缀
    pub const DEFAULT_SUFFIXES: [&str; 4] = ["1", "2", "3", "4"];

    /// 默认通道显示名称
    pub const DEFAULT_CHANNEL_NAMES: [&str; 4] = ["ch1", "ch2", "ch3", "ch4"];

    /// 支持的输入扩展名
    pub const SUPPORTED_EXTENSIONS: &[&str] = &["tif", "tiff"];

    /// 阈值化输出文件标记
    pub const THRESHOLDED_TAG: &str = "thresholded";

    /// 三重共定位掩膜文件标记
    pub const MASK_TAG: &str = "mask_ch1_ch2_ch4";

    /// 输出图像扩展名
    pub const OUTPUT_EXTENSION: &str = "tif";

    /// 文件标识拆分分隔符（细胞系 / 类器官编号）
    pub const IDENTITY_DELIMITER: char = '_';

    /// 单个条件的定量结果表
    pub const QUANTIFICATION_FILE: &str = "quantification.csv";

    /// 单个条件的运行摘要
    pub const SUMMARY_FILE: &str = "run_summary.json";

    /// 多条件合并结果目录
    pub const COMPARISON_DIR: &str = "comparison_results";

    /// 多条件合并结果表
    pub const COMBINED_FILE: &str = "quantification_all.csv";
}

/// 默认配置值
pub mod defaults {
    /// 默认多样本并行并发度
    ///
    /// 仅在显式启用 `--parallel-files` 但未给出数值时使用
    pub const PARALLEL_FILES_DEGREE: usize = 4;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 单个16位样本约占 4 x 宽 x 高 x 2 字节，过高并发会放大内存峰值
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}
