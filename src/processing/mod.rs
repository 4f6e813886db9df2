//! 图像邻域运算模块
//!
//! 阈值流程中用到的两个等尺寸邻域运算：
//! - 5x5 高斯平滑（可选预处理）
//! - 21x21 局部均值自适应阈值（`adaptive` 模式）

pub mod adaptive_mean;
pub mod gaussian_blur;

// 重新导出公共接口
pub use adaptive_mean::adaptive_mean_threshold;
pub use gaussian_blur::gaussian_blur_5x5;
