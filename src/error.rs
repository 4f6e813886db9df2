//! 统一错误处理框架
//!
//! 定义定量流程中的错误类型，以及批量处理使用的错误分类。
//! 退化样本（参考通道或标记通道无阳性像素）不属于错误，见 `core::record::DegenerateWarning`。

use std::fmt;
use std::io;

/// 定量流程相关的统一错误类型
#[derive(Debug)]
pub enum ColocError {
    /// 输入验证错误（路径、命令行参数）
    InvalidInput(String),

    /// 配置错误：未知阈值模式、通道命名标记缺失等（启动时即致命）
    Configuration(String),

    /// 同一样本的通道图像尺寸不一致
    ShapeMismatch {
        /// 出错的通道索引（0起）
        channel: usize,
        /// 期望尺寸（宽, 高）
        expected: (u32, u32),
        /// 实际尺寸（宽, 高）
        found: (u32, u32),
    },

    /// 文件I/O错误（通道文件缺失或不可读）
    IoError(io::Error),

    /// 图像格式错误（非单通道灰度、位深不受支持、解码失败）
    FormatError(String),

    /// 结果输出错误（CSV / JSON 序列化失败）
    OutputError(String),
}

impl fmt::Display for ColocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColocError::InvalidInput(msg) => write!(f, "输入验证失败: {msg}"),
            ColocError::Configuration(msg) => write!(f, "配置错误: {msg}"),
            ColocError::ShapeMismatch {
                channel,
                expected,
                found,
            } => write!(
                f,
                "通道尺寸不一致: 通道{} 为 {}x{}，期望 {}x{}",
                channel + 1,
                found.0,
                found.1,
                expected.0,
                expected.1
            ),
            ColocError::IoError(err) => write!(f, "文件I/O错误: {err}"),
            ColocError::FormatError(msg) => write!(f, "图像格式错误: {msg}"),
            ColocError::OutputError(msg) => write!(f, "结果输出失败: {msg}"),
        }
    }
}

impl std::error::Error for ColocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ColocError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ColocError {
    fn from(err: io::Error) -> Self {
        ColocError::IoError(err)
    }
}

impl From<image::ImageError> for ColocError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => ColocError::IoError(e),
            other => ColocError::FormatError(format!("图像解码/编码错误: {other}")),
        }
    }
}

impl From<csv::Error> for ColocError {
    fn from(err: csv::Error) -> Self {
        ColocError::OutputError(format!("CSV写入错误: {err}"))
    }
}

impl From<serde_json::Error> for ColocError {
    fn from(err: serde_json::Error) -> Self {
        ColocError::OutputError(format!("JSON序列化错误: {err}"))
    }
}

/// 定量操作的标准Result类型
pub type ColocResult<T> = Result<T, ColocError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> ColocError {
    ColocError::FormatError(format!("{context}: {err}"))
}

/// 创建配置错误的helper函数
#[inline]
pub fn configuration_error<E: fmt::Display>(context: &str, err: E) -> ColocError {
    ColocError::Configuration(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的错误统计和分析

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, serde::Serialize)]
pub enum ErrorCategory {
    /// 配置相关错误
    Configuration,
    /// 通道尺寸不一致
    Shape,
    /// I/O相关错误（文件不存在、权限不足等）
    Io,
    /// 图像格式相关错误
    Format,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从ColocError提取错误类别
    pub fn from_coloc_error(e: &ColocError) -> Self {
        match e {
            ColocError::Configuration(_) => Self::Configuration,
            ColocError::ShapeMismatch { .. } => Self::Shape,
            ColocError::IoError(_) => Self::Io,
            ColocError::FormatError(_) => Self::Format,
            ColocError::InvalidInput(_) | ColocError::OutputError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Configuration => "配置错误",
            Self::Shape => "尺寸不一致",
            Self::Io => "I/O错误",
            Self::Format => "格式错误",
            Self::Other => "其他错误",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_display() {
        let err = ColocError::ShapeMismatch {
            channel: 2,
            expected: (4, 4),
            found: (4, 5),
        };
        let text = err.to_string();
        assert!(text.contains("通道3"));
        assert!(text.contains("4x5"));
    }

    #[test]
    fn test_category_mapping() {
        let io = ColocError::IoError(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(ErrorCategory::from_coloc_error(&io), ErrorCategory::Io);
        assert!(std::error::Error::source(&io).is_some());

        let cfg = configuration_error("阈值模式", "foo");
        assert_eq!(
            ErrorCategory::from_coloc_error(&cfg),
            ErrorCategory::Configuration
        );
    }
}
