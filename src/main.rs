//! Organoid Coloc Tool - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成阈值化与共定位定量任务。

use organoid_coloc_tool::{
    error::{ColocError, ErrorCategory},
    tools,
};
use std::process;
use tracing_subscriber::EnvFilter;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 配置/输入错误
    pub const CONFIGURATION_ERROR: i32 = 2;
    /// 图像格式错误
    pub const FORMAT_ERROR: i32 = 3;
    /// 通道尺寸不一致
    pub const SHAPE_ERROR: i32 = 4;
    /// 结果输出错误
    pub const OUTPUT_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &ColocError) -> &'static str {
    // 优先通过具体错误类型匹配，提供更精确的建议
    match error {
        ColocError::InvalidInput(_) => {
            "检查命令行参数是否正确，使用 --help 查看完整用法 / Check if command-line arguments are correct, use --help to see full usage"
        }
        ColocError::OutputError(_) => {
            "检查输出目录是否可写 / Check that the output directory is writable"
        }
        // 对于其他错误，使用分类建议
        _ => match ErrorCategory::from_coloc_error(error) {
            ErrorCategory::Configuration => {
                "检查 --mode、--prefix、--suffixes 参数 / Check --mode, --prefix and --suffixes"
            }
            ErrorCategory::Shape => {
                "同一样本的四个通道必须尺寸一致 / All four channels of a sample must share dimensions"
            }
            ErrorCategory::Io => {
                "检查目录路径是否正确，文件是否存在且可读 / Check that paths exist and are readable"
            }
            ErrorCategory::Format => {
                "输入应为单通道8位或16位灰度TIFF / Inputs must be single-channel 8/16-bit grayscale TIFF"
            }
            ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input files and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: ColocError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");

    let category = ErrorCategory::from_coloc_error(&error);
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    if matches!(category, ErrorCategory::Configuration) {
        eprintln!(
            "   Threshold modes / 阈值模式: {}",
            organoid_coloc_tool::ThresholdMode::names().join(", ")
        );
    }

    let exit_code = match &error {
        ColocError::InvalidInput(_) => exit_codes::CONFIGURATION_ERROR,
        ColocError::OutputError(_) => exit_codes::OUTPUT_ERROR,
        _ => match category {
            ErrorCategory::Configuration => exit_codes::CONFIGURATION_ERROR,
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Shape => exit_codes::SHAPE_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 初始化日志：默认info，--verbose时debug，RUST_LOG优先
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), ColocError> {
    // 1. 解析命令行参数（阈值模式与命名规则在此校验，任何样本处理前失败）
    let config = tools::parse_args()?;
    init_tracing(config.verbose);

    // 2. 显示启动信息
    tools::show_startup_info(&config);

    // 3. 逐条件处理
    let report = tools::run(&config)?;
    tools::show_run_completion(&report);

    tools::show_completion_info(&config);
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}
