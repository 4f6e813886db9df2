//! 工具模块集合
//!
//! 包含CLI、样本扫描、处理编排、格式化等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod constants;
pub mod formatter;
pub mod parallel_processor;
pub mod processor;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchProgress, ConditionStats, failures_by_category};
pub use cli::{AppConfig, build_command, parse_args, show_completion_info, show_startup_info};
pub use formatter::{show_run_completion, write_run_summary};
pub use parallel_processor::process_samples_parallel;
pub use processor::{
    ConditionJob, ConditionReport, RunReport, process_condition, process_sample,
    process_samples_serial, run,
};
pub use scanner::{scan_samples, show_scan_results};
pub use utils::path;
