//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use super::constants::defaults::PARALLEL_FILES_DEGREE;
use super::constants::naming::{DEFAULT_CHANNEL_NAMES, DEFAULT_PREFIX, DEFAULT_SUFFIXES};
use crate::core::ThresholdMode;
use crate::error::{ColocError, ColocResult};
use crate::imaging::ChannelNaming;
use crate::tools::constants::channel_layout::CHANNEL_COUNT;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置（启动时一次性解析，之后只读传递）
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 条件目录（每个目录一个条件，标签为目录名）
    pub conditions: Vec<PathBuf>,

    /// 阈值模式
    pub mode: ThresholdMode,

    /// 阈值前是否应用5x5高斯平滑
    pub gaussian_blur: bool,

    /// 是否保存三重共定位掩膜
    pub save_mask: bool,

    /// 是否保存阈值化后的通道图像
    pub save_thresholded: bool,

    /// 忽略已有的阈值化结果，强制重新计算
    pub force: bool,

    /// 通道文件命名规则
    pub naming: ChannelNaming,

    /// 4个通道的显示名称（用于结果表列名）
    pub channel_names: [String; CHANNEL_COUNT],

    /// 合并结果表输出路径（可选，默认 comparison_results/<mode>/quantification_all.csv）
    pub output_path: Option<PathBuf>,

    /// 多样本并行度（None 为串行）
    pub parallel_files: Option<usize>,

    /// 是否显示详细信息
    pub verbose: bool,
}

impl AppConfig {
    /// 以默认参数创建配置（库调用与测试使用）
    pub fn new(conditions: Vec<PathBuf>, mode: ThresholdMode) -> Self {
        Self {
            conditions,
            mode,
            gaussian_blur: false,
            save_mask: true,
            save_thresholded: true,
            force: false,
            naming: ChannelNaming::default(),
            channel_names: DEFAULT_CHANNEL_NAMES.map(String::from),
            output_path: None,
            parallel_files: None,
            verbose: false,
        }
    }

    /// 是否为多条件运行（需要生成合并结果表）
    #[inline]
    pub fn is_multi_condition(&self) -> bool {
        self.conditions.len() > 1
    }
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("organoid-coloc")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("Organoid Coloc Team")
        .arg(
            Arg::new("CONDITIONS")
                .help("条件目录（每个目录包含一个条件的四通道TIFF图像）/ Condition folders")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .short('m')
                .help(format!(
                    "阈值模式 / Threshold mode: {}",
                    ThresholdMode::names().join(", ")
                ))
                .value_name("MODE")
                .default_value(ThresholdMode::Otsu.as_str()),
        )
        .arg(
            Arg::new("gaussian-blur")
                .long("gaussian-blur")
                .short('g')
                .help("阈值前应用5x5高斯平滑 / Apply 5x5 gaussian blur before thresholding")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-mask")
                .long("no-mask")
                .help("不保存三重共定位掩膜 / Do not save the triple colocalization mask")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-thresholded")
                .long("no-thresholded")
                .help("不保存阈值化后的通道图像 / Do not save thresholded channel images")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .short('f')
                .help("忽略已有阈值化结果，重新计算 / Recompute even if thresholded images exist")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .help("通道标记前缀 / Channel token prefix")
                .value_name("PREFIX")
                .default_value(DEFAULT_PREFIX),
        )
        .arg(
            Arg::new("suffixes")
                .long("suffixes")
                .help("4个通道标记后缀，逗号分隔 / Four channel token suffixes")
                .value_name("S1,S2,S3,S4")
                .value_delimiter(',')
                .default_values(DEFAULT_SUFFIXES),
        )
        .arg(
            Arg::new("channel-names")
                .long("channel-names")
                .help("4个通道显示名称，逗号分隔 / Four channel display names")
                .value_name("N1,N2,N3,N4")
                .value_delimiter(',')
                .default_values(DEFAULT_CHANNEL_NAMES),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("合并结果表输出路径 / Combined table output path")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("parallel-files")
                .long("parallel-files")
                .help("多样本并行处理的并发度，省略数值时使用默认并发度 / Number of samples processed in parallel")
                .value_name("N")
                .num_args(0..=1)
                .default_missing_value("0")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息 / Verbose output")
                .action(ArgAction::SetTrue),
        )
}

/// 从解析结果构建配置，校验阈值模式与命名规则
pub fn config_from_matches(matches: &ArgMatches) -> ColocResult<AppConfig> {
    let conditions: Vec<PathBuf> = matches
        .get_many::<String>("CONDITIONS")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();

    let mode: ThresholdMode = matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or(ThresholdMode::Otsu.as_str())
        .parse()?;

    let prefix = matches
        .get_one::<String>("prefix")
        .map(String::as_str)
        .unwrap_or(DEFAULT_PREFIX);
    let suffixes = exactly_four(matches, "suffixes")?;
    let naming = ChannelNaming::new(prefix, suffixes.each_ref().map(String::as_str))?;

    let channel_names = exactly_four(matches, "channel-names")?;
    if channel_names.iter().any(|n| n.trim().is_empty()) {
        return Err(ColocError::Configuration("通道显示名称不能为空".to_string()));
    }

    Ok(AppConfig {
        conditions,
        mode,
        gaussian_blur: matches.get_flag("gaussian-blur"),
        save_mask: !matches.get_flag("no-mask"),
        save_thresholded: !matches.get_flag("no-thresholded"),
        force: matches.get_flag("force"),
        naming,
        channel_names,
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        parallel_files: matches
            .get_one::<usize>("parallel-files")
            .map(|&n| if n == 0 { PARALLEL_FILES_DEGREE } else { n }),
        verbose: matches.get_flag("verbose"),
    })
}

fn exactly_four(matches: &ArgMatches, id: &str) -> ColocResult<[String; CHANNEL_COUNT]> {
    let values: Vec<String> = matches
        .get_many::<String>(id)
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    values.try_into().map_err(|v: Vec<String>| {
        ColocError::Configuration(format!(
            "--{id} 需要 {CHANNEL_COUNT} 个值，实际 {} 个",
            v.len()
        ))
    })
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> ColocResult<AppConfig> {
    let matches = build_command().get_matches();
    config_from_matches(&matches)
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("🚀 Organoid Coloc Tool v{VERSION} 启动");
    println!("📝 {DESCRIPTION}");
    println!(
        "⚙️  阈值模式 / Threshold mode: {}，高斯平滑 / Gaussian blur: {}",
        config.mode, config.gaussian_blur
    );
    if config.verbose {
        println!(
            "🔖 通道标记 / Channel tokens: {}",
            (0..CHANNEL_COUNT)
                .map(|c| config.naming.token(c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!(
            "🏷️  通道名称 / Channel names: {}",
            config.channel_names.join(", ")
        );
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("✅ 所有任务处理完成！");
    }
}
