//! 样本扫描模块
//!
//! 扫描条件目录中的通道1基准文件，并由命名规则推导出每个样本的4个通道路径。

use super::constants::naming::SUPPORTED_EXTENSIONS;
use super::utils;
use crate::error::{ColocError, ColocResult};
use crate::imaging::{ChannelNaming, SampleDescriptor};
use std::path::Path;
use walkdir::WalkDir;

/// 扫描条件目录（不递归子目录），返回按路径排序的样本列表
///
/// 这里只做命名推导；兄弟通道文件是否存在在逐样本处理时校验，
/// 因此缺失通道只会使该样本失败，不会中断整批。
pub fn scan_samples(dir_path: &Path, naming: &ChannelNaming) -> ColocResult<Vec<SampleDescriptor>> {
    if !dir_path.exists() {
        return Err(ColocError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(ColocError::InvalidInput(format!(
            "路径不是目录: {}",
            dir_path.display()
        )));
    }

    let mut base_files = Vec::new();
    for entry in WalkDir::new(dir_path).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ColocError::IoError(std::io::Error::other(format!("目录遍历失败: {e}")))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if supported && naming.is_base_file(utils::extract_filename(path)) {
            base_files.push(path.to_path_buf());
        }
    }

    // 按文件名排序
    base_files.sort();

    base_files
        .iter()
        .map(|path| naming.describe(path))
        .collect()
}

/// 显示样本扫描结果
pub fn show_scan_results(condition_dir: &Path, samples: &[SampleDescriptor], verbose: bool) {
    if samples.is_empty() {
        println!(
            "⚠️  在目录 {} 中没有找到通道1图像 / No channel-1 images found",
            condition_dir.display()
        );
        println!("   支持的格式 / Supported formats: TIF, TIFF");
        return;
    }

    println!("📁 扫描目录 / Scanning: {}", condition_dir.display());
    println!("🔬 找到 {} 个样本 / samples found", samples.len());

    if verbose {
        for (i, sample) in samples.iter().enumerate() {
            println!("   {}. {}", i + 1, sample.id());
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_base_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b_2_C1.tif",
            "b_2_C2.tif",
            "a_1_C1.TIF",
            "a_1_C3.tif",
            "notes_C1.txt",
            "a_1_C1_gauss_filter_false_otsu_thresholded.tif",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested_C1.tif")).unwrap();

        let samples = scan_samples(dir.path(), &ChannelNaming::default()).unwrap();
        let ids: Vec<&str> = samples.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a_1_C1.TIF", "b_2_C1.tif"]);
        assert_eq!(samples[1].path(3), dir.path().join("b_2_C4.tif"));
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = scan_samples(Path::new("/definitely/not/here"), &ChannelNaming::default());
        assert!(matches!(result, Err(ColocError::IoError(_))));
    }
}
