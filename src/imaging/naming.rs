//! 通道文件命名约定
//!
//! 每个样本由4个仅通道标记不同的文件组成（如 `305_1_C1.tif` / `305_1_C2.tif` ...）。
//! 通道标记 = 前缀 + 后缀，必须作为独立字段出现：前后不能紧邻字母或数字，
//! 因此 `AC1` 这样的细胞系名不会被误识别为 `C1` 通道。

use crate::error::{ColocError, ColocResult};
use crate::tools::constants::channel_layout::CHANNEL_COUNT;
use crate::tools::constants::naming::{
    DEFAULT_PREFIX, DEFAULT_SUFFIXES, MASK_TAG, OUTPUT_EXTENSION, THRESHOLDED_TAG,
};
use std::io;
use std::path::{Path, PathBuf};

/// 通道命名规则（前缀 + 4个后缀）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNaming {
    prefix: String,
    suffixes: [String; CHANNEL_COUNT],
}

impl ChannelNaming {
    /// 创建命名规则，校验标记非空、互不相同且不含路径分隔符
    pub fn new(prefix: &str, suffixes: [&str; CHANNEL_COUNT]) -> ColocResult<Self> {
        let naming = Self {
            prefix: prefix.to_string(),
            suffixes: suffixes.map(str::to_string),
        };

        let tokens: Vec<String> = (0..CHANNEL_COUNT).map(|c| naming.token(c)).collect();
        for (i, token) in tokens.iter().enumerate() {
            if naming.suffixes[i].is_empty() {
                return Err(ColocError::Configuration(format!(
                    "通道{}的命名后缀为空",
                    i + 1
                )));
            }
            if token.contains(['/', '\\']) {
                return Err(ColocError::Configuration(format!(
                    "通道标记不能包含路径分隔符: {token}"
                )));
            }
            if tokens[..i].contains(token) {
                return Err(ColocError::Configuration(format!(
                    "通道标记重复: {token}"
                )));
            }
        }

        Ok(naming)
    }

    /// 指定通道（0起）的完整标记
    pub fn token(&self, channel: usize) -> String {
        format!("{}{}", self.prefix, self.suffixes[channel])
    }

    /// 文件名是否为样本基准文件（通道1）
    ///
    /// 已派生的输出文件（阈值化结果、掩膜）不会被视为输入。
    pub fn is_base_file(&self, file_name: &str) -> bool {
        if file_name.contains(THRESHOLDED_TAG) || file_name.contains(MASK_TAG) {
            return false;
        }
        find_delimited(file_name, &self.token(0)).is_some()
    }

    /// 由通道1文件路径解析出完整样本描述
    ///
    /// 只做命名推导，不检查文件是否存在（见 [`SampleDescriptor::validate`]）。
    pub fn describe(&self, base_path: &Path) -> ColocResult<SampleDescriptor> {
        let file_name = base_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ColocError::InvalidInput(format!("无法解析文件名: {}", base_path.display()))
            })?;

        let base_token = self.token(0);
        let start = find_delimited(file_name, &base_token).ok_or_else(|| {
            ColocError::InvalidInput(format!(
                "文件名中未找到通道标记 {base_token}: {file_name}"
            ))
        })?;
        let head = &file_name[..start];
        let tail = &file_name[start + base_token.len()..];

        let dir = base_path.parent().unwrap_or_else(|| Path::new("."));
        let paths: [PathBuf; CHANNEL_COUNT] =
            std::array::from_fn(|c| dir.join(format!("{head}{}{tail}", self.token(c))));

        Ok(SampleDescriptor {
            id: file_name.to_string(),
            paths,
        })
    }
}

impl Default for ChannelNaming {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            suffixes: DEFAULT_SUFFIXES.map(str::to_string),
        }
    }
}

/// 查找作为独立字段出现的标记，返回首个匹配的字节偏移
fn find_delimited(haystack: &str, token: &str) -> Option<usize> {
    haystack.match_indices(token).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + token.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// 单个样本的4个通道文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescriptor {
    id: String,
    paths: [PathBuf; CHANNEL_COUNT],
}

impl SampleDescriptor {
    /// 样本标识（通道1文件名）
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 样本标识去掉扩展名，用于细胞系/类器官编号拆分
    pub fn id_stem(&self) -> &str {
        Path::new(&self.id)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.id)
    }

    #[inline]
    pub fn path(&self, channel: usize) -> &Path {
        &self.paths[channel]
    }

    #[inline]
    pub fn paths(&self) -> &[PathBuf; CHANNEL_COUNT] {
        &self.paths
    }

    /// 校验4个通道文件均存在
    pub fn validate(&self) -> ColocResult<()> {
        for (channel, path) in self.paths.iter().enumerate() {
            if !path.is_file() {
                return Err(ColocError::IoError(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("缺少通道{}文件: {}", channel + 1, path.display()),
                )));
            }
        }
        Ok(())
    }
}

/// 派生输出文件命名（阈值化结果与三重掩膜）
#[derive(Debug, Clone)]
pub struct OutputNaming {
    out_dir: PathBuf,
    tag: String,
}

impl OutputNaming {
    /// `tag` 形如 `gauss_filter_false_otsu`
    pub fn new(out_dir: impl Into<PathBuf>, gaussian_blur: bool, mode: &str) -> Self {
        Self {
            out_dir: out_dir.into(),
            tag: format!("gauss_filter_{gaussian_blur}_{mode}"),
        }
    }

    #[inline]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// 某通道阈值化结果的输出路径
    pub fn thresholded_path(&self, sample: &SampleDescriptor, channel: usize) -> PathBuf {
        let stem = file_stem(sample.path(channel));
        self.out_dir.join(format!(
            "{stem}_{}_{THRESHOLDED_TAG}.{OUTPUT_EXTENSION}",
            self.tag
        ))
    }

    /// 三重共定位掩膜的输出路径（以通道1文件名为基准）
    pub fn mask_path(&self, sample: &SampleDescriptor) -> PathBuf {
        let stem = file_stem(sample.path(0));
        self.out_dir
            .join(format!("{stem}_{}_{MASK_TAG}.{OUTPUT_EXTENSION}", self.tag))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_derives_siblings() {
        let naming = ChannelNaming::default();
        let sample = naming.describe(Path::new("/data/305_1_C1.tif")).unwrap();

        assert_eq!(sample.id(), "305_1_C1.tif");
        assert_eq!(sample.id_stem(), "305_1_C1");
        assert_eq!(sample.path(2), Path::new("/data/305_1_C3.tif"));
        assert_eq!(sample.path(3), Path::new("/data/305_1_C4.tif"));
    }

    #[test]
    fn test_token_must_be_delimited() {
        let naming = ChannelNaming::default();
        // 细胞系 AC1 中的 C1 不是通道标记
        let sample = naming.describe(Path::new("AC1_3_C1.tif")).unwrap();
        assert_eq!(sample.path(1), Path::new("AC1_3_C2.tif"));

        assert!(!naming.is_base_file("AC1_3_C2.tif"));
        assert!(!naming.is_base_file("305_C10.tif"));
        assert!(naming.is_base_file("C1-305_2.tif"));
    }

    #[test]
    fn test_derived_outputs_are_not_inputs() {
        let naming = ChannelNaming::default();
        assert!(!naming.is_base_file("305_1_C1_gauss_filter_false_otsu_thresholded.tif"));
        assert!(!naming.is_base_file("305_1_C1_gauss_filter_false_otsu_mask_ch1_ch2_ch4.tif"));
    }

    #[test]
    fn test_invalid_naming_rejected() {
        assert!(matches!(
            ChannelNaming::new("C", ["1", "1", "3", "4"]),
            Err(ColocError::Configuration(_))
        ));
        assert!(ChannelNaming::new("C", ["1", "", "3", "4"]).is_err());
        assert!(ChannelNaming::new("ch", ["a", "b", "c", "d"]).is_ok());
    }

    #[test]
    fn test_validate_reports_missing_sibling() {
        let dir = tempfile::tempdir().unwrap();
        for c in 1..=3 {
            std::fs::write(dir.path().join(format!("s_1_C{c}.tif")), b"x").unwrap();
        }
        let sample = ChannelNaming::default()
            .describe(&dir.path().join("s_1_C1.tif"))
            .unwrap();

        match sample.validate() {
            Err(ColocError::IoError(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("应返回IoError，实际: {other:?}"),
        }
    }

    #[test]
    fn test_output_names() {
        let sample = ChannelNaming::default()
            .describe(Path::new("in/305_1_C1.tif"))
            .unwrap();
        let out = OutputNaming::new("out", false, "otsu");

        assert_eq!(
            out.thresholded_path(&sample, 1),
            Path::new("out/305_1_C2_gauss_filter_false_otsu_thresholded.tif")
        );
        assert_eq!(
            out.mask_path(&sample),
            Path::new("out/305_1_C1_gauss_filter_false_otsu_mask_ch1_ch2_ch4.tif")
        );
    }
}
