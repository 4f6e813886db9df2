//! 阈值策略引擎
//!
//! 每种阈值模式映射为一个按通道的操作计划（[`ChannelOp`]）：
//! 参考通道（DAPI）与三个标记通道可以使用不同的操作。
//! 除 `adaptive` 外，所有操作只会把像素置零或保持原值，绝不增大像素。

use crate::core::histogram::{IntensityHistogram, suppress_below};
use crate::error::{ColocError, ColocResult};
use crate::imaging::{ChannelImage, ChannelSet};
use crate::processing::{adaptive_mean_threshold, gaussian_blur_5x5};
use crate::tools::constants::channel_layout::{CHANNEL_COUNT, REFERENCE_CHANNEL};
use crate::tools::constants::threshold::{
    ADAPTIVE_BLOCK_SIZE, ADAPTIVE_FOREGROUND, ADAPTIVE_OFFSET, LOW_FLOOR, SUPER_LOW_FLOOR,
};
use std::fmt;
use std::str::FromStr;

/// 阈值模式（字符串标识即命令行与输出文件名中的名称）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdMode {
    Otsu,
    Triangle,
    Adaptive,
    OtsuOnDapiOnly,
    OtsuOnDapiIntensityGreater1OnRest,
    TriangleOnDapiIntensityGreater1OnRest,
    SuperLowIntensitiesFiltered,
    LowIntensitiesFiltered,
}

impl ThresholdMode {
    /// 全部模式（按命令行帮助中的顺序）
    pub const ALL: [ThresholdMode; 8] = [
        ThresholdMode::Otsu,
        ThresholdMode::Triangle,
        ThresholdMode::Adaptive,
        ThresholdMode::OtsuOnDapiOnly,
        ThresholdMode::OtsuOnDapiIntensityGreater1OnRest,
        ThresholdMode::TriangleOnDapiIntensityGreater1OnRest,
        ThresholdMode::SuperLowIntensitiesFiltered,
        ThresholdMode::LowIntensitiesFiltered,
    ];

    /// 模式标识字符串
    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdMode::Otsu => "otsu",
            ThresholdMode::Triangle => "triangle",
            ThresholdMode::Adaptive => "adaptive",
            ThresholdMode::OtsuOnDapiOnly => "otsu_on_dapi_only",
            ThresholdMode::OtsuOnDapiIntensityGreater1OnRest => {
                "otsu_on_dapi_intensity_greater_1_on_rest"
            }
            ThresholdMode::TriangleOnDapiIntensityGreater1OnRest => {
                "triangle_on_dapi_intensity_greater_1_on_rest"
            }
            ThresholdMode::SuperLowIntensitiesFiltered => "super_low_intensities_filtered",
            ThresholdMode::LowIntensitiesFiltered => "low_intensities_filtered",
        }
    }

    /// 所有模式标识（用于命令行可选值）
    pub fn names() -> [&'static str; 8] {
        Self::ALL.map(Self::as_str)
    }

    /// 参考通道与标记通道各自的操作
    fn reference_and_marker_ops(self) -> (ChannelOp, ChannelOp) {
        match self {
            ThresholdMode::Otsu => (ChannelOp::Otsu, ChannelOp::Otsu),
            ThresholdMode::Triangle => (ChannelOp::Triangle, ChannelOp::Triangle),
            ThresholdMode::Adaptive => (ChannelOp::Adaptive, ChannelOp::Adaptive),
            ThresholdMode::OtsuOnDapiOnly => (ChannelOp::Otsu, ChannelOp::PassThrough),
            ThresholdMode::OtsuOnDapiIntensityGreater1OnRest => {
                (ChannelOp::Otsu, ChannelOp::Floor(SUPER_LOW_FLOOR))
            }
            ThresholdMode::TriangleOnDapiIntensityGreater1OnRest => {
                (ChannelOp::Triangle, ChannelOp::Floor(SUPER_LOW_FLOOR))
            }
            ThresholdMode::SuperLowIntensitiesFiltered => (
                ChannelOp::Floor(SUPER_LOW_FLOOR),
                ChannelOp::Floor(SUPER_LOW_FLOOR),
            ),
            ThresholdMode::LowIntensitiesFiltered => {
                (ChannelOp::Floor(LOW_FLOOR), ChannelOp::Floor(LOW_FLOOR))
            }
        }
    }

    /// 按通道索引展开的操作计划
    pub fn channel_ops(self) -> [ChannelOp; CHANNEL_COUNT] {
        let (reference, marker) = self.reference_and_marker_ops();
        std::array::from_fn(|c| {
            if c == REFERENCE_CHANNEL {
                reference
            } else {
                marker
            }
        })
    }
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdMode {
    type Err = ColocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                ColocError::Configuration(format!(
                    "未知阈值模式 '{s}'，可选: {}",
                    Self::names().join(", ")
                ))
            })
    }
}

/// 单通道阈值操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    /// 原样保留
    PassThrough,
    /// Otsu全局阈值，低于阈值置零
    Otsu,
    /// Triangle全局阈值，低于阈值置零
    Triangle,
    /// 局部均值二值化，输出 {0, 255}
    Adaptive,
    /// 强度下限：值 < N 置零
    Floor(u16),
}

impl ChannelOp {
    /// 对单个通道执行操作
    pub fn apply(self, image: ChannelImage) -> ChannelImage {
        match self {
            ChannelOp::PassThrough => image,
            ChannelOp::Otsu => {
                let start = IntensityHistogram::from_image(&image).otsu_threshold();
                suppress_below(&image, start)
            }
            ChannelOp::Triangle => {
                let start = IntensityHistogram::from_image(&image).triangle_threshold();
                suppress_below(&image, start)
            }
            ChannelOp::Adaptive => adaptive_mean_threshold(
                &image,
                ADAPTIVE_BLOCK_SIZE,
                ADAPTIVE_OFFSET,
                ADAPTIVE_FOREGROUND,
            ),
            ChannelOp::Floor(floor) => suppress_below(&image, floor as u32),
        }
    }
}

/// 阈值器：模式 + 可选高斯预平滑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholder {
    mode: ThresholdMode,
    gaussian_blur: bool,
}

impl Thresholder {
    pub fn new(mode: ThresholdMode, gaussian_blur: bool) -> Self {
        Self {
            mode,
            gaussian_blur,
        }
    }

    #[inline]
    pub fn mode(&self) -> ThresholdMode {
        self.mode
    }

    #[inline]
    pub fn gaussian_blur(&self) -> bool {
        self.gaussian_blur
    }

    /// 对四通道样本执行阈值化，返回同尺寸的四个结果
    pub fn apply(&self, channels: ChannelSet) -> ChannelSet {
        let ops = self.mode.channel_ops();
        let blur = self.gaussian_blur;
        channels.map(|c, image| {
            let image = if blur {
                gaussian_blur_5x5(&image)
            } else {
                image
            };
            ops[c].apply(image)
        })
    }

    /// 由四个独立读取的通道执行阈值化（先校验尺寸一致）
    pub fn threshold_channels(
        &self,
        raw: [ChannelImage; CHANNEL_COUNT],
    ) -> ColocResult<ChannelSet> {
        Ok(self.apply(ChannelSet::new(raw)?))
    }
}
