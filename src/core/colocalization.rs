//! 共定位定量
//!
//! 在阈值化后的四通道样本上计算：
//! - 三重共定位掩膜（三个标记通道同时阳性）
//! - 每通道阳性像素数、参考通道归一化丰度、阳性像素平均强度
//! - 每通道被掩膜覆盖的百分比
//! - 标记通道间六个有向两两覆盖百分比
//!
//! 分母为零的比值记为 NaN，并以 [`DegenerateWarning`] 标记样本。

use crate::core::record::DegenerateWarning;
use crate::imaging::{BitDepth, ChannelImage, ChannelSet};
use crate::tools::constants::channel_layout::{
    CHANNEL_COUNT, MARKER_CHANNELS, PAIRWISE_ORDER, REFERENCE_CHANNEL,
};

/// 三重共定位掩膜
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl TripleMask {
    /// 由三个标记通道的阳性交集构建
    pub fn from_channels(channels: &ChannelSet) -> Self {
        let (width, height) = channels.dimensions();
        let [a, b, c] = MARKER_CHANNELS.map(|i| channels.channel(i).pixels());
        let cells = a
            .iter()
            .zip(b)
            .zip(c)
            .map(|((&x, &y), &z)| x > 0 && y > 0 && z > 0)
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// 掩膜内像素数
    pub fn count(&self) -> u64 {
        self.cells.iter().filter(|&&m| m).count() as u64
    }

    /// 转为可保存的图像：掩膜内为位深最大值，其余为0
    pub fn to_image(&self, depth: BitDepth) -> ChannelImage {
        let on = depth.max_value();
        let pixels = self.cells.iter().map(|&m| if m { on } else { 0 }).collect();
        ChannelImage::zeros(self.width, self.height, depth).with_pixels(pixels)
    }
}

/// 单通道指标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMetrics {
    /// 阳性像素数
    pub positive_count: u64,

    /// 参考通道归一化丰度（参考通道本身为原始计数）
    pub normalized_abundance: f64,

    /// 阳性像素平均强度（无阳性像素时为NaN）
    pub mean_intensity: f64,

    /// 被三重掩膜覆盖的阳性像素百分比（无阳性像素时为NaN）
    pub mask_coverage: f64,
}

/// 有向两两覆盖：from 通道阳性像素中同时在 to 通道阳性的百分比
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseCoverage {
    pub from: usize,
    pub to: usize,
    pub percent: f64,
}

/// 单个样本的全部指标
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMetrics {
    pub channels: [ChannelMetrics; CHANNEL_COUNT],
    /// 按 `PAIRWISE_ORDER` 排列
    pub pairwise: [PairwiseCoverage; 6],
    pub mask_count: u64,
    pub warnings: Vec<DegenerateWarning>,
}

impl SampleMetrics {
    #[inline]
    pub fn channel(&self, index: usize) -> &ChannelMetrics {
        &self.channels[index]
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// 百分比，分母为零时返回NaN
#[inline]
fn percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// 对阈值化后的样本计算掩膜与全部指标
pub fn quantify(channels: &ChannelSet) -> (TripleMask, SampleMetrics) {
    let mask = TripleMask::from_channels(channels);
    let mask_count = mask.count();

    let counts: [u64; CHANNEL_COUNT] =
        std::array::from_fn(|c| channels.channel(c).positive_count());
    let reference_count = counts[REFERENCE_CHANNEL];

    let mut warnings = Vec::new();
    if reference_count == 0 {
        warnings.push(DegenerateWarning::EmptyReference);
    }
    for &c in &MARKER_CHANNELS {
        if counts[c] == 0 {
            warnings.push(DegenerateWarning::EmptyMarker { channel: c });
        }
    }

    let metrics: [ChannelMetrics; CHANNEL_COUNT] = std::array::from_fn(|c| {
        let pixels = channels.channel(c).pixels();
        let count = counts[c];

        let normalized_abundance = if c == REFERENCE_CHANNEL {
            count as f64
        } else if reference_count == 0 {
            f64::NAN
        } else {
            count as f64 / reference_count as f64
        };

        let intensity_sum: u64 = pixels.iter().map(|&v| v as u64).sum();
        let mean_intensity = if count == 0 {
            f64::NAN
        } else {
            intensity_sum as f64 / count as f64
        };

        // 标记通道的掩膜像素必然阳性，参考通道需显式与自身阳性求交
        let covered = if c == REFERENCE_CHANNEL {
            pixels
                .iter()
                .zip(mask.cells())
                .filter(|&(&v, &m)| m && v > 0)
                .count() as u64
        } else {
            mask_count
        };

        ChannelMetrics {
            positive_count: count,
            normalized_abundance,
            mean_intensity,
            mask_coverage: percent(covered, count),
        }
    });

    let pairwise = PAIRWISE_ORDER.map(|(from, to)| {
        let overlap = channels
            .channel(from)
            .pixels()
            .iter()
            .zip(channels.channel(to).pixels())
            .filter(|&(&a, &b)| a > 0 && b > 0)
            .count() as u64;
        PairwiseCoverage {
            from,
            to,
            percent: percent(overlap, counts[from]),
        }
    });

    (
        mask,
        SampleMetrics {
            channels: metrics,
            pairwise,
            mask_count,
            warnings,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with(positives: &[usize], value: u8) -> ChannelImage {
        let mut pixels = [0u8; 16];
        for &i in positives {
            pixels[i] = value;
        }
        ChannelImage::from_u8(4, 4, &pixels).unwrap()
    }

    #[test]
    fn test_mean_intensity_over_positives_only() {
        let mut pixels = [0u8; 16];
        pixels[0] = 10;
        pixels[1] = 30;
        let a = ChannelImage::from_u8(4, 4, &pixels).unwrap();
        let set = ChannelSet::new([a.clone(), a.clone(), a.clone(), a]).unwrap();
        let (_, metrics) = quantify(&set);
        assert_eq!(metrics.channel(0).mean_intensity, 20.0);
    }

    #[test]
    fn test_marker_coverage_bounded() {
        let set = ChannelSet::new([
            image_with(&[0, 1, 2, 3], 9),
            image_with(&[1, 2], 9),
            image_with(&[0, 5, 9], 9),
            image_with(&[2, 3, 4], 9),
        ])
        .unwrap();
        let (mask, metrics) = quantify(&set);
        assert_eq!(mask.count(), 1);
        for m in &metrics.channels {
            assert!((0.0..=100.0).contains(&m.mask_coverage));
        }
        // 参考通道与掩膜无交集
        assert_eq!(metrics.channel(REFERENCE_CHANNEL).mask_coverage, 0.0);
    }

    #[test]
    fn test_empty_marker_flagged() {
        let set = ChannelSet::new([
            image_with(&[0], 9),
            image_with(&[], 9),
            image_with(&[0, 1], 9),
            image_with(&[0], 9),
        ])
        .unwrap();
        let (_, metrics) = quantify(&set);
        assert_eq!(
            metrics.warnings,
            vec![DegenerateWarning::EmptyMarker { channel: 1 }]
        );
        assert!(metrics.channel(1).mean_intensity.is_nan());
        assert_eq!(metrics.channel(1).normalized_abundance, 0.0);
        assert!(metrics.pairwise[5].percent.is_nan());
    }

    #[test]
    fn test_mask_image_uses_depth_maximum() {
        let set = ChannelSet::new([
            image_with(&[3], 1),
            image_with(&[3], 1),
            image_with(&[], 1),
            image_with(&[3], 1),
        ])
        .unwrap();
        let (mask, _) = quantify(&set);
        let image = mask.to_image(BitDepth::Sixteen);
        assert_eq!(image.get(3, 0), u16::MAX);
        assert_eq!(image.positive_count(), 1);
    }
}
