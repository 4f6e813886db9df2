//! 强度直方图与自动阈值算法
//!
//! 直方图覆盖位深的全部灰度级（8位256个bin，16位65536个bin），
//! 在其上实现两种全局阈值：
//! - Otsu：最大化类间方差，适合双峰分布
//! - Triangle：峰值到长尾末端连线的最大距离，适合单峰偏斜分布
//!
//! 两者都返回"前景起始灰度"：强度 ≥ 该值的像素保留原值，其余置零。

use crate::imaging::{BitDepth, ChannelImage};

/// 单通道强度直方图
#[derive(Debug, Clone)]
pub struct IntensityHistogram {
    /// 每个灰度级的像素计数
    bins: Vec<u64>,

    /// 总像素数
    total: u64,
}

impl IntensityHistogram {
    /// 创建指定位深的空直方图
    pub fn new(depth: BitDepth) -> Self {
        Self {
            bins: vec![0; depth.levels()],
            total: 0,
        }
    }

    /// 由图像统计直方图
    pub fn from_image(image: &ChannelImage) -> Self {
        let mut histogram = Self::new(image.depth());
        for &v in image.pixels() {
            histogram.add(v);
        }
        histogram
    }

    /// 累加单个像素
    #[inline]
    pub fn add(&mut self, value: u16) {
        // 超出bin范围的值由ChannelImage构造时拦截
        self.bins[value as usize] += 1;
        self.total += 1;
    }

    #[inline]
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Otsu阈值：返回前景起始灰度
    ///
    /// 遍历每个候选分割点 t（背景 = [0, t]），取类间方差
    /// `w_b * w_f * (μ_b - μ_f)²` 最大的首个 t，前景从 t + 1 开始。
    /// 无法分割（空图或单一灰度）时返回1，即仅去除零值。
    pub fn otsu_threshold(&self) -> u32 {
        if self.total == 0 {
            return 1;
        }

        let total = self.total as f64;
        let sum_total: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| i as f64 * count as f64)
            .sum();

        let mut weight_background = 0.0;
        let mut sum_background = 0.0;
        let mut max_variance = 0.0;
        let mut best = 0usize;

        for (t, &count) in self.bins.iter().enumerate() {
            weight_background += count as f64;
            if weight_background == 0.0 {
                continue;
            }
            let weight_foreground = total - weight_background;
            if weight_foreground == 0.0 {
                break;
            }

            sum_background += t as f64 * count as f64;
            let mean_background = sum_background / weight_background;
            let mean_foreground = (sum_total - sum_background) / weight_foreground;

            let variance = weight_background
                * weight_foreground
                * (mean_background - mean_foreground).powi(2);
            if variance > max_variance {
                max_variance = variance;
                best = t;
            }
        }

        best as u32 + 1
    }

    /// Triangle阈值：返回前景起始灰度
    ///
    /// 1. 找到最左/最右非零bin（各向外扩展一格）与峰值bin
    /// 2. 长尾在峰值左侧时翻转直方图，使长尾总在右侧处理
    /// 3. 在 (左边界, 峰值] 区间取到峰值-边界连线距离最大的灰度
    /// 4. 结果减一后（翻转时映射回原坐标）作为背景上界
    ///
    /// 空直方图返回0（不抑制任何像素）。
    pub fn triangle_threshold(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let n = self.bins.len() as i64;

        let mut left_bound = self
            .bins
            .iter()
            .position(|&c| c > 0)
            .map_or(0, |i| i as i64);
        if left_bound > 0 {
            left_bound -= 1;
        }

        let mut right_bound = (1..n)
            .rev()
            .find(|&i| self.bins[i as usize] > 0)
            .unwrap_or(0);
        if right_bound < n - 1 {
            right_bound += 1;
        }

        // 峰值取首个最大bin
        let (mut max_index, max_count) =
            self.bins
                .iter()
                .enumerate()
                .fold((0i64, 0u64), |(bi, bc), (i, &c)| {
                    if c > bc { (i as i64, c) } else { (bi, bc) }
                });

        let flipped = max_index - left_bound < right_bound - max_index;
        let hist: Vec<u64> = if flipped {
            left_bound = n - 1 - right_bound;
            max_index = n - 1 - max_index;
            self.bins.iter().rev().copied().collect()
        } else {
            self.bins.clone()
        };

        let a = max_count as f64;
        let b = (left_bound - max_index) as f64;
        let mut threshold = left_bound;
        let mut max_distance = 0.0;
        for i in (left_bound + 1)..=max_index {
            let distance = a * i as f64 + b * hist[i as usize] as f64;
            if distance > max_distance {
                max_distance = distance;
                threshold = i;
            }
        }
        threshold -= 1;

        if flipped {
            threshold = n - 1 - threshold;
        }

        // 背景上界 threshold，前景从 threshold + 1 开始
        (threshold + 1).clamp(0, n) as u32
    }
}

/// 将低于前景起始灰度的像素置零，其余保持原值
pub fn suppress_below(image: &ChannelImage, foreground_start: u32) -> ChannelImage {
    let pixels = image
        .pixels()
        .iter()
        .map(|&v| if (v as u32) < foreground_start { 0 } else { v })
        .collect();
    image.with_pixels(pixels)
}
