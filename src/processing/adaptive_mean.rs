//! 局部均值自适应阈值
//!
//! 每个像素与其 `block_size x block_size` 邻域均值（边界复制填充）比较：
//! `pixel > round(mean) - offset` 输出前景值，否则输出0。
//! 与其它阈值策略不同，该策略二值化而非抑制，输出仅含 {0, foreground}。

use crate::imaging::ChannelImage;

/// 对单通道图像应用局部均值自适应阈值
///
/// # 参数
///
/// * `block_size` - 邻域边长（奇数，≥1）
/// * `offset` - 从均值中减去的常数
/// * `foreground` - 前景输出值
pub fn adaptive_mean_threshold(
    image: &ChannelImage,
    block_size: usize,
    offset: f64,
    foreground: u16,
) -> ChannelImage {
    debug_assert!(block_size % 2 == 1, "block_size必须为奇数");
    if image.is_empty() {
        return image.clone();
    }

    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.pixels();
    let radius = block_size / 2;

    // 水平滑动窗口和
    let mut horizontal = vec![0u64; src.len()];
    for y in 0..height {
        let row: Vec<u64> = src[y * width..(y + 1) * width]
            .iter()
            .map(|&v| v as u64)
            .collect();
        sliding_sum(&row, radius, &mut horizontal[y * width..(y + 1) * width]);
    }

    // 垂直滑动窗口和（逐列）
    let mut column = vec![0u64; height];
    let mut column_sum = vec![0u64; height];
    let mut box_sum = vec![0u64; src.len()];
    for x in 0..width {
        for y in 0..height {
            column[y] = horizontal[y * width + x];
        }
        sliding_sum(&column, radius, &mut column_sum);
        for y in 0..height {
            box_sum[y * width + x] = column_sum[y];
        }
    }

    let area = (block_size * block_size) as f64;
    let binarized = src
        .iter()
        .zip(&box_sum)
        .map(|(&v, &sum)| {
            let mean = (sum as f64 / area).round();
            if v as f64 > mean - offset {
                foreground
            } else {
                0
            }
        })
        .collect();

    image.with_pixels(binarized)
}

/// 一维滑动窗口求和，越界索引复制边缘值
fn sliding_sum(values: &[u64], radius: usize, out: &mut [u64]) {
    let len = values.len();
    let last = len - 1;
    let at = |i: isize| values[i.clamp(0, last as isize) as usize];
    let r = radius as isize;

    let mut sum: u64 = (-r..=r).map(|i| at(i)).sum();
    out[0] = sum;
    for x in 1..len as isize {
        sum = sum + at(x + r) - at(x - 1 - r);
        out[x as usize] = sum;
    }
}
