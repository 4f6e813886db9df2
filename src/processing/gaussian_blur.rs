//! 固定5x5高斯平滑
//!
//! 可分离核 `[1 4 6 4 1] / 16`（即 sigma 未指定时 5x5 高斯核的标准离散系数），
//! 边界按 reflect-101 镜像（`dcb|abcd|cba`，边缘像素不重复）。
//! 两个方向先以整数累加，最后一次性四舍五入，避免中间截断误差。

use crate::imaging::ChannelImage;
use crate::tools::constants::threshold::GAUSSIAN_KERNEL_5;

/// 二维归一化因子的位移量（16 x 16 = 256 = 1 << 8）
const NORMALIZE_SHIFT: u32 = 8;

/// 对单通道图像应用5x5高斯平滑，输出保持尺寸与位深
pub fn gaussian_blur_5x5(image: &ChannelImage) -> ChannelImage {
    if image.is_empty() {
        return image.clone();
    }

    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.pixels();
    let radius = (GAUSSIAN_KERNEL_5.len() / 2) as isize;

    // 水平方向：未归一化（权重和16）
    let mut horizontal = vec![0u32; src.len()];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        let out = &mut horizontal[y * width..(y + 1) * width];
        for (x, acc) in out.iter_mut().enumerate() {
            *acc = GAUSSIAN_KERNEL_5
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let sx = reflect_101(x as isize + k as isize - radius, width);
                    w * row[sx] as u32
                })
                .sum();
        }
    }

    // 垂直方向 + 四舍五入归一化
    let rounding = 1u32 << (NORMALIZE_SHIFT - 1);
    let mut blurred = vec![0u16; src.len()];
    for y in 0..height {
        for x in 0..width {
            let acc: u32 = GAUSSIAN_KERNEL_5
                .iter()
                .enumerate()
                .map(|(k, &w)| {
                    let sy = reflect_101(y as isize + k as isize - radius, height);
                    w * horizontal[sy * width + x]
                })
                .sum();
            blurred[y * width + x] = ((acc + rounding) >> NORMALIZE_SHIFT) as u16;
        }
    }

    image.with_pixels(blurred)
}

/// reflect-101 边界索引映射
#[inline]
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    // 核半径大于图像尺寸时可能需要多次反射
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}
