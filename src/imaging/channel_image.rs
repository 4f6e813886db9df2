//! 单通道灰度图像与四通道样本容器
//!
//! 所有像素统一以 `u16` 存储，并记录源位深（8 或 16 位），
//! 以便直方图的 bin 数与输出编码保持与输入一致。

use crate::error::{ColocError, ColocResult};
use crate::tools::constants::channel_layout::CHANNEL_COUNT;

/// 源图像位深
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    /// 8位无符号
    Eight,
    /// 16位无符号
    Sixteen,
}

impl BitDepth {
    /// 该位深可表示的最大值
    #[inline]
    pub fn max_value(self) -> u16 {
        match self {
            BitDepth::Eight => u8::MAX as u16,
            BitDepth::Sixteen => u16::MAX,
        }
    }

    /// 直方图所需的 bin 数（灰度级数）
    #[inline]
    pub fn levels(self) -> usize {
        self.max_value() as usize + 1
    }

    /// 位数
    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }
}

/// 单通道强度图像（行优先存储）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelImage {
    width: u32,
    height: u32,
    depth: BitDepth,
    pixels: Vec<u16>,
}

impl ChannelImage {
    /// 由像素数据创建图像
    ///
    /// 像素数量必须等于 宽 x 高，且不得超出位深的表示范围。
    pub fn new(width: u32, height: u32, depth: BitDepth, pixels: Vec<u16>) -> ColocResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ColocError::InvalidInput(format!(
                "像素数量 {} 与尺寸 {width}x{height} 不符",
                pixels.len()
            )));
        }
        let max = depth.max_value();
        if let Some(&v) = pixels.iter().find(|&&v| v > max) {
            return Err(ColocError::InvalidInput(format!(
                "像素值 {v} 超出 {} 位深范围",
                depth.bits()
            )));
        }
        Ok(Self {
            width,
            height,
            depth,
            pixels,
        })
    }

    /// 创建同尺寸的全零图像
    pub fn zeros(width: u32, height: u32, depth: BitDepth) -> Self {
        Self {
            width,
            height,
            depth,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// 8位便捷构造（测试与合成数据常用）
    pub fn from_u8(width: u32, height: u32, pixels: &[u8]) -> ColocResult<Self> {
        Self::new(
            width,
            height,
            BitDepth::Eight,
            pixels.iter().map(|&v| v as u16).collect(),
        )
    }

    /// 以同尺寸同位深、替换像素的方式派生新图像（crate内部保证长度一致）
    pub(crate) fn with_pixels(&self, pixels: Vec<u16>) -> Self {
        debug_assert_eq!(pixels.len(), self.pixels.len());
        Self {
            width: self.width,
            height: self.height,
            depth: self.depth,
            pixels,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    #[inline]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// 读取 (x, y) 处像素
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u16 {
        debug_assert!(x < self.width && y < self.height);
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// 阳性像素（> 0）计数
    pub fn positive_count(&self) -> u64 {
        self.pixels.iter().filter(|&&v| v > 0).count() as u64
    }
}

/// 同一样本的四个共配准通道
///
/// 构造时校验四个通道尺寸一致，之后的算法可直接按索引逐像素对齐。
#[derive(Debug, Clone)]
pub struct ChannelSet {
    channels: [ChannelImage; CHANNEL_COUNT],
}

impl ChannelSet {
    /// 创建通道集合并校验尺寸一致性
    pub fn new(channels: [ChannelImage; CHANNEL_COUNT]) -> ColocResult<Self> {
        let expected = channels[0].dimensions();
        for (channel, image) in channels.iter().enumerate().skip(1) {
            if image.dimensions() != expected {
                return Err(ColocError::ShapeMismatch {
                    channel,
                    expected,
                    found: image.dimensions(),
                });
            }
        }
        Ok(Self { channels })
    }

    /// 获取指定通道（0起）
    #[inline]
    pub fn channel(&self, index: usize) -> &ChannelImage {
        &self.channels[index]
    }

    #[inline]
    pub fn channels(&self) -> &[ChannelImage; CHANNEL_COUNT] {
        &self.channels
    }

    /// 共享尺寸（宽, 高）
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.channels[0].dimensions()
    }

    /// 对每个通道应用变换，保持通道顺序
    ///
    /// 变换不得改变尺寸（阈值与平滑均为逐像素或等尺寸邻域运算）。
    pub fn map<F>(self, mut f: F) -> Self
    where
        F: FnMut(usize, ChannelImage) -> ChannelImage,
    {
        let [c0, c1, c2, c3] = self.channels;
        let channels = [f(0, c0), f(1, c1), f(2, c2), f(3, c3)];
        debug_assert!(
            channels
                .iter()
                .all(|c| c.dimensions() == channels[0].dimensions())
        );
        Self { channels }
    }
}
