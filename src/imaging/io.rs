//! 通道图像读写
//!
//! 只接受单通道 8/16 位灰度图像；其它像素格式按格式错误处理，
//! 不做静默转换（避免 RGB 导出误被当作单通道定量）。

use crate::error::{ColocError, ColocResult, format_error};
use crate::imaging::channel_image::{BitDepth, ChannelImage};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use std::fs::File;
use std::io::{Cursor, ErrorKind, Write};
use std::path::Path;

/// 条件写入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 文件已写入
    Written,
    /// 目标文件已存在，跳过写入
    Skipped,
}

/// 读取单通道灰度图像，保留原始位深
pub fn read_channel_image(path: &Path) -> ColocResult<ChannelImage> {
    let decoded = image::open(path)?;
    from_dynamic(decoded).map_err(|e| match e {
        ColocError::FormatError(msg) => format_error(&path.display().to_string(), msg),
        other => other,
    })
}

/// 写入单通道图像（覆盖已有文件），编码格式由扩展名决定，未知扩展名按TIFF写入
pub fn write_channel_image(path: &Path, image: &ChannelImage) -> ColocResult<()> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Tiff);
    to_dynamic(image)?.save_with_format(path, format)?;
    Ok(())
}

/// 仅当目标文件不存在时写入
///
/// 使用 `create_new` 打开目标文件，存在性检查与创建是同一个系统调用。
/// 图像先在内存中编码，编码失败时不创建文件；写盘失败时删除已创建的残缺文件，
/// 下次运行不会把它当作已有结果跳过。
pub fn write_channel_image_if_absent(path: &Path, image: &ChannelImage) -> ColocResult<WriteOutcome> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Tiff);
    let mut encoded = Cursor::new(Vec::new());
    to_dynamic(image)?.write_to(&mut encoded, format)?;

    let mut file = match File::options().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(WriteOutcome::Skipped),
        Err(e) => return Err(ColocError::IoError(e)),
    };
    if let Err(e) = file.write_all(encoded.get_ref()).and_then(|()| file.sync_all()) {
        drop(file);
        std::fs::remove_file(path).ok();
        return Err(ColocError::IoError(e));
    }
    Ok(WriteOutcome::Written)
}

fn from_dynamic(decoded: DynamicImage) -> ColocResult<ChannelImage> {
    match decoded {
        DynamicImage::ImageLuma8(buf) => {
            let (width, height) = buf.dimensions();
            let pixels = buf.into_raw().into_iter().map(u16::from).collect();
            ChannelImage::new(width, height, BitDepth::Eight, pixels)
        }
        DynamicImage::ImageLuma16(buf) => {
            let (width, height) = buf.dimensions();
            ChannelImage::new(width, height, BitDepth::Sixteen, buf.into_raw())
        }
        other => Err(ColocError::FormatError(format!(
            "仅支持单通道8/16位灰度图像，实际像素格式: {:?}",
            other.color()
        ))),
    }
}

fn to_dynamic(image: &ChannelImage) -> ColocResult<DynamicImage> {
    let (width, height) = image.dimensions();
    match image.depth() {
        BitDepth::Eight => {
            let raw: Vec<u8> = image.pixels().iter().map(|&v| v as u8).collect();
            ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(width, height, raw)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| ColocError::FormatError("8位图像缓冲区尺寸不符".to_string()))
        }
        BitDepth::Sixteen => {
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, image.pixels().to_vec())
                .map(DynamicImage::ImageLuma16)
                .ok_or_else(|| ColocError::FormatError("16位图像缓冲区尺寸不符".to_string()))
        }
    }
}
