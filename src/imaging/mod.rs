//! 图像数据模块
//!
//! 提供单通道图像容器、TIFF读写，以及通道文件命名约定。

pub mod channel_image;
pub mod io;
pub mod naming;

pub use channel_image::{BitDepth, ChannelImage, ChannelSet};
pub use io::{WriteOutcome, read_channel_image, write_channel_image, write_channel_image_if_absent};
pub use naming::{ChannelNaming, OutputNaming, SampleDescriptor};
