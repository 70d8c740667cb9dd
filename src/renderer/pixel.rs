//! Host pixel formats. The software sink works in ARGB internally and packs
//! once per pixel on present.

use crate::renderer::Rgba;

pub trait PixelFormat {
    type Raw: Copy + Default;

    fn pack(argb: Rgba) -> Self::Raw;
}

/// 16-bit 5:6:5.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rgb565;

/// Packed 24-bit, red first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rgb888;

/// 32-bit 0xAARRGGBB.
#[derive(Clone, Copy, Debug, Default)]
pub struct Argb8888;

impl PixelFormat for Rgb565 {
    type Raw = u16;

    #[inline(always)]
    fn pack(argb: Rgba) -> u16 {
        let r = (argb >> 19) & 0x1F;
        let g = (argb >> 10) & 0x3F;
        let b = (argb >> 3) & 0x1F;
        ((r << 11) | (g << 5) | b) as u16
    }
}

impl PixelFormat for Rgb888 {
    type Raw = [u8; 3];

    #[inline(always)]
    fn pack(argb: Rgba) -> [u8; 3] {
        [(argb >> 16) as u8, (argb >> 8) as u8, argb as u8]
    }
}

impl PixelFormat for Argb8888 {
    type Raw = u32;

    #[inline(always)]
    fn pack(argb: Rgba) -> u32 {
        argb
    }
}
