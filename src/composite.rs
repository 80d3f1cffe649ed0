//! Preview compositing of a transparent result over a flat color
//!
//! Rendering is pure: it reads the result image and produces a new opaque
//! surface. The result bytes held by the session are never touched.

use crate::error::{BgRemovalError, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Edge length of one checkerboard square, in pixels
pub const CHECKER_SQUARE: u32 = 10;

/// Light checkerboard square
pub const CHECKER_LIGHT: [u8; 3] = [0xff, 0xff, 0xff];

/// Dark checkerboard square (`#e5e7eb`)
pub const CHECKER_DARK: [u8; 3] = [0xe5, 0xe7, 0xeb];

/// Opaque flat color painted beneath a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompositeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl CompositeColor {
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl std::fmt::Display for CompositeColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for CompositeColor {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            "red" => return Ok(Self::rgb(0xff, 0, 0)),
            "green" => return Ok(Self::rgb(0, 0x80, 0)),
            "blue" => return Ok(Self::rgb(0, 0, 0xff)),
            "gray" | "grey" => return Ok(Self::rgb(0x80, 0x80, 0x80)),
            _ => {},
        }

        let hex = value.strip_prefix('#').unwrap_or(&value);
        let invalid = || BgRemovalError::config_value_error("color", s, "#rgb, #rrggbb or a color name");
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let expand = |i: usize| -> Result<u8> {
                    let digit = hex.get(i..=i).ok_or_else(invalid)?;
                    channel(&digit.repeat(2))
                };
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            },
            6 => {
                let pair = |i: usize| -> Result<u8> { channel(hex.get(i..i + 2).ok_or_else(invalid)?) };
                Ok(Self::rgb(pair(0)?, pair(2)?, pair(4)?))
            },
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for CompositeColor {
    type Error = BgRemovalError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CompositeColor> for String {
    fn from(color: CompositeColor) -> Self {
        color.to_string()
    }
}

/// Backdrop painted beneath the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backdrop {
    /// Neutral checkerboard visualizing transparency
    Checkerboard,
    /// Flat color
    Solid(CompositeColor),
}

impl From<Option<CompositeColor>> for Backdrop {
    fn from(color: Option<CompositeColor>) -> Self {
        color.map_or(Self::Checkerboard, Self::Solid)
    }
}

/// Renders a result image over its backdrop
#[derive(Debug, Clone, Copy)]
pub struct CompositeRenderer {
    square: u32,
}

impl Default for CompositeRenderer {
    fn default() -> Self {
        Self {
            square: CHECKER_SQUARE,
        }
    }
}

impl CompositeRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different checkerboard square size (minimum 1)
    #[must_use]
    pub fn with_square_size(square: u32) -> Self {
        Self {
            square: square.max(1),
        }
    }

    /// Decode encoded result bytes and render them
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    pub fn render_bytes(&self, bytes: &[u8], color: Option<CompositeColor>) -> Result<RgbaImage> {
        let image = image::load_from_memory(bytes)?;
        Ok(self.render(&image, color))
    }

    /// Paint `color` (or the checkerboard) beneath `image`
    #[must_use]
    pub fn render(&self, image: &DynamicImage, color: Option<CompositeColor>) -> RgbaImage {
        let backdrop = Backdrop::from(color);
        let source = image.to_rgba8();
        let (width, height) = source.dimensions();

        RgbaImage::from_fn(width, height, |x, y| {
            let background = self.backdrop_at(backdrop, x, y);
            over(*source.get_pixel(x, y), background)
        })
    }

    fn backdrop_at(&self, backdrop: Backdrop, x: u32, y: u32) -> [u8; 3] {
        match backdrop {
            Backdrop::Solid(color) => color.to_rgb(),
            Backdrop::Checkerboard => {
                if (x / self.square + y / self.square) % 2 == 0 {
                    CHECKER_LIGHT
                } else {
                    CHECKER_DARK
                }
            },
        }
    }
}

/// Straight-alpha "over" onto an opaque background
fn over(pixel: Rgba<u8>, background: [u8; 3]) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    let alpha = u32::from(a);
    let blend = |src: u8, dst: u8| -> u8 {
        ((u32::from(src) * alpha + u32::from(dst) * (255 - alpha) + 127) / 255) as u8
    };
    Rgba([
        blend(r, background[0]),
        blend(g, background[1]),
        blend(b, background[2]),
        255,
    ])
}
