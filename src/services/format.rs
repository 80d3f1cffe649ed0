//! Output format handling service
//!
//! Sniffs the format of result bytes and derives the names and mime types used
//! when handing a result to the host.

use image::ImageFormat;

/// Suffix appended to the original base name of a download
pub const DOWNLOAD_SUFFIX: &str = "-no-bg";

/// Base name used when the original file name has none
const FALLBACK_BASE_NAME: &str = "image";

/// Service for naming and classifying result images
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Guess the format of encoded image bytes from their magic number
    ///
    /// # Examples
    /// ```rust
    /// use remote_bgremove::services::OutputFormatHandler;
    /// use image::ImageFormat;
    ///
    /// let png_magic = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    /// assert_eq!(OutputFormatHandler::detect_format(png_magic), Some(ImageFormat::Png));
    /// assert_eq!(OutputFormatHandler::detect_format(b"hello"), None);
    /// ```
    #[must_use]
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// File extension (without the dot) for a format
    ///
    /// # Examples
    /// ```rust
    /// use remote_bgremove::services::OutputFormatHandler;
    /// use image::ImageFormat;
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(ImageFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(ImageFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: ImageFormat) -> &'static str {
        match format {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
            ImageFormat::Tiff => "tiff",
            other => other.extensions_str().first().copied().unwrap_or("png"),
        }
    }

    /// Extension for result bytes; PNG when the format cannot be sniffed
    #[must_use]
    pub fn extension_for(bytes: &[u8]) -> &'static str {
        Self::detect_format(bytes).map_or("png", Self::get_extension)
    }

    /// Mime type for result bytes; `image/png` when the format cannot be sniffed
    #[must_use]
    pub fn mime_type_for(bytes: &[u8]) -> &'static str {
        Self::detect_format(bytes).map_or("image/png", |format| format.to_mime_type())
    }

    /// Check if a format can carry transparency
    #[must_use]
    pub fn supports_transparency(format: ImageFormat) -> bool {
        !matches!(format, ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Pnm)
    }

    /// Derive `<base>-no-bg.<extension>` from the original file name
    ///
    /// The base name is the final path component up to its first dot, so
    /// `holiday.final.jpg` becomes `holiday-no-bg.png`.
    ///
    /// # Examples
    /// ```rust
    /// use remote_bgremove::services::OutputFormatHandler;
    ///
    /// assert_eq!(OutputFormatHandler::download_name("cat.jpeg", "png"), "cat-no-bg.png");
    /// assert_eq!(OutputFormatHandler::download_name("", "png"), "image-no-bg.png");
    /// ```
    #[must_use]
    pub fn download_name(original: &str, extension: &str) -> String {
        let file_name = original.rsplit(['/', '\\']).next().unwrap_or(original);
        let base = file_name.split('.').next().unwrap_or_default().trim();
        let base = if base.is_empty() { FALLBACK_BASE_NAME } else { base };
        format!("{base}{DOWNLOAD_SUFFIX}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    fn encode(format: ImageFormat) -> Vec<u8> {
        let image = ImageBuffer::from_pixel(2, 2, Rgba([1u8, 2, 3, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detects_encoded_formats() {
        assert_eq!(OutputFormatHandler::detect_format(&encode(ImageFormat::Png)), Some(ImageFormat::Png));
        assert_eq!(OutputFormatHandler::detect_format(&encode(ImageFormat::Jpeg)), Some(ImageFormat::Jpeg));
        assert_eq!(OutputFormatHandler::extension_for(&encode(ImageFormat::Jpeg)), "jpg");
        assert_eq!(OutputFormatHandler::mime_type_for(&encode(ImageFormat::Png)), "image/png");
    }

    #[test]
    fn test_unknown_bytes_default_to_png() {
        assert_eq!(OutputFormatHandler::extension_for(b"\x00\x01"), "png");
        assert_eq!(OutputFormatHandler::mime_type_for(b""), "image/png");
    }

    #[test]
    fn test_download_names() {
        assert_eq!(OutputFormatHandler::download_name("portrait.jpg", "png"), "portrait-no-bg.png");
        assert_eq!(OutputFormatHandler::download_name("holiday.final.jpg", "png"), "holiday-no-bg.png");
        assert_eq!(OutputFormatHandler::download_name("/tmp/in/dog.webp", "webp"), "dog-no-bg.webp");
        assert_eq!(OutputFormatHandler::download_name("C:\\pics\\car.png", "png"), "car-no-bg.png");
        assert_eq!(OutputFormatHandler::download_name("noext", "png"), "noext-no-bg.png");
        assert_eq!(OutputFormatHandler::download_name(".hidden", "png"), "image-no-bg.png");
    }

    #[test]
    fn test_transparency_support() {
        assert!(OutputFormatHandler::supports_transparency(ImageFormat::Png));
        assert!(OutputFormatHandler::supports_transparency(ImageFormat::WebP));
        assert!(!OutputFormatHandler::supports_transparency(ImageFormat::Jpeg));
    }
}
