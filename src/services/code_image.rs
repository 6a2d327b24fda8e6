//! QR code rendering for published addresses.
//!
//! [`render`] is a pure function: the same address always yields the same bitmap.

use image::{GrayImage, Luma};
use qrcode::types::QrError;
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

/// Error-correction level used for every code.
///
/// Addresses are shown on screen, not printed, so the lowest level keeps the
/// matrix small and easy to scan.
pub const ERROR_CORRECTION: EcLevel = EcLevel::L;

/// Side length of one QR module in pixels
pub const MODULE_PIXELS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("address of {len} bytes exceeds QR code capacity")]
    TooLong { len: usize },

    #[error("QR encoding failed: {0}")]
    Qr(QrError),
}

/// 8-bit greyscale raster of a QR code, dark modules at 0 and light at 255
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    image: GrayImage,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Grey value of the pixel at `(x, y)`. Panics if out of bounds.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y).0[0]
    }

    /// Row-major greyscale bytes, `width * height` long
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Expand to packed RGB bytes for toolkits without a greyscale format.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.as_raw().iter().flat_map(|&v| [v, v, v]).collect()
    }
}

/// Encode `address` as a QR code and rasterize it, quiet zone included.
pub fn render(address: &str) -> Result<Bitmap, EncodingError> {
    let code = QrCode::with_error_correction_level(address.as_bytes(), ERROR_CORRECTION).map_err(
        |err| match err {
            QrError::DataTooLong => EncodingError::TooLong { len: address.len() },
            other => EncodingError::Qr(other),
        },
    )?;

    let image = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .build();

    tracing::debug!(
        "Rendered QR code version {:?} as {}x{} bitmap",
        code.version(),
        image.width(),
        image.height()
    );

    Ok(Bitmap { image })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bitmap: &Bitmap) -> String {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            bitmap.width() as usize,
            bitmap.height() as usize,
            |x, y| bitmap.luma(x as u32, y as u32),
        );
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1, "expected exactly one QR code");
        let (_meta, content) = grids[0].decode().unwrap();
        content
    }

    #[test]
    fn test_round_trip_through_reference_decoder() {
        let bitmap = render("http://example.onion").unwrap();
        assert_eq!(decode(&bitmap), "http://example.onion");
    }

    #[test]
    fn test_round_trip_with_slug() {
        let address = "http://abcdefghijklmnop.onion/xkcd-correct-horse";
        assert_eq!(decode(&render(address).unwrap()), address);
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = render("http://abc123.onion").unwrap();
        let b = render("http://abc123.onion").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bitmap_is_square_and_module_aligned() {
        let bitmap = render("http://abc123.onion").unwrap();
        assert_eq!(bitmap.width(), bitmap.height());
        assert_eq!(bitmap.width() % MODULE_PIXELS, 0);
        assert_eq!(bitmap.as_raw().len(), (bitmap.width() * bitmap.height()) as usize);
        // Quiet zone corner is light.
        assert_eq!(bitmap.luma(0, 0), 255);
    }

    #[test]
    fn test_rgb_expansion() {
        let bitmap = render("http://abc123.onion").unwrap();
        let rgb = bitmap.to_rgb8();
        assert_eq!(rgb.len(), bitmap.as_raw().len() * 3);
        assert!(rgb.chunks(3).all(|px| px[0] == px[1] && px[1] == px[2]));
    }

    #[test]
    fn test_oversized_address_fails() {
        let address = format!("http://{}.onion", "a".repeat(4000));
        let err = render(&address).unwrap_err();
        assert_eq!(err, EncodingError::TooLong { len: address.len() });
    }
}
