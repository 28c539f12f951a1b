//! QR code rendering of provisioning URIs.
//!
//! Encoding goes through [`BarcodeRenderer`] so that URI building and code
//! generation stay usable without any imaging. [`QrRenderer`] uses the `qrcode`
//! crate for the matrix and `image` for the bitmap.

use crate::error::{logged, Error, Result};
use crate::provision::{OtpType, Provisioning};
use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};

/// Side in pixels of the default QR code
pub const DEFAULT_QR_SIZE: u32 = 200;

const WHITE: Luma<u8> = Luma([255u8]);
const BLACK: Luma<u8> = Luma([0u8]);

/// Encode a string as a 2-D barcode image of the requested pixel size
pub trait BarcodeRenderer {
    type Image;

    fn render(&self, data: &str, width: u32, height: u32) -> Result<Self::Image>;
}

/// QR codes at the highest error correction level, with the encoding
/// mode picked from the content
#[derive(Clone, Copy, Debug, Default)]
pub struct QrRenderer;

impl BarcodeRenderer for QrRenderer {
    type Image = GrayImage;

    fn render(&self, data: &str, width: u32, height: u32) -> Result<GrayImage> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)?;
        scale(code.width() as u32, &code.to_colors(), width, height)
    }
}

// Scale the module matrix by the largest integer factor fitting in
// width x height, centered on a white canvas
fn scale(modules: u32, colors: &[Color], width: u32, height: u32) -> Result<GrayImage> {
    let factor = if modules == 0 {
        0
    } else {
        (width / modules).min(height / modules)
    };
    if factor == 0 {
        return Err(Error::ScaleTooSmall {
            modules,
            width,
            height,
        });
    }

    let off_x = (width - modules * factor) / 2;
    let off_y = (height - modules * factor) / 2;
    let span = modules * factor;

    let mut img = GrayImage::from_pixel(width, height, WHITE);
    for y in 0..span {
        for x in 0..span {
            let idx = ((y / factor) * modules + x / factor) as usize;
            if colors.get(idx) == Some(&Color::Dark) {
                img.put_pixel(off_x + x, off_y + y, BLACK);
            }
        }
    }
    Ok(img)
}

/// Render `uri` with any barcode renderer
pub fn render_with<R: BarcodeRenderer + ?Sized>(
    renderer: &R,
    uri: &str,
    width: u32,
    height: u32,
) -> Result<R::Image> {
    let img = renderer
        .render(uri, width, height)
        .map_err(|e| logged("barcode rendering", e))?;
    log::debug!("rendered provisioning barcode at {}x{}", width, height);
    Ok(img)
}

/// QR code enrolling `key` for `account` at `issuer`
pub fn qr_code(
    account: &str,
    issuer: &str,
    otp_type: OtpType,
    key: &[u8],
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    let uri = Provisioning::new(account, issuer, otp_type, key).to_uri()?;
    render_with(&QrRenderer, &uri, width, height)
}

/// TOTP enrollment QR code at the default size
pub fn qr_code_default(account: &str, issuer: &str, key: &[u8]) -> Result<GrayImage> {
    qr_code(
        account,
        issuer,
        OtpType::Totp,
        key,
        DEFAULT_QR_SIZE,
        DEFAULT_QR_SIZE,
    )
}

/// PNG bytes of a rendered code
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| logged("png encoding", Error::from(e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "otpauth://totp/ExampleCo:alice?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&issuer=ExampleCo";

    #[test]
    fn default_size() {
        let img = qr_code_default("alice", "ExampleCo", b"12345678901234567890").unwrap();
        assert_eq!(img.dimensions(), (200, 200));
        assert!(img.pixels().any(|p| *p == BLACK));
        assert!(img.pixels().any(|p| *p == WHITE));
    }

    #[test]
    fn exact_requested_dimensions() {
        let img = render_with(&QrRenderer, URI, 333, 250).unwrap();
        assert_eq!(img.dimensions(), (333, 250));
        // the centered code leaves white margins on the wide axis
        assert_eq!(*img.get_pixel(0, 125), WHITE);
    }

    #[test]
    fn too_small() {
        match QrRenderer.render(URI, 10, 10) {
            Err(Error::ScaleTooSmall { modules, .. }) => assert!(modules > 10),
            other => panic!("unexpected {:?}", other.map(|i| i.dimensions())),
        }
    }

    #[test]
    fn scaling_layout() {
        // 2x2 checker, scaled by 3 inside an 8x6 canvas
        let colors = [Color::Dark, Color::Light, Color::Light, Color::Dark];
        let img = scale(2, &colors, 8, 6).unwrap();
        assert_eq!(img.dimensions(), (8, 6));
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert_eq!(*img.get_pixel(1, 0), BLACK);
        assert_eq!(*img.get_pixel(3, 2), BLACK);
        assert_eq!(*img.get_pixel(4, 0), WHITE);
        assert_eq!(*img.get_pixel(4, 3), BLACK);
        assert_eq!(*img.get_pixel(7, 5), WHITE);
        assert!(scale(0, &[], 8, 6).is_err());
        assert!(scale(2, &colors, 8, 1).is_err());
    }

    struct Text;

    impl BarcodeRenderer for Text {
        type Image = String;

        fn render(&self, data: &str, width: u32, height: u32) -> Result<String> {
            Ok(format!("{}@{}x{}", data, width, height))
        }
    }

    #[test]
    fn custom_renderer() {
        assert_eq!(
            render_with(&Text, "otpauth://hotp/a:b", 1, 2).unwrap(),
            "otpauth://hotp/a:b@1x2"
        );
    }

    #[test]
    fn png_bytes() {
        let img = qr_code("alice", "ExampleCo", OtpType::Hotp, b"key", 120, 120).unwrap();
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
