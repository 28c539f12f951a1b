use thiserror::Error;

/// Errors produced while computing codes, building provisioning URIs
/// or rendering them as barcodes
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncation window at offset {offset} is outside a {len} byte digest")]
    Truncation { offset: usize, len: usize },

    #[error("invalid provisioning uri: {0}")]
    Uri(#[from] url::ParseError),

    #[error("unexpected uri scheme '{0}', expected 'otpauth'")]
    InvalidScheme(String),

    #[error("unknown otp type '{0}'")]
    UnknownOtpType(String),

    #[error("provisioning uri has no secret")]
    MissingSecret,

    #[error("secret is not valid base32")]
    InvalidSecret,

    #[error("label is not valid utf-8 once unescaped")]
    InvalidLabel,

    #[error("qr encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("cannot scale a {modules}x{modules} code down to {width}x{height}")]
    ScaleTooSmall {
        modules: u32,
        width: u32,
        height: u32,
    },

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

// report a failure at a public entry point before handing it back
pub(crate) fn logged(context: &str, err: Error) -> Error {
    log::error!("{}: {}", context, err);
    err
}
