//! `otpauth://` provisioning URIs, as consumed by authenticator apps
//!
//! `otpauth://<type>/<issuer>:<account>?secret=<base32>&issuer=<issuer>`

use crate::error::{logged, Error, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::str::FromStr;

const SCHEME: &str = "otpauth";
const OTP_ALPHABET: base32::Alphabet = base32::Alphabet::RFC4648 { padding: true };

// path segment escaping: unreserved characters and the sub-delims
// '$&+=@' stay literal, ':' is escaped so it never leaks from the issuer
// or the account into the label separator
const LABEL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'=')
    .remove(b'@');

/// Kind of one time password an authenticator should generate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OtpType {
    Totp,
    Hotp,
}

impl OtpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpType::Totp => "totp",
            OtpType::Hotp => "hotp",
        }
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OtpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("totp") {
            Ok(OtpType::Totp)
        } else if s.eq_ignore_ascii_case("hotp") {
            Ok(OtpType::Hotp)
        } else {
            Err(Error::UnknownOtpType(s.to_string()))
        }
    }
}

/// Everything needed to enroll a secret in an authenticator app
#[derive(Clone, PartialEq, Eq)]
pub struct Provisioning {
    pub account: String,
    pub issuer: String,
    pub otp_type: OtpType,
    pub secret: Vec<u8>,
}

// the secret stays out of debug output
impl fmt::Debug for Provisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioning")
            .field("account", &self.account)
            .field("issuer", &self.issuer)
            .field("otp_type", &self.otp_type)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Provisioning {
    pub fn new(account: &str, issuer: &str, otp_type: OtpType, secret: &[u8]) -> Self {
        Provisioning {
            account: account.to_string(),
            issuer: issuer.to_string(),
            otp_type,
            secret: secret.to_vec(),
        }
    }

    pub fn to_url(&self) -> Result<url::Url> {
        let label = format!(
            "{}:{}",
            utf8_percent_encode(&self.issuer, LABEL),
            utf8_percent_encode(&self.account, LABEL)
        );
        let mut url = url::Url::parse(&format!("{}://{}/{}", SCHEME, self.otp_type, label))?;

        let secret = base32::encode(OTP_ALPHABET, &self.secret);
        url.query_pairs_mut()
            .append_pair("secret", &secret)
            .append_pair("issuer", &self.issuer);
        Ok(url)
    }

    pub fn to_uri(&self) -> Result<String> {
        let url = self.to_url().map_err(|e| logged("provisioning uri", e))?;
        log::debug!(
            "built {} provisioning uri of {} bytes",
            self.otp_type,
            url.as_str().len()
        );
        Ok(url.into())
    }

    pub fn from_uri(uri: &str) -> Result<Self> {
        Self::from_url(&url::Url::parse(uri)?)
    }

    pub fn from_url(url: &url::Url) -> Result<Self> {
        if url.scheme() != SCHEME {
            return Err(Error::InvalidScheme(url.scheme().to_string()));
        }
        let otp_type = OtpType::from_str(url.host_str().unwrap_or(""))?;

        let path = url.path();
        let path = path.strip_prefix('/').unwrap_or(path);

        // split before unescaping, an escaped ':' belongs to its component
        let (label_issuer, account) = match path.split_once(':') {
            None => (None, unescape(path)?),
            Some((issuer, account)) => (Some(unescape(issuer)?), unescape(account)?),
        };
        // optional spaces may follow the separator
        let account = account.trim_start_matches(' ').to_string();

        let mut secret = None;
        let mut param_issuer = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "secret" => secret = Some(value.into_owned()),
                "issuer" => param_issuer = Some(value.into_owned()),
                _ => {}
            }
        }

        let secret = secret.ok_or(Error::MissingSecret)?;
        let secret = base32::decode(OTP_ALPHABET, &secret.to_ascii_uppercase())
            .ok_or(Error::InvalidSecret)?;

        Ok(Provisioning {
            account,
            issuer: label_issuer.or(param_issuer).unwrap_or_default(),
            otp_type,
            secret,
        })
    }
}

fn unescape(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|_| Error::InvalidLabel)
}

/// Build the provisioning URI for `key`
pub fn provisioning_uri(
    account: &str,
    issuer: &str,
    otp_type: OtpType,
    key: &[u8],
) -> Result<String> {
    Provisioning::new(account, issuer, otp_type, key).to_uri()
}
