//! OTP (One time password) code generation through HOTP (Hash-based) and TOTP (Time-based),
//! with `otpauth://` provisioning URIs rendered as QR codes for authenticator apps.
//!
//! HOTP is described at [RFC4226](https://tools.ietf.org/html/rfc4226)
//! TOTP is described at [RFC6238](https://datatracker.ietf.org/doc/html/rfc6238)
//!
//! Only the common authenticator profile is supported: HMAC-SHA1, 6 digits
//! and a 30 seconds period.
//!
//! ```
//! use glauth::{hotp, totp_with, Counter, compute_code};
//!
//! let key = b"12345678901234567890";
//! assert_eq!(hotp(key, 0).unwrap(), "755224");
//! assert_eq!(compute_code(key, Counter::hotp(9)).unwrap(), 520489);
//!
//! // any `Fn() -> i64` returning unix seconds can stand in for the clock
//! assert_eq!(totp_with(&|| 59, key).unwrap(), "287082");
//! ```

use cryptoxide::hmac::Hmac;
use cryptoxide::mac::Mac;
use cryptoxide::sha1::Sha1;
use std::convert::TryInto;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod error;
mod provision;
mod qr;

pub use error::{Error, Result};
pub use provision::{provisioning_uri, OtpType, Provisioning};
pub use qr::{
    encode_png, qr_code, qr_code_default, render_with, BarcodeRenderer, QrRenderer, DEFAULT_QR_SIZE,
};

use error::logged;

/// Number of decimal digits of a code
pub const DIGITS: usize = 6;

const MODULUS: u32 = 1_000_000;

/// TOTP time step in seconds
pub const PERIOD: i64 = 30;

const SHA1_OUTPUT: usize = 20;

/// 31 bits authentication token, before decimal reduction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token(u32);

impl Token {
    /// the numeric code, in `0..=999999`
    pub fn code(self) -> u32 {
        self.0 % MODULUS
    }

    pub fn dec6(self) -> String {
        format_code(self.code())
    }
}

impl From<Token> for u32 {
    fn from(t: Token) -> Self {
        t.code()
    }
}

/// Render a code as a zero-padded 6 digits decimal string
pub fn format_code(code: u32) -> String {
    format!("{:0width$}", code, width = DIGITS)
}

/// Source of the current unix time in seconds
///
/// TOTP reads the time through this so that tests and callers can pin it.
/// Closures returning `i64` implement it directly.
pub trait Clock {
    fn unix_seconds(&self) -> i64;

    fn unix_millis(&self) -> i128 {
        self.unix_seconds() as i128 * 1000
    }
}

/// Wall clock of the system
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> i64 {
        self.unix_millis().div_euclid(1000) as i64
    }

    fn unix_millis(&self) -> i128 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i128,
            Err(e) => -(e.duration().as_millis() as i128),
        }
    }
}

impl<F: Fn() -> i64> Clock for F {
    fn unix_seconds(&self) -> i64 {
        self()
    }
}

/// Counter to use for otp
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Counter(i64);

impl Counter {
    /// The counter is zero
    pub const fn zero() -> Self {
        Counter(0)
    }

    /// Increase the counter to the next value, sticking at the maximum
    pub const fn incr(self) -> Self {
        Counter(self.0.saturating_add(1))
    }

    pub const fn hotp(counter: i64) -> Self {
        Counter(counter)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Time step containing `unix_seconds`; times before the epoch give negative steps
    pub const fn totp_at(unix_seconds: i64) -> Self {
        Counter(unix_seconds.div_euclid(PERIOD))
    }

    pub fn totp_with<C: Clock + ?Sized>(clock: &C) -> Self {
        Self::totp_at(clock.unix_seconds())
    }

    pub fn totp_now() -> Self {
        Self::totp_with(&SystemClock)
    }

    pub fn totp_now_left() -> (Self, Duration) {
        Self::totp_left_with(&SystemClock)
    }

    /// Current time step, and how long until the next one starts
    pub fn totp_left_with<C: Clock + ?Sized>(clock: &C) -> (Self, Duration) {
        let ms = clock.unix_millis();
        let period = PERIOD as i128 * 1000;
        let slot = ms.div_euclid(period) as i64;
        let left = period - ms.rem_euclid(period);
        (Counter(slot), Duration::from_millis(left as u64))
    }
}

/// Compute the truncated HMAC-SHA1 token for `secret` at `counter`
pub fn otp(secret: &[u8], counter: Counter) -> Result<Token> {
    let hmac_message = counter.0.to_be_bytes();
    let mut output = [0u8; SHA1_OUTPUT];

    let mut hmac = Hmac::new(Sha1::new(), secret);
    hmac.input(&hmac_message);
    hmac.raw_result(&mut output);

    truncate(&output).map(Token)
}

// RFC4226 dynamic truncation: the low nibble of the last byte selects a
// 4 bytes big endian window, whose sign bit is dropped
fn truncate(digest: &[u8]) -> Result<u32> {
    let len = digest.len();
    let offset = match digest.last() {
        Some(last) => (last & 0x0f) as usize,
        None => return Err(Error::Truncation { offset: 0, len }),
    };
    let window: [u8; 4] = digest
        .get(offset..offset + 4)
        .and_then(|w| w.try_into().ok())
        .ok_or(Error::Truncation { offset, len })?;
    Ok(u32::from_be_bytes(window) & 0x7fff_ffff)
}

/// Numeric code, in `0..=999999`, for `key` at `counter`
pub fn compute_code(key: &[u8], counter: Counter) -> Result<u32> {
    otp(key, counter).map(Token::code)
}

/// TOTP code for the current time step of the system clock
pub fn totp(key: &[u8]) -> Result<String> {
    totp_with(&SystemClock, key)
}

pub fn totp_with<C: Clock + ?Sized>(clock: &C, key: &[u8]) -> Result<String> {
    totp_int_with(clock, key).map(format_code)
}

pub fn totp_int(key: &[u8]) -> Result<u32> {
    totp_int_with(&SystemClock, key)
}

pub fn totp_int_with<C: Clock + ?Sized>(clock: &C, key: &[u8]) -> Result<u32> {
    compute_code(key, Counter::totp_with(clock)).map_err(|e| logged("totp", e))
}

/// HOTP code for an explicit counter value; persisting and advancing
/// the counter is left to the caller
pub fn hotp(key: &[u8], counter: i64) -> Result<String> {
    hotp_int(key, counter).map(format_code)
}

pub fn hotp_int(key: &[u8], counter: i64) -> Result<u32> {
    compute_code(key, Counter::hotp(counter)).map_err(|e| logged("hotp", e))
}
