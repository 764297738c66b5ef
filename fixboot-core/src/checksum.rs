/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FIX checksum (tag 10) helpers.
//!
//! The checksum is the byte sum of everything preceding the `10=` field,
//! modulo 256, rendered as three zero-padded digits.

/// Calculates the FIX checksum of `data`.
///
/// # Example
/// ```
/// use fixboot_core::calculate_checksum;
///
/// let checksum = calculate_checksum(b"8=FIX.4.4\x019=5\x0135=0\x01");
/// assert!(checksum <= 255);
/// ```
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Renders a checksum as its three ASCII digits.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    [
        b'0' + checksum / 100,
        b'0' + (checksum / 10) % 10,
        b'0' + checksum % 10,
    ]
}

/// Parses the three ASCII digits of a checksum field.
///
/// Returns `None` unless `bytes` is exactly three digits with a value
/// no greater than 255.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != 3 {
        return None;
    }
    let mut value: u16 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u16::from(b - b'0');
    }
    u8::try_from(value).ok()
}
