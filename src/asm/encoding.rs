//! Formatters which can read and write memory images.
//!
//! The [`ImageFormat`] trait describes an implementation of reading/writing memory images.
//! This module provides two implementations of the trait:
//! - [`BinaryFormat`]: the raw bytes of the image
//! - [`HexFormat`]: a text representation of the image, as space-separated hex pairs

/// A trait defining memory image formats.
pub trait ImageFormat {
    /// Representation of the serialized format.
    ///
    /// For binary formats, `[u8]` should be used.
    /// For text-based formats,`str` should be used.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(image: &[u8]) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(i: &Self::Stream) -> Option<Vec<u8>>;
}

/// A binary format of image data.
///
/// This is the image exactly as it is laid out in memory, starting at address `$0000`.
pub struct BinaryFormat;
impl ImageFormat for BinaryFormat {
    type Stream = [u8];

    fn serialize(image: &[u8]) -> <Self::Stream as ToOwned>::Owned {
        image.to_vec()
    }

    fn deserialize(i: &Self::Stream) -> Option<Vec<u8>> {
        Some(i.to_vec())
    }
}

/// A text format of image data.
///
/// Each byte is written as two uppercase hex digits, separated by single spaces
/// (e.g., `A9 01 8D 00 02`).
///
/// ```
/// use mos6502_asm::asm::encoding::{HexFormat, ImageFormat};
///
/// assert_eq!(HexFormat::serialize(&[0xA9, 0x01, 0x00]), "A9 01 00");
/// assert_eq!(HexFormat::deserialize("a9 1 00"), None);
/// assert_eq!(HexFormat::deserialize("A9\n01  00 "), Some(vec![0xA9, 0x01, 0x00]));
/// ```
pub struct HexFormat;
impl ImageFormat for HexFormat {
    type Stream = str;

    fn serialize(image: &[u8]) -> <Self::Stream as ToOwned>::Owned {
        image.iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn deserialize(i: &Self::Stream) -> Option<Vec<u8>> {
        i.split_ascii_whitespace()
            .map(hex2u8)
            .collect()
    }
}

fn hex2u8(s: &str) -> Option<u8> {
    let is_upper_hex = s.len() == 2 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'A'..=b'F'));
    match is_upper_hex {
        true  => u8::from_str_radix(s, 16).ok(),
        false => None
    }
}

/// Drops the zero bytes at the start of an image.
///
/// An image consisting only of zeroes becomes empty.
///
/// ```
/// use mos6502_asm::asm::encoding::strip_leading_zeros;
///
/// assert_eq!(strip_leading_zeros(&[0, 0, 0xEA, 0]), [0xEA, 0]);
/// assert!(strip_leading_zeros(&[0, 0]).is_empty());
/// ```
pub fn strip_leading_zeros(image: &[u8]) -> &[u8] {
    let start = image.iter()
        .position(|&b| b != 0)
        .unwrap_or(image.len());
    &image[start..]
}
