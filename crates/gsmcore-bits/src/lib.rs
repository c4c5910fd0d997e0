//! Conversion between the three bit representations used on the GSM radio
//! interface.
//!
//! - soft bits ([`SBit`]): one signed byte of demodulator confidence,
//!   -127..=127, negative meaning `1`
//! - unpacked bits ([`UBit`]): one byte per bit, `0` or `1`
//! - packed bits ([`PBit`]): eight bits per byte; bit `i` lives in byte
//!   `i / 8` at position `7 - i % 8` (MSB first) unless [`BitOrder::Lsb`]
//!   is requested
//!
//! Every function writes only into the slice it is handed and never
//! allocates. Undersized slices are reported as [`BitsError`].

pub mod error;
pub mod pack;
pub mod soft;

pub use error::{BitsError, Result};
pub use pack::{
    pbit_bytesize, pbit_to_ubit, pbit_to_ubit_ext, ubit_to_pbit, ubit_to_pbit_ext, BitOrder,
};
pub use soft::{sbit_to_ubit, ubit_to_sbit};

/// Soft bit (-127..=127).
pub type SBit = i8;

/// Unpacked bit (0 or 1).
pub type UBit = u8;

/// Eight packed bits.
pub type PBit = u8;
