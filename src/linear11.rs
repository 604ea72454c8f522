//! PMBus "linear11" floating-point codec.
//!
//! Telemetry registers return two little-endian bytes holding an 11-bit
//! mantissa and a 5-bit two's-complement exponent.

use modular_bitfield::prelude::*;

/// Raw bit layout of a linear11 word.
#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy)]
struct RawLinear11 {
    mantissa: B11,
    exponent: B5,
}

/// Decode two reply bytes into a float.
///
/// Mantissa values strictly above 1024 sign-extend negative; 1024 itself
/// stays positive. That boundary matches what the PSU firmware emits, not
/// textbook two's complement.
pub fn decode_linear11(data: [u8; 2]) -> f32 {
    let raw = RawLinear11::from_bytes(data);
    let mut exponent = raw.exponent() as i32;
    if exponent > 15 {
        exponent -= 32;
    }
    let mut mantissa = raw.mantissa() as i32;
    if mantissa > 1024 {
        mantissa -= 2048;
    }
    mantissa as f32 * 2f32.powi(exponent)
}

/// Encode a value with a caller-chosen scale: the stored mantissa is
/// `value * 2^exponent`, clamped to the representable +/-1023.
pub fn encode_linear11(value: f32, exponent: i32) -> [u8; 2] {
    let mantissa = if value > 0.0 {
        ((value * 2f32.powi(exponent)) as i32).min(1023)
    } else {
        ((value * 2f32.powi(exponent)) as i32).max(-1023) & 0x7FF
    };
    let stored_exponent = if exponent <= 0 {
        -exponent
    } else {
        256 - exponent
    };
    let high = ((mantissa >> 8) & 0xFF) as u8 | ((stored_exponent << 3) & 0xFF) as u8;
    [(mantissa & 0xFF) as u8, high]
}
