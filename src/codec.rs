//! Wire-level nibble cipher used by the Corsair Link dongle.
//!
//! The dongle never carries raw bytes. Every logical byte is split into two
//! nibbles and each nibble is widened to one symbol from a fixed 16-byte
//! alphabet (each nibble bit becomes a `01`/`10` two-bit group). A frame is
//! `[header] (lo-symbol, hi-symbol)* [0x00]`, low nibble first. The header
//! carries a 4-bit command code; the terminator is outside the alphabet, so
//! it can never occur inside a frame.

use crate::error::FrameError;

/// Frame terminator. Not a cipher symbol.
pub const TERMINATOR: u8 = 0x00;

/// Command code the dongle stamps on every reply header.
const REPLY_COMMAND: u8 = 7;

/// Reverse-table entry classes, kept in the upper nibble of each entry.
const CLASS_HEADER: u8 = 0x10;
const CLASS_DATA: u8 = 0x20;
/// Marks wire bytes outside the cipher alphabet.
const INVALID: u8 = 0xFF;

/// Bidirectional nibble <-> wire-symbol mapping.
///
/// `forward` is indexed by nibble value. `reverse` is indexed by wire byte
/// and holds `CLASS_DATA | nibble` for data symbols, `CLASS_HEADER | code`
/// for the masked header symbols, and `INVALID` everywhere else, so an
/// out-of-alphabet byte fails decoding instead of mapping to zero.
struct NibbleCipher {
    forward: [u8; 16],
    reverse: [u8; 256],
}

impl NibbleCipher {
    const fn new(forward: [u8; 16]) -> Self {
        let mut reverse = [INVALID; 256];
        let mut n = 0;
        while n < 16 {
            reverse[forward[n] as usize] = CLASS_DATA | n as u8;
            n += 1;
        }
        // Header symbols are data symbols with the low two bits cleared;
        // the stored code is the command shifted left by one.
        let mut command = 0u8;
        while command < 8 {
            let code = command << 1;
            reverse[(forward[code as usize] & 0xFC) as usize] = CLASS_HEADER | code;
            command += 1;
        }
        Self { forward, reverse }
    }
}

const CIPHER: NibbleCipher = NibbleCipher::new([
    0x55, 0x56, 0x59, 0x5A, 0x65, 0x66, 0x69, 0x6A, //
    0x95, 0x96, 0x99, 0x9A, 0xA5, 0xA6, 0xA9, 0xAA,
]);

// The two tables must form an invertible pair: all 16 codes present, no
// symbol collisions, and no header symbol shadowing a data symbol.
const _: () = {
    let cipher = CIPHER;
    let mut n = 0;
    while n < 16 {
        assert!(cipher.reverse[cipher.forward[n] as usize] == CLASS_DATA | n as u8);
        assert!(cipher.forward[n] != TERMINATOR);
        let mut m = n + 1;
        while m < 16 {
            assert!(cipher.forward[n] != cipher.forward[m]);
            m += 1;
        }
        n += 1;
    }
    let mut command = 0u8;
    while command < 8 {
        let code = command << 1;
        let header = cipher.forward[code as usize] & 0xFC;
        assert!(cipher.reverse[header as usize] == CLASS_HEADER | code);
        command += 1;
    }
};

/// Encode one command frame into `out`.
pub fn encode_frame<const N: usize>(
    command: u8,
    data: &[u8],
    out: &mut heapless::Vec<u8, N>,
) -> Result<(), FrameError> {
    let header = CIPHER.forward[((command << 1) & 0xF) as usize] & 0xFC;
    out.push(header).map_err(|_| FrameError::BufferFull)?;
    for &byte in data {
        out.push(CIPHER.forward[(byte & 0xF) as usize])
            .map_err(|_| FrameError::BufferFull)?;
        out.push(CIPHER.forward[(byte >> 4) as usize])
            .map_err(|_| FrameError::BufferFull)?;
    }
    out.push(TERMINATOR).map_err(|_| FrameError::BufferFull)
}

/// Decode one reply frame back into logical bytes.
///
/// The header must reverse-map to a code whose upper bits read as command 7;
/// the dongle stamps that on every reply it emits.
pub fn decode_frame<const N: usize>(wire: &[u8]) -> Result<heapless::Vec<u8, N>, FrameError> {
    let (&header, rest) = wire.split_first().ok_or(FrameError::UnterminatedFrame)?;
    let code = match CIPHER.reverse[header as usize] {
        INVALID => return Err(FrameError::InvalidSymbol(header)),
        entry => entry & 0xF,
    };
    if code >> 1 != REPLY_COMMAND {
        return Err(FrameError::BadHeader(header));
    }
    let body = rest
        .strip_suffix(&[TERMINATOR])
        .ok_or(FrameError::UnterminatedFrame)?;
    if body.len() % 2 != 0 {
        return Err(FrameError::OddLength(body.len()));
    }
    let mut out = heapless::Vec::new();
    for pair in body.chunks_exact(2) {
        let lo = data_nibble(pair[0])?;
        let hi = data_nibble(pair[1])?;
        out.push(lo | (hi << 4)).map_err(|_| FrameError::BufferFull)?;
    }
    Ok(out)
}

fn data_nibble(symbol: u8) -> Result<u8, FrameError> {
    match CIPHER.reverse[symbol as usize] {
        entry if entry & 0xF0 == CLASS_DATA => Ok(entry & 0xF),
        _ => Err(FrameError::InvalidSymbol(symbol)),
    }
}
