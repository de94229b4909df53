//! Alphabet mapping for the Markov word models.
//!
//! The printable alphabet is lowercase ASCII a-z, optionally extended by
//! an end-of-word symbol treated as one more output letter.  Contexts use
//! an extended alphabet with a start-of-word symbol in position zero, so
//! context digits read as a base-E number index transition-matrix rows.

use anyhow::{ensure, Result};

/// Highest supported Markov order.
pub const MAX_MARKOV_K: usize = 7;

/// Longest word either trained on or generated.
pub const MAX_TERM_LEN: usize = 15;

/// End-of-word symbol, printable form.
pub const EOW: u8 = b'$';

/// Start-of-word symbol, printable form.  Contexts store it as byte 0.
pub const SOW: u8 = b'^';

const NOT_IN_ALPHABET: i16 = -1;

pub struct Alphabet {
    col_map: [i16; 256],
    row_map: [i16; 256],
    rev_col_map: [u8; 32],
    rev_row_map: [u8; 32],
    /// A: number of output columns (26, or 27 with EOW).
    a_size: usize,
    /// E: number of context digits (always 27: SOW plus the letters).
    e_size: usize,
    use_eow: bool,
}

impl Alphabet {
    /// The lowercase-ASCII alphabet, with or without the EOW extension.
    pub fn lowercase_ascii(use_eow: bool) -> Alphabet {
        let mut col_map = [NOT_IN_ALPHABET; 256];
        let mut row_map = [NOT_IN_ALPHABET; 256];
        let mut rev_col_map = [0u8; 32];
        let mut rev_row_map = [0u8; 32];

        // Row digit zero is the start symbol, stored as byte 0 in context
        // buffers.
        row_map[0] = 0;
        rev_row_map[0] = SOW;

        let mut c = 0i16;
        let mut r = 1i16;
        for letter in b'a'..=b'z' {
            rev_col_map[c as usize] = letter;
            rev_row_map[r as usize] = letter;
            col_map[letter as usize] = c;
            row_map[letter as usize] = r;
            c += 1;
            r += 1;
        }
        if use_eow {
            // EOW becomes the last output column; it never appears in a
            // context, so it gets no row digit.
            rev_col_map[c as usize] = EOW;
            col_map[EOW as usize] = c;
            c += 1;
        }

        Alphabet {
            col_map,
            row_map,
            rev_col_map,
            rev_row_map,
            a_size: c as usize,
            e_size: r as usize,
            use_eow,
        }
    }

    #[inline]
    pub fn a_size(&self) -> usize {
        self.a_size
    }

    #[inline]
    pub fn e_size(&self) -> usize {
        self.e_size
    }

    #[inline]
    pub fn uses_eow(&self) -> bool {
        self.use_eow
    }

    /// Output column of a letter, or None for bytes outside the alphabet.
    #[inline]
    pub fn col(&self, byte: u8) -> Option<usize> {
        let c = self.col_map[byte as usize];
        (c >= 0).then_some(c as usize)
    }

    /// Column of the end-of-word symbol.  Only meaningful with EOW on.
    #[inline]
    pub fn eow_col(&self) -> usize {
        self.a_size - 1
    }

    /// Printable character for an output column.
    #[inline]
    pub fn col_char(&self, col: usize) -> u8 {
        self.rev_col_map[col]
    }

    /// Printable character for a context digit (for diagnostics).
    #[inline]
    pub fn row_char(&self, digit: usize) -> u8 {
        self.rev_row_map[digit]
    }

    /// Row index of a k-byte context, reading the bytes as base-E digits,
    /// scaled into a flat element offset (each row holds A elements).
    ///
    /// Context bytes are raw letters, with 0 for the start symbol.  The
    /// result is checked against E^k * A; overflow or an unmapped byte is
    /// an error rather than a misindexed row.
    pub fn row_index(&self, context: &[u8]) -> Result<usize> {
        let k = context.len();
        if k == 0 {
            return Ok(0);
        }
        let mut index: u64 = 0;
        for &byte in context {
            let digit = self.row_map[byte as usize];
            ensure!(
                digit >= 0 && (digit as usize) < self.e_size,
                "byte {:#04x} has no context digit",
                byte
            );
            index = index
                .checked_mul(self.e_size as u64)
                .and_then(|i| i.checked_add(digit as u64))
                .ok_or_else(|| anyhow::anyhow!("row index overflow for a {}-byte context", k))?;
        }
        let max_rows = (self.e_size as u64)
            .checked_pow(k as u32)
            .ok_or_else(|| anyhow::anyhow!("E^{} overflows", k))?;
        ensure!(index < max_rows, "row index {} out of range for order {}", index, k);
        Ok(index as usize * self.a_size)
    }
}
