//! "Simple words" representation: the rank rendered in base-24 letters,
//! decorated with a prefix and postfix driven by the rank's divisibility
//! by small primes.  The decorations break up the otherwise very regular
//! shape of pure base-24 strings.

use anyhow::{ensure, Result};

const WORD_BUFFER_SIZE: usize = 16;
const ALPHABET_SIZE: u64 = 24;

/// Render `term_number` (0-based) as a simple word.
pub fn simple_words(term_number: u64) -> Result<Vec<u8>> {
    let n = term_number + 1;
    let mut buffer = [0u8; WORD_BUFFER_SIZE];
    let eob = WORD_BUFFER_SIZE - 1;

    // Ranks divisible by 11 go undecorated at the front.
    let prefix_len: usize = if n % 11 == 0 { 0 } else { 2 };
    let mut wp = prefix_len;

    let mut t = n;
    while t > 0 {
        ensure!(wp < eob, "word buffer overflow in simple_words({term_number})");
        buffer[wp] = b'a' + (t % ALPHABET_SIZE) as u8;
        wp += 1;
        t /= ALPHABET_SIZE;
    }

    // Ranks divisible by 5 get a 'y' postfix echoing the word's opening
    // letters; divisibility by 17 lengthens the echo.
    if n % 5 == 0 {
        let mut postfix_len = 2usize;
        if n % 17 == 0 {
            postfix_len += 2;
        }
        ensure!(wp < eob, "word buffer overflow in simple_words({term_number})");
        buffer[wp] = b'y';
        wp += 1;
        let mut src = prefix_len;
        for _ in 0..postfix_len - 1 {
            ensure!(wp < eob, "word buffer overflow in simple_words({term_number})");
            buffer[wp] = buffer[src];
            wp += 1;
            src += 1;
        }
    }

    if prefix_len > 0 {
        // The prefix is the first body letter doubled ahead of a 'z'
        // marker.
        buffer[1] = b'z';
        buffer[0] = buffer[2];
    }

    Ok(buffer[..wp].to_vec())
}
