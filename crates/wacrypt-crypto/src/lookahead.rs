//! Single-byte lookahead over any `Read`
//!
//! The feature marker after the length byte is optional, so the header parser
//! must look at the next byte and only consume it when it is `0x01`.

use std::io::{self, Read};

#[derive(Debug)]
pub struct Lookahead<R> {
    inner: R,
    peeked: Option<u8>,
    consumed: usize,
}

impl<R: Read> Lookahead<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            consumed: 0,
        }
    }

    /// Look at the next byte without consuming it. `None` at end of input.
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        if self.peeked.is_none() {
            let mut byte = [0u8; 1];
            loop {
                match self.inner.read(&mut byte) {
                    Ok(0) => return Ok(None),
                    Ok(_) => {
                        self.peeked = Some(byte[0]);
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(self.peeked)
    }

    /// Consume and return the next byte. `None` at end of input.
    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.peeked = None;
            self.consumed += 1;
        }
        Ok(byte)
    }

    /// Consume the next byte only if it equals `expected`.
    pub fn next_if_eq(&mut self, expected: u8) -> io::Result<bool> {
        if self.peek()? == Some(expected) {
            self.peeked = None;
            self.consumed += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read up to `n` bytes; the result is shorter than `n` only at end of input.
    pub fn take_up_to(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        if n == 0 {
            return Ok(out);
        }
        if let Some(byte) = self.peeked.take() {
            out.push(byte);
        }
        let remaining = (n - out.len()) as u64;
        self.inner.by_ref().take(remaining).read_to_end(&mut out)?;
        self.consumed += out.len();
        Ok(out)
    }

    /// Bytes consumed so far (a peeked byte does not count until consumed).
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Return the underlying reader and any byte that was peeked but not consumed.
    pub fn into_parts(self) -> (Option<u8>, R) {
        (self.peeked, self.inner)
    }
}
