//! Base62 public ids.
//!
//! Row ids are small sequential integers. Public ids add a fixed offset
//! (so the first entries are not one-character ids) and encode with a
//! 62-character alphabet, which may be shuffled to make consecutive ids
//! look unrelated. The mapping stays a bijection either way.

use thiserror::Error;

pub const BASE: u64 = 62;

/// `a-z`, `0-9`, `A-Z`.
pub const NATURAL: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A fixed permutation of [`NATURAL`].
pub const SHUFFLED: &str = "krKL5Z0Uz9tiXh3lNsq1MFVmPcdIeoyB28vWGupQS7H6wOYDnJbfEgTxRAa4Cj";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdCodecError {
    #[error("Base62 alphabet must have exactly 62 characters, got {0}")]
    WrongLength(usize),
    #[error("Base62 alphabet must be ASCII")]
    NotAscii,
    #[error("Base62 alphabet repeats the character '{0}'")]
    Duplicate(char),
}

/// An integer ↔ string codec over one 62-character alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base62 {
    alphabet: [u8; BASE as usize],
    /// Reverse lookup: byte → digit value.
    digits: [Option<u8>; 128],
}

impl Base62 {
    pub fn new(alphabet: &str) -> Result<Self, IdCodecError> {
        if !alphabet.is_ascii() {
            return Err(IdCodecError::NotAscii);
        }
        let bytes = alphabet.as_bytes();
        if bytes.len() != BASE as usize {
            return Err(IdCodecError::WrongLength(alphabet.chars().count()));
        }

        let mut table = [0u8; BASE as usize];
        let mut digits = [None; 128];
        for (value, &byte) in bytes.iter().enumerate() {
            if digits[byte as usize].is_some() {
                return Err(IdCodecError::Duplicate(byte as char));
            }
            digits[byte as usize] = Some(value as u8);
            table[value] = byte;
        }

        Ok(Self {
            alphabet: table,
            digits,
        })
    }

    /// Most-significant digit first. Zero is the alphabet's first character.
    pub fn encode(&self, mut n: u64) -> String {
        if n == 0 {
            return (self.alphabet[0] as char).to_string();
        }
        let mut out = Vec::new();
        while n > 0 {
            out.push(self.alphabet[(n % BASE) as usize]);
            n /= BASE;
        }
        out.reverse();
        out.into_iter().map(char::from).collect()
    }

    /// `None` for empty input, characters outside the alphabet, or values
    /// that overflow `u64`.
    pub fn decode(&self, s: &str) -> Option<u64> {
        if s.is_empty() {
            return None;
        }
        s.bytes().try_fold(0u64, |acc, byte| {
            let digit = (*self.digits.get(byte as usize)?)?;
            acc.checked_mul(BASE)?.checked_add(u64::from(digit))
        })
    }
}

/// Row id ↔ public id, with a fixed offset added before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCodec {
    pub base62: Base62,
    pub offset: u64,
}

impl IdCodec {
    pub fn new(base62: Base62, offset: u64) -> Self {
        Self { base62, offset }
    }

    /// Public id for a row id. Negative row ids are not valid rows.
    pub fn public_id(&self, row_id: i64) -> Option<String> {
        let row = u64::try_from(row_id).ok()?;
        Some(self.base62.encode(row.checked_add(self.offset)?))
    }

    /// Row id behind a public id, or `None` if it does not decode or falls
    /// below the offset.
    pub fn row_id(&self, public: &str) -> Option<i64> {
        let raw = self.base62.decode(public)?;
        i64::try_from(raw.checked_sub(self.offset)?).ok()
    }
}
