//! Error types for the decoder, executor, and CLI shell.
#![allow(dead_code)]

/// Every fatal condition this crate can raise, from CLI misuse down to
/// executor invariants. Modeled as a single `thiserror`-derived enum, the
/// way this codebase models its own driver-level error type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("unknown opcode 0x{byte:02x} at ip={ip}")]
    UnknownOpcode { byte: u8, ip: u16 },

    #[error("invalid arithmetic sub-opcode bits {bits:#05b} in shared 100000sw family")]
    InvalidArithmeticSubop { bits: u8 },

    #[error("truncated instruction: ran out of bytes while decoding at ip={ip}")]
    TruncatedInstruction { ip: u16 },

    #[error("destination operand is not writable")]
    UnwritableDestination,

    #[error("effective address 0x{address:04x} is out of bounds (capacity {capacity})")]
    AddressOutOfBounds { address: u32, capacity: usize },
}

impl SimError {
    /// Distinguishes CLI misuse from decode/execute failures; both exit 1,
    /// but callers that want to vary their diagnostic can branch on this.
    pub fn is_usage(&self) -> bool {
        matches!(self, SimError::Usage(_))
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Io {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
