//! Per-object transfer state machine.
//!
//! ```text
//! Pending ──▶ Fetching ──▶ Writing ──▶ Verified
//!                ▲            │
//!                └────────────┤
//!                             └──────▶ Corrupt
//! ```
//!
//! The state is owned by a single worker and never shared. The invariant
//! `bytes_written <= expected_size` holds after every transition.

use crate::store::ByteRange;

/// Phase of an object transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Not started; destination not yet opened.
    Pending,
    /// A range request is outstanding.
    Fetching,
    /// Bytes from the current range are being appended.
    Writing,
    /// All expected bytes were written.
    Verified,
    /// The transfer stopped short; the destination is discarded.
    Corrupt,
}

impl TransferPhase {
    /// True for `Verified` and `Corrupt`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Corrupt)
    }
}

/// Returned when a write would push `bytes_written` past `expected_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// Bytes the caller tried to record.
    pub attempted: u64,
    /// Bytes still allowed.
    pub remaining: u64,
}

/// Byte accounting for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    bytes_written: u64,
    expected_size: u64,
    phase: TransferPhase,
}

impl TransferState {
    /// Creates a pending transfer for an object of `expected_size` bytes.
    #[must_use]
    pub fn new(expected_size: u64) -> Self {
        Self {
            bytes_written: 0,
            expected_size,
            phase: TransferPhase::Pending,
        }
    }

    /// Bytes appended to the destination so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Size reported by the listing.
    #[must_use]
    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    /// Bytes still missing.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.expected_size - self.bytes_written
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Plans the next range request and moves to `Fetching`.
    ///
    /// The range starts at `bytes_written` and spans
    /// `min(chunk_size, remaining)` bytes. Returns `None` once nothing is
    /// left to fetch, when `chunk_size` is zero, or in a terminal phase.
    pub fn next_range(&mut self, chunk_size: u64) -> Option<ByteRange> {
        if self.phase.is_terminal() {
            return None;
        }
        let range = ByteRange::new(self.bytes_written, chunk_size.min(self.remaining()))?;
        self.phase = TransferPhase::Fetching;
        Some(range)
    }

    /// Records `len` bytes appended to the destination and moves to `Writing`.
    ///
    /// # Errors
    ///
    /// Returns [`Overflow`] without changing the count when `len` exceeds
    /// the remaining size.
    pub fn record_written(&mut self, len: u64) -> Result<(), Overflow> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Overflow {
                attempted: len,
                remaining,
            });
        }
        self.bytes_written += len;
        self.phase = TransferPhase::Writing;
        Ok(())
    }

    /// Forces the `Corrupt` phase after a failure outside byte accounting
    /// (for example a failed flush).
    pub fn mark_corrupt(&mut self) {
        self.phase = TransferPhase::Corrupt;
    }

    /// Ends the transfer: `Verified` when every byte arrived, `Corrupt`
    /// otherwise. Returns the terminal phase.
    pub fn finish(&mut self) -> TransferPhase {
        self.phase = if self.bytes_written == self.expected_size {
            TransferPhase::Verified
        } else {
            TransferPhase::Corrupt
        };
        self.phase
    }
}
