//! Number assignment for batch renames.
//!
//! Sequential mode counts up from a start index. Scramble mode draws distinct
//! random numbers from `1..=count * multiplier`, which is the only source of
//! nondeterminism in the crate; tests seed it through [`assign_numbers_with_rng`].

use rand::Rng;
use rand::seq::index;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberingError {
    #[error("{count} numbers starting at {start} do not fit in a u64")]
    SequenceOverflow { start: u64, count: usize },
}

/// How numbers are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingMode {
    /// `start, start + 1, ...`
    Sequential { start: u64 },
    /// Distinct random values in `1..=count * multiplier`.
    Scramble { multiplier: u32 },
}

/// Assigns `count` numbers using the thread-local RNG for scramble mode.
pub fn assign_numbers(count: usize, mode: NumberingMode) -> Result<Vec<u64>, NumberingError> {
    assign_numbers_with_rng(count, mode, &mut rand::thread_rng())
}

/// Assigns `count` numbers, drawing scramble values from `rng`.
///
/// # Errors
///
/// Fails when a sequential run would count past `u64::MAX`.
pub fn assign_numbers_with_rng<R: Rng + ?Sized>(
    count: usize,
    mode: NumberingMode,
    rng: &mut R,
) -> Result<Vec<u64>, NumberingError> {
    match mode {
        NumberingMode::Sequential { start } => (0..count as u64)
            .map(|i| start.checked_add(i))
            .collect::<Option<Vec<u64>>>()
            .ok_or(NumberingError::SequenceOverflow { start, count }),
        NumberingMode::Scramble { multiplier } => {
            let mut limit = count.saturating_mul(multiplier as usize);
            if limit < count {
                warn!(
                    count,
                    multiplier, "scramble range is smaller than file count, falling back to a permutation"
                );
                limit = count;
            }
            Ok(index::sample(rng, limit, count)
                .into_iter()
                .map(|i| i as u64 + 1)
                .collect())
        }
    }
}

/// Renders `number`, zero-padded to `width` digits when `width > 0`.
pub fn format_number(number: u64, width: usize) -> String {
    if width > 0 {
        format!("{number:0width$}")
    } else {
        number.to_string()
    }
}
