//! Spending normalization.
//!
//! The API accepts fractional amounts but every persisted amount is an
//! integer. Rounding is half-to-even and is applied exactly once, right
//! before a value is written.

/// Round a submitted spending amount to the stored integer representation.
///
/// Ties round to the nearest even integer (`2.5 -> 2`, `3.5 -> 4`).
/// Non-finite input becomes `0`; values beyond the `i64` range saturate.
pub fn normalize_spending(amount: f64) -> i64 {
    if !amount.is_finite() {
        return 0;
    }
    // `as` saturates for out-of-range floats.
    amount.round_ties_even() as i64
}

/// Sum already-normalized amounts without overflowing.
pub fn total_spending<I>(amounts: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    amounts.into_iter().fold(0i64, |acc, v| acc.saturating_add(v))
}
