//! Deterministic fixed-point arithmetic shared by the pool contracts.
//!
//! Values are `i128` integers scaled by [`SCALE`]. Both primitives truncate
//! toward zero, so any remainder a ratio drops stays with the pool instead of
//! being credited to an individual depositor.

#![no_std]

/// Fixed-point scaling factor (18 decimals).
pub const SCALE: i128 = 1_000_000_000_000_000_000;

const SCALE_U: u128 = SCALE as u128;
const SCALE_DIGITS: u32 = 18;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MathError {
    DivisionByZero,
    Overflow,
}

/// `a * b / SCALE`, truncated toward zero.
pub fn scaled_mul(a: i128, b: i128) -> Result<i128, MathError> {
    let (ua, ub) = (a.unsigned_abs(), b.unsigned_abs());

    // a = q * S + r  and  b = q2 * S + r2, so that no partial product needs
    // more than the result's own width.
    let (q, r) = (ua / SCALE_U, ua % SCALE_U);
    let (q2, r2) = (ub / SCALE_U, ub % SCALE_U);

    let magnitude = q
        .checked_mul(ub)
        .and_then(|hi| r.checked_mul(q2).and_then(|mid| hi.checked_add(mid)))
        .and_then(|acc| acc.checked_add(r * r2 / SCALE_U))
        .ok_or(MathError::Overflow)?;

    signed(magnitude, (a < 0) != (b < 0))
}

/// `a * SCALE / b`, truncated toward zero.
pub fn scaled_div(a: i128, b: i128) -> Result<i128, MathError> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    let (ua, ub) = (a.unsigned_abs(), b.unsigned_abs());

    let hi = (ua / ub).checked_mul(SCALE_U).ok_or(MathError::Overflow)?;

    // Long division of the remainder, one decimal digit of SCALE at a time.
    let mut rem = ua % ub;
    let mut lo: u128 = 0;
    for _ in 0..SCALE_DIGITS {
        rem = rem.checked_mul(10).ok_or(MathError::Overflow)?;
        lo = lo * 10 + rem / ub;
        rem %= ub;
    }

    let magnitude = hi.checked_add(lo).ok_or(MathError::Overflow)?;
    signed(magnitude, (a < 0) != (b < 0))
}

pub fn checked_add(a: i128, b: i128) -> Result<i128, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: i128, b: i128) -> Result<i128, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

fn signed(magnitude: u128, negative: bool) -> Result<i128, MathError> {
    let value = i128::try_from(magnitude).map_err(|_| MathError::Overflow)?;
    Ok(if negative { -value } else { value })
}
