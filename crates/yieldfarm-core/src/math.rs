//! Exact integer arithmetic for proportional reward shares
//!
//! `reward × stake` routinely exceeds `u128` with 18-decimal amounts
//! (20 000 tokens × 100 tokens is ~2·10⁴²), so the product is carried in
//! 256 bits before dividing. No floating point anywhere.

use crate::error::{FarmError, Result};

const LOW_MASK: u128 = u64::MAX as u128;

/// `floor(a × b / denom)` with a 256-bit intermediate product.
///
/// Fails when `denom` is zero or the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, denom: u128) -> Result<u128> {
    if denom == 0 {
        return Err(FarmError::ArithmeticOverflow("division by zero"));
    }
    let (hi, lo) = widening_mul(a, b);
    div_wide(hi, lo, denom)
}

/// 128×128 → 256-bit product as `(hi, lo)`
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_lo, a_hi) = (a & LOW_MASK, a >> 64);
    let (b_lo, b_hi) = (b & LOW_MASK, b >> 64);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let (mid, mid_carry) = lh.overflowing_add(hl);
    let (lo, lo_carry) = ll.overflowing_add(mid << 64);

    let hi = hh
        + (mid >> 64)
        + if mid_carry { 1u128 << 64 } else { 0 }
        + u128::from(lo_carry);

    (hi, lo)
}

/// Binary long division of a 256-bit dividend by a 128-bit divisor
fn div_wide(hi: u128, lo: u128, divisor: u128) -> Result<u128> {
    if hi == 0 {
        return Ok(lo / divisor);
    }
    if hi >= divisor {
        return Err(FarmError::ArithmeticOverflow("quotient exceeds u128"));
    }

    // rem < divisor holds at the top of every iteration
    let mut rem = hi;
    let mut quotient: u128 = 0;

    for bit in (0..128u32).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quotient <<= 1;

        // with carry set the true remainder is rem + 2^128, always >= divisor
        if carry == 1 || rem >= divisor {
            rem = rem.wrapping_sub(divisor);
            quotient |= 1;
        }
    }

    Ok(quotient)
}
