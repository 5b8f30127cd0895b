use crate::error::EscrowError;

/// Upper bound on the number of parts an order may be split into. Keeps
/// index arithmetic well inside u128 even at yocto scale.
pub const MAX_PARTS: u64 = 1024;

/// Share unlocked by secret `index` of an order split into `parts` parts.
/// The final secret (`index == parts`) absorbs the rounding dust.
pub fn fill_amount(index: u64, total: u128, parts: u64) -> u128 {
    let share = total / parts as u128;
    if index < parts {
        share
    } else {
        share + total % parts as u128
    }
}

/// The secret index a fill of `fill` must consume, given `filled` already
/// drained out of `total` across `parts` parts. Fills consume indices
/// 1..=parts monotonically; a fill that exactly exhausts the remainder
/// lands on `parts` by construction, which is what entitles the last
/// secret to the dust.
pub fn expected_fill_index(
    total: u128,
    filled: u128,
    fill: u128,
    parts: u64,
) -> Result<u64, EscrowError> {
    if fill == 0 || fill > total - filled {
        return Err(EscrowError::InvalidPartialFill);
    }
    let index = mul_div(filled + fill - 1, parts as u128, total) + 1;
    Ok(index as u64)
}

/// Safety-deposit slice matching a fill: `deposit · fill / total`.
pub fn deposit_portion(deposit: u128, fill: u128, total: u128) -> u128 {
    mul_div(deposit, fill, total)
}

/// `a · b / denom` over the full 256-bit intermediate product. Yocto-scale
/// balances overflow u128 when multiplied, so the product is carried in
/// two limbs and divided bit-by-bit. Requires `denom > 0` and a quotient
/// that fits u128 (always true here: callers pass `b <= denom`).
pub fn mul_div(a: u128, b: u128, denom: u128) -> u128 {
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return lo / denom;
    }
    div_wide(hi, lo, denom)
}

fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1u128 << 64) - 1;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (mid << 64) | (ll & MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divides the 256-bit value `(hi, lo)` by `denom`; `hi < denom` must hold
/// so the quotient fits u128.
fn div_wide(hi: u128, lo: u128, denom: u128) -> u128 {
    debug_assert!(hi < denom);
    let mut rem = hi;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        // rem < 2*denom before reduction, so one subtraction suffices;
        // carry marks the 2^128 overflow of the shift.
        if carry == 1 || rem >= denom {
            rem = rem.wrapping_sub(denom);
            quotient |= 1 << bit;
        }
    }
    quotient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_split_evenly_with_dust_on_the_last_secret() {
        let total = 1_000_000_000u128;
        assert_eq!(fill_amount(1, total, 4), 250_000_000);
        assert_eq!(fill_amount(3, total, 4), 250_000_000);
        assert_eq!(fill_amount(4, total, 4), 250_000_000);

        let uneven = 1_000_000_003u128;
        assert_eq!(fill_amount(1, uneven, 4), 250_000_000);
        assert_eq!(fill_amount(4, uneven, 4), 250_000_003);

        // every split conserves: N equal parts plus dust equals total
        let parts = 7u64;
        let sum: u128 =
            (1..parts).map(|k| fill_amount(k, uneven, parts)).sum::<u128>()
                + fill_amount(parts, uneven, parts);
        assert_eq!(sum, uneven);
    }

    #[test]
    fn quarter_fills_consume_consecutive_indices() {
        // 1B split in 4: quarter fills consume indices 1 and 2, the
        // closing half-fill must use the final secret.
        let total = 1_000_000_000u128;
        assert_eq!(expected_fill_index(total, 0, 250_000_000, 4), Ok(1));
        assert_eq!(
            expected_fill_index(total, 250_000_000, 250_000_000, 4),
            Ok(2)
        );
        assert_eq!(
            expected_fill_index(total, 500_000_000, 500_000_000, 4),
            Ok(4)
        );
    }

    #[test]
    fn completing_fill_always_lands_on_the_final_index() {
        let total = 999_999_937u128; // prime, nothing divides evenly
        for parts in [1u64, 2, 3, 4, 10, 1024] {
            assert_eq!(
                expected_fill_index(total, 0, total, parts),
                Ok(parts),
                "parts={parts}"
            );
        }
        // partial progress, then exact exhaustion
        assert_eq!(expected_fill_index(1000, 400, 600, 5), Ok(5));
    }

    #[test]
    fn multi_part_fill_skips_indices_monotonically() {
        let total = 1_000_000_000u128;
        // one quarter then a half: the half covers parts 2..3
        assert_eq!(
            expected_fill_index(total, 250_000_000, 500_000_000, 4),
            Ok(3)
        );
        // remaining quarter exhausts, so it must take index 4
        assert_eq!(
            expected_fill_index(total, 750_000_000, 250_000_000, 4),
            Ok(4)
        );
    }

    #[test]
    fn rejects_zero_and_overdraw_fills() {
        assert_eq!(
            expected_fill_index(1000, 0, 0, 4),
            Err(EscrowError::InvalidPartialFill)
        );
        assert_eq!(
            expected_fill_index(1000, 900, 200, 4),
            Err(EscrowError::InvalidPartialFill)
        );
    }

    #[test]
    fn deposit_portion_is_proportional() {
        assert_eq!(deposit_portion(100_000_000, 250_000_000, 1_000_000_000), 25_000_000);
        assert_eq!(deposit_portion(100, 1, 3), 33);
        assert_eq!(deposit_portion(0, 10, 100), 0);
    }

    #[test]
    fn mul_div_survives_yocto_scale() {
        // 10^33 yocto (a billion NEAR) against itself
        let big = 1_000_000_000_000_000_000_000_000_000_000_000u128;
        assert_eq!(mul_div(big, big, big), big);
        assert_eq!(mul_div(big, big / 2, big), big / 2);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), u128::MAX);
        assert_eq!(mul_div(u128::MAX, 1, u128::MAX), 1);
        assert_eq!(mul_div(7, 13, 91), 1);
    }

    #[test]
    fn mul_div_matches_narrow_arithmetic() {
        for a in [0u128, 1, 17, 1 << 40, (1 << 90) + 3] {
            for b in [1u128, 5, 1 << 30] {
                for d in [1u128, 2, 1_000_003] {
                    if a.checked_mul(b).is_some() {
                        assert_eq!(mul_div(a, b, d), a * b / d, "a={a} b={b} d={d}");
                    }
                }
            }
        }
    }
}
