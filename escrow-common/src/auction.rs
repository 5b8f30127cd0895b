use crate::fill::mul_div;

/// Dutch-auction taking amount at `now_ms`. The curve starts at
/// `taking_start`, decreases linearly over `duration` seconds from
/// `start_ms`, and floors at `taking_end` (the maker's minimum). Equal
/// start and end degrade to a constant price. Requires
/// `taking_start >= taking_end`, validated at wallet creation.
pub fn current_taking_amount(
    start_ms: u64,
    duration: u32,
    taking_start: u128,
    taking_end: u128,
    now_ms: u64,
) -> u128 {
    let end_ms = start_ms + duration as u64 * 1000;
    let t = now_ms.clamp(start_ms, end_ms);
    if end_ms == start_ms {
        return taking_end;
    }
    // taking_end + (taking_start - taking_end) * (end - t) / (end - start),
    // the linear interpolation rearranged to stay subtraction-first.
    taking_end
        + mul_div(
            taking_start - taking_end,
            (end_ms - t) as u128,
            (end_ms - start_ms) as u128,
        )
}

/// Curve value pro-rated for a partial drain of `amount` out of
/// `making_amount`. A resolver's offer below this is refused.
pub fn required_taking_amount(
    start_ms: u64,
    duration: u32,
    taking_start: u128,
    taking_end: u128,
    making_amount: u128,
    amount: u128,
    now_ms: u64,
) -> u128 {
    let full = current_taking_amount(start_ms, duration, taking_start, taking_end, now_ms);
    mul_div(full, amount, making_amount)
}
