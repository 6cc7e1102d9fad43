// Console LED Trigger - Millisecond clock helpers
//
// Timestamps are `u32` milliseconds since boot and wrap after ~49 days, so all
// comparisons go through `wrapping_sub`.

/// `true` once at least `duration_ms` has passed between `start` and `now`.
pub fn has_elapsed(start: u32, now: u32, duration_ms: u32) -> bool {
    now.wrapping_sub(start) >= duration_ms
}

/// Milliseconds from `start` to `now`.
pub fn elapsed(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}
