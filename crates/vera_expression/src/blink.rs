//! Deterministic, irregular blink generator
//!
//! Time is cut into 3 s windows. Each window gets a pseudo-random phase
//! offset from `sin(window * 12.345)`, and the eyes close for the last
//! 0.15 s of the shifted cycle. Same time in, same weight out.

const WINDOW_SECS: f64 = 3.0;
const CLOSED_AFTER: f64 = 2.85;
const PHASE_SEED: f64 = 12.345;
const PHASE_SPREAD: f64 = 0.5;

/// Blink weight at `time` seconds: 1.0 closed, 0.0 open.
pub fn blink_weight(time: f64) -> f32 {
    let window = (time / WINDOW_SECS).floor();
    let offset = (window * PHASE_SEED).sin() * PHASE_SPREAD;
    // `%` keeps the sign of the dividend, so the first window's negative
    // shift never reads as closed.
    let cycle = (time + offset) % WINDOW_SECS;
    if cycle > CLOSED_AFTER {
        1.0
    } else {
        0.0
    }
}
