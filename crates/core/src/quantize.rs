//! Gain, clamping and float-to-int16 narrowing.

use crate::constants::{NEGATIVE_SCALE, POSITIVE_SCALE};

/// Converts one sample to int16.
///
/// The sample is scaled by `gain`, clamped to [-1, 1], then scaled asymmetrically
/// (32768 below zero, 32767 otherwise) and truncated toward zero. NaN maps to 0.
#[inline]
pub fn quantize_sample(sample: f32, gain: f32) -> i16 {
    let s = (f64::from(sample) * f64::from(gain)).clamp(-1.0, 1.0);
    let scaled = if s < 0.0 {
        s * NEGATIVE_SCALE
    } else {
        s * POSITIVE_SCALE
    };
    // Float-to-int `as` truncates toward zero and saturates; NaN becomes 0
    scaled as i16
}

/// Quantizes `input` into `output`, which must be the same length.
pub fn quantize_into(input: &[f32], gain: f32, output: &mut [i16]) {
    debug_assert_eq!(input.len(), output.len());
    for (out, &sample) in output.iter_mut().zip(input) {
        *out = quantize_sample(sample, gain);
    }
}

/// Allocating convenience wrapper around [`quantize_into`].
pub fn quantize(input: &[f32], gain: f32) -> Vec<i16> {
    let mut output = vec![0i16; input.len()];
    quantize_into(input, gain, &mut output);
    output
}
