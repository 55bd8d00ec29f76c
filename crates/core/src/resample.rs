//! Per-chunk resampling from the capture rate to the target rate.
//!
//! Works on one whole input chunk at a time, so no state carries across chunks.
//! The strategy is picked in priority order: identity, integer box-filter decimation,
//! then linear interpolation for everything else (upsampling included).

/// How an input chunk is mapped onto an output chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMode {
    Empty,
    Identity,
    /// Average each group of `factor` consecutive input samples.
    Decimate { factor: usize },
    Linear,
}

impl ResampleMode {
    pub fn select(in_len: usize, out_len: usize) -> Self {
        if out_len == 0 {
            Self::Empty
        } else if in_len == out_len {
            Self::Identity
        } else if in_len % out_len == 0 && in_len / out_len >= 2 {
            Self::Decimate {
                factor: in_len / out_len,
            }
        } else {
            Self::Linear
        }
    }
}

/// Resamples `input` so that it fills `output` exactly.
///
/// Arithmetic runs in f64 and is narrowed to f32 on store.
pub fn resample_into(input: &[f32], output: &mut [f32]) {
    match ResampleMode::select(input.len(), output.len()) {
        ResampleMode::Empty => {}
        ResampleMode::Identity => output.copy_from_slice(input),
        ResampleMode::Decimate { factor } => decimate(input, output, factor),
        ResampleMode::Linear => interpolate(input, output),
    }
}

/// Allocating convenience wrapper around [`resample_into`].
pub fn resample(input: &[f32], out_len: usize) -> Vec<f32> {
    let mut output = vec![0.0; out_len];
    resample_into(input, &mut output);
    output
}

fn decimate(input: &[f32], output: &mut [f32], factor: usize) {
    for (out, group) in output.iter_mut().zip(input.chunks_exact(factor)) {
        let sum: f64 = group.iter().map(|&s| f64::from(s)).sum();
        *out = (sum / factor as f64) as f32;
    }
}

fn interpolate(input: &[f32], output: &mut [f32]) {
    let out_len = output.len();
    if input.is_empty() {
        output.fill(0.0);
        return;
    }
    // Only reachable when called directly; `select` sends out = 1 to Identity or Decimate
    if out_len == 1 {
        output[0] = input[0];
        return;
    }

    let last = input.len() - 1;
    let ratio = last as f64 / (out_len - 1) as f64;
    for (i, out) in output.iter_mut().enumerate() {
        let pos = i as f64 * ratio;
        let i0 = (pos.floor() as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let frac = pos - i0 as f64;
        *out = (f64::from(input[i0]) * (1.0 - frac) + f64::from(input[i1]) * frac) as f32;
    }
}
