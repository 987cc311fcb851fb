// Fundamental-frequency estimation for one short frame of mono audio.
//
// Time-domain autocorrelation: trim the low-amplitude edges, correlate the
// remaining sub-frame with itself at every lag, skip past the zero-lag peak
// (the first lag where the correlation stops falling), and take the
// strongest remaining lag as the period. The estimate is
// `sample_rate / period`.
//
// The correlation is unnormalized, so longer lags sum fewer products and the
// first true period wins over its multiples. Cost is O(n^2) in the frame
// length, which is fine for 2048-sample windows.
//
// Never fails: frames that are too quiet, too short or aperiodic come back as
// `None` (unvoiced). Used by segment.rs once per voiced window.

use crate::config::AnalysisConfig;

/// Root-mean-square amplitude of a frame. Zero for an empty frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&x| x as f64 * x as f64).sum();
    (sum / frame.len() as f64).sqrt() as f32
}

/// Estimate the fundamental frequency of `frame` in Hz using the default
/// thresholds. `None` means unvoiced.
pub fn estimate(frame: &[f32], sample_rate: u32) -> Option<f64> {
    estimate_with(frame, sample_rate, &AnalysisConfig::default())
}

/// Estimate the fundamental frequency with thresholds from `config`.
pub fn estimate_with(frame: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Option<f64> {
    if sample_rate == 0 || rms(frame) < config.voicing_rms {
        return None;
    }

    let body = trim_edges(frame, config.trim_amplitude);
    if body.len() < 2 {
        return None;
    }

    let corr = autocorrelate(body);
    let period = strongest_period(&corr)?;
    Some(sample_rate as f64 / period as f64)
}

/// Cut the frame down to the span between the first quiet sample from the
/// start and the first quiet sample from the end. A frame with no quiet
/// sample is returned whole.
fn trim_edges(frame: &[f32], threshold: f32) -> &[f32] {
    let len = frame.len();
    let start = frame
        .iter()
        .position(|x| x.abs() < threshold)
        .unwrap_or(0);
    let end = frame
        .iter()
        .rposition(|x| x.abs() < threshold)
        .map_or(len, |i| i + 1);
    if start >= end {
        return &frame[0..0];
    }
    &frame[start..end]
}

/// `c[lag] = sum_j x[j] * x[j + lag]` for every lag in `0..n`.
fn autocorrelate(x: &[f32]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|lag| {
            x[..n - lag]
                .iter()
                .zip(&x[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        })
        .collect()
}

/// Lag of the highest correlation after the initial descent from lag 0, or
/// `None` if the curve never turns upward or the peak is not positive.
fn strongest_period(corr: &[f64]) -> Option<usize> {
    let mut d = 0;
    while d + 1 < corr.len() && corr[d] > corr[d + 1] {
        d += 1;
    }
    if d == 0 || d + 1 >= corr.len() {
        return None;
    }

    let (period, &peak) = corr[d..]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if peak <= 0.0 {
        return None;
    }
    Some(d + period)
}
