//! Channel frequency class (CFC) low-pass filtering.
//!
//! Second-order Butterworth-type IIR filter derived with the bilinear
//! transform, run forward and then backward over the samples so the phase
//! shift cancels. Two variants are provided:
//!
//! * [`FilterMethod::SaeJ211`] filters the raw samples, seeding the
//!   recursion with the first two samples of each pass.
//! * [`FilterMethod::Iso6487Padded`] extends both ends with a point-mirrored
//!   ramp before filtering and seeds each pass with a 10-sample mean, which
//!   keeps the edges compliant with the standard's corridors.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Selects how [`cfc_filter`] treats the ends of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMethod {
    SaeJ211,
    #[default]
    Iso6487Padded,
}

/// Filter classes ordered from least to most filtered.
pub const FILTER_CLASS_PRECEDENCE: &str = "0XAEPBF2CG3DHQLVS";

/// Cut-off frequency (CFC value, Hz) of a filter class letter.
/// `Ok(None)` means "no filtering" (class `0`).
pub fn cfc_for_class(filter_class: char) -> Result<Option<f64>> {
    match filter_class {
        '0' => Ok(None),
        'A' => Ok(Some(1000.0)),
        'B' => Ok(Some(600.0)),
        'C' => Ok(Some(180.0)),
        'D' => Ok(Some(60.0)),
        other => Err(Error::InvalidParameter(format!(
            "filter class '{other}' has no CFC value"
        ))),
    }
}

/// Filter class letter for a CFC value; non-standard values map to `S`.
pub fn class_for_cfc(cfc: f64) -> char {
    if cfc.is_infinite() {
        return '0';
    }
    match cfc {
        c if c == 1000.0 => 'A',
        c if c == 600.0 => 'B',
        c if c == 180.0 => 'C',
        c if c == 60.0 => 'D',
        _ => 'S',
    }
}

/// Rank of a filter class in [`FILTER_CLASS_PRECEDENCE`]; unknown classes sort last.
pub fn filter_class_rank(filter_class: char) -> usize {
    FILTER_CLASS_PRECEDENCE
        .find(filter_class)
        .unwrap_or(FILTER_CLASS_PRECEDENCE.len())
}

// ---------------------------------------------------------------------------
// Coefficients
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    a0: f64,
    a1: f64,
    a2: f64,
    b1: f64,
    b2: f64,
}

impl Coefficients {
    fn new(cfc: f64, sample_interval: f64) -> Result<Self> {
        if !(cfc > 0.0 && cfc.is_finite()) {
            return Err(Error::InvalidParameter(format!("CFC must be positive, got {cfc}")));
        }
        if !(sample_interval > 0.0 && sample_interval.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "sample interval must be positive, got {sample_interval}"
            )));
        }
        let wd = 2.0 * std::f64::consts::PI * cfc / 0.6 * 1.25;
        let half_angle = wd * sample_interval / 2.0;
        if half_angle >= std::f64::consts::FRAC_PI_2 {
            return Err(Error::InvalidParameter(format!(
                "CFC {cfc} too high for sample interval {sample_interval} s"
            )));
        }
        let wa = half_angle.tan();
        let sqrt2 = std::f64::consts::SQRT_2;
        let denom = 1.0 + wa * wa + sqrt2 * wa;

        let a0 = wa * wa / denom;
        Ok(Coefficients {
            a0,
            a1: 2.0 * a0,
            a2: a0,
            b1: -2.0 * (wa * wa - 1.0) / denom,
            b2: (-1.0 + sqrt2 * wa - wa * wa) / denom,
        })
    }

    #[inline]
    fn step(&self, x0: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
        self.a0 * x0 + self.a1 * x1 + self.a2 * x2 + self.b1 * y1 + self.b2 * y2
    }

    /// One forward pass; `seed` gives the first two outputs.
    fn forward(&self, input: &[f64], seed: [f64; 2]) -> Vec<f64> {
        let mut output = input.to_vec();
        output[0] = seed[0];
        output[1] = seed[1];
        for i in 2..input.len() {
            output[i] = self.step(input[i], input[i - 1], input[i - 2], output[i - 1], output[i - 2]);
        }
        output
    }

    /// One backward pass; `seed` gives the last two outputs.
    fn backward(&self, input: &[f64], seed: [f64; 2]) -> Vec<f64> {
        let n = input.len();
        let mut output = input.to_vec();
        output[n - 1] = seed[0];
        output[n - 2] = seed[1];
        for i in (0..n - 2).rev() {
            output[i] = self.step(input[i], input[i + 1], input[i + 2], output[i + 1], output[i + 2]);
        }
        output
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Zero-phase low-pass filter of `values` sampled every `sample_interval` seconds.
pub fn cfc_filter(values: &[f64], cfc: f64, sample_interval: f64, method: FilterMethod) -> Result<Vec<f64>> {
    let coefficients = Coefficients::new(cfc, sample_interval)?;
    if values.len() < 3 {
        return Ok(values.to_vec());
    }
    Ok(match method {
        FilterMethod::SaeJ211 => sae_j211(&coefficients, values),
        FilterMethod::Iso6487Padded => padded(&coefficients, values),
    })
}

fn sae_j211(coefficients: &Coefficients, values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let forward = coefficients.forward(values, [values[0], values[1]]);
    coefficients.backward(&forward, [forward[n - 1], forward[n - 2]])
}

fn padded(coefficients: &Coefficients, values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let pad = (n / 100).max(100).min(n - 1);

    let first = values[0];
    let last = values[n - 1];
    let mut extended = Vec::with_capacity(n + 2 * pad);
    extended.extend((1..=pad).rev().map(|k| 2.0 * first - values[k]));
    extended.extend_from_slice(values);
    extended.extend((1..=pad).map(|k| 2.0 * last - values[n - 1 - k]));

    let start_mean = mean(&extended[..10.min(extended.len())]);
    let forward = coefficients.forward(&extended, [start_mean, start_mean]);

    let end_mean = mean(&forward[forward.len().saturating_sub(10)..]);
    let backward = coefficients.backward(&forward, [end_mean, end_mean]);

    backward[pad..pad + n].to_vec()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, dt: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 * dt).sin())
            .collect()
    }

    #[test]
    fn test_class_mapping() {
        assert_eq!(cfc_for_class('A').unwrap(), Some(1000.0));
        assert_eq!(cfc_for_class('D').unwrap(), Some(60.0));
        assert_eq!(cfc_for_class('0').unwrap(), None);
        assert!(cfc_for_class('Q').is_err());
        assert_eq!(class_for_cfc(180.0), 'C');
        assert_eq!(class_for_cfc(250.0), 'S');
        assert_eq!(class_for_cfc(f64::INFINITY), '0');
    }

    #[test]
    fn test_dc_passes() {
        let dc = vec![3.0; 2000];
        for method in [FilterMethod::SaeJ211, FilterMethod::Iso6487Padded] {
            let filtered = cfc_filter(&dc, 60.0, 1e-4, method).unwrap();
            assert!(filtered.iter().all(|v| (v - 3.0).abs() < 1e-9), "{method:?}");
        }
    }

    #[test]
    fn test_high_frequency_attenuated() {
        let dt = 1e-4;
        let signal = sine(2000.0, dt, 4000);
        let filtered = cfc_filter(&signal, 60.0, dt, FilterMethod::Iso6487Padded).unwrap();
        let peak = filtered[500..3500].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.01, "peak {peak}");
    }

    #[test]
    fn test_low_frequency_passes_without_phase_shift() {
        let dt = 1e-4;
        let signal = sine(10.0, dt, 4000);
        let filtered = cfc_filter(&signal, 1000.0, dt, FilterMethod::Iso6487Padded).unwrap();
        for i in (500..3500).step_by(250) {
            assert!((filtered[i] - signal[i]).abs() < 1e-3, "sample {i}");
        }
    }

    #[test]
    fn test_padded_edges_follow_ramp() {
        let dt = 1e-4;
        let ramp: Vec<f64> = (0..1000).map(|i| i as f64 * 0.01).collect();
        let filtered = cfc_filter(&ramp, 180.0, dt, FilterMethod::Iso6487Padded).unwrap();
        assert!((filtered[0] - ramp[0]).abs() < 0.05);
        assert!((filtered[999] - ramp[999]).abs() < 0.05);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(cfc_filter(&[1.0, 2.0, 3.0], -1.0, 1e-4, FilterMethod::SaeJ211).is_err());
        assert!(cfc_filter(&[1.0, 2.0, 3.0], 60.0, 0.0, FilterMethod::SaeJ211).is_err());
        assert!(cfc_filter(&[1.0, 2.0, 3.0], 1000.0, 1e-2, FilterMethod::SaeJ211).is_err());
    }

    #[test]
    fn test_precedence() {
        assert!(filter_class_rank('0') < filter_class_rank('A'));
        assert!(filter_class_rank('A') < filter_class_rank('D'));
        assert_eq!(filter_class_rank('?'), FILTER_CLASS_PRECEDENCE.len());
    }
}
