use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use log::warn;

use super::code::{Code, CodeField};
use super::filter::{cfc_filter, cfc_for_class, class_for_cfc, FilterMethod};
use super::info::{Info, MetadataValue};
use super::unit::Unit;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Channel – one time series with code, unit and metadata
// ---------------------------------------------------------------------------

/// A single measured or derived time series.
///
/// Time (seconds) is strictly ascending; `values` has the same length.
/// Scalar results (HIC, BrIC, ...) are channels with one sample.
#[derive(Debug, Clone)]
pub struct Channel {
    pub code: Code,
    time: Vec<f64>,
    values: Vec<f64>,
    pub unit: Unit,
    pub info: Info,
}

impl Channel {
    /// Build a channel, checking the time grid. A missing unit defaults to
    /// the code's physical dimension (or dimensionless, with a warning).
    pub fn new(code: Code, time: Vec<f64>, values: Vec<f64>, unit: Option<Unit>) -> Result<Self> {
        if time.len() != values.len() {
            return Err(Error::InvalidParameter(format!(
                "{code}: {} time stamps but {} values",
                time.len(),
                values.len()
            )));
        }
        if let Some(i) = time.windows(2).position(|w| !(w[0] < w[1])) {
            return Err(Error::InvalidParameter(format!(
                "{code}: time not strictly ascending at sample {}",
                i + 1
            )));
        }
        if !code.is_valid() {
            warn!("'{code}' not a valid channel code");
        }
        let unit = match unit {
            Some(unit) => {
                if let Some(expected) = code.default_unit() {
                    if !unit.is_same_physical_type(&expected) {
                        warn!(
                            "{code}: unit '{unit}' is {} but dimension expects {}",
                            unit.physical_type(),
                            expected.physical_type()
                        );
                    }
                }
                unit
            }
            None => code.default_unit().unwrap_or_else(|| {
                warn!("{code}: no unit given and no default unit known. Set unit to 1.");
                Unit::dimensionless()
            }),
        };
        Ok(Channel {
            code,
            time,
            values,
            unit,
            info: Info::new(),
        })
    }

    /// Single-sample channel holding a calculated value.
    pub fn scalar(code: Code, time: f64, value: f64, unit: Unit) -> Self {
        Channel {
            code,
            time: vec![time],
            values: vec![value],
            unit,
            info: Info::new(),
        }
    }

    /// Internal constructor for grids already known to be valid.
    pub(crate) fn from_parts(code: Code, time: Vec<f64>, values: Vec<f64>, unit: Unit, info: Info) -> Self {
        debug_assert_eq!(time.len(), values.len());
        Channel {
            code,
            time,
            values,
            unit,
            info,
        }
    }

    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// (time, value) pairs in time order.
    pub fn data(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.values.len() == 1
    }

    // -- Data access --

    /// Raw values, optionally converted into `unit`.
    pub fn get_data(&self, unit: Option<&Unit>) -> Result<Vec<f64>> {
        match unit {
            Some(unit) => self.unit.convert(&self.values, unit),
            None => Ok(self.values.clone()),
        }
    }

    /// Values linearly interpolated at `t`; 0 outside the recorded range.
    pub fn get_data_at(&self, t: &[f64], unit: Option<&Unit>) -> Result<Vec<f64>> {
        let factor = match unit {
            Some(unit) => self.unit.conversion_factor(unit)?,
            None => 1.0,
        };
        Ok(t.iter().map(|&t| self.value_at(t) * factor).collect())
    }

    /// Interpolated value at a single time; 0 outside the recorded range.
    pub fn value_at(&self, t: f64) -> f64 {
        interpolate(&self.time, &self.values, t)
    }

    /// Sample interval from the time grid, or the `Sampling interval` info entry.
    pub fn sampling_interval(&self) -> Result<f64> {
        if self.time.len() >= 2 {
            let n = self.time.len();
            return Ok((self.time[n - 1] - self.time[0]) / (n - 1) as f64);
        }
        self.info
            .get_f64(&["Sampling interval"])
            .ok_or_else(|| Error::MissingSamplingInterval {
                code: self.code.to_string(),
            })
    }

    /// Time and value of the sample with the largest absolute value.
    pub fn peak_abs(&self) -> Option<(f64, f64)> {
        self.data()
            .fold(None, |best: Option<(f64, f64)>, (t, v)| match best {
                Some((_, b)) if b.abs() >= v.abs() => best,
                _ => Some((t, v)),
            })
    }

    pub fn peak_max(&self) -> Option<(f64, f64)> {
        self.data().fold(None, |best: Option<(f64, f64)>, (t, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((t, v)),
        })
    }

    pub fn peak_min(&self) -> Option<(f64, f64)> {
        self.data().fold(None, |best: Option<(f64, f64)>, (t, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((t, v)),
        })
    }

    pub fn get_info(&self, labels: &[&str]) -> Option<&MetadataValue> {
        self.info.get(labels)
    }

    // -- In-place setters --

    pub fn set_code(&mut self, code: Code) -> &mut Self {
        if !code.is_valid() {
            warn!("'{code}' not a valid channel code");
        }
        self.code = code;
        self
    }

    /// Set the unit without touching the values; see [`Channel::convert_unit`].
    pub fn set_unit(&mut self, unit: Unit) -> &mut Self {
        self.unit = unit;
        self
    }

    /// Convert the values into `unit`.
    pub fn convert_unit(&mut self, unit: &Unit) -> Result<&mut Self> {
        self.values = self.unit.convert(&self.values, unit)?;
        self.unit = unit.clone();
        Ok(self)
    }

    /// Copy of this channel with values converted into `unit`.
    pub fn converted(&self, unit: &Unit) -> Result<Channel> {
        let mut channel = self.clone();
        channel.convert_unit(unit)?;
        Ok(channel)
    }

    /// Add entries; existing labels get `"; value"` appended unless `replace`.
    pub fn set_info(&mut self, new_info: &Info, replace: bool) -> &mut Self {
        for (label, value) in new_info.iter() {
            if replace {
                self.info.insert(label, value.clone());
            } else {
                self.info.append_to(label, value.clone());
            }
        }
        self
    }

    // -- Signal processing --

    /// Low-pass filter to a filter class (`0` returns an identical copy).
    pub fn cfc(&self, filter_class: char, method: FilterMethod) -> Result<Channel> {
        match cfc_for_class(filter_class)? {
            None => Ok(self.clone()),
            Some(cfc) => self.filter_with(cfc, filter_class, method),
        }
    }

    /// Low-pass filter to an explicit CFC value in Hz.
    pub fn cfc_value(&self, cfc: f64, method: FilterMethod) -> Result<Channel> {
        if cfc.is_infinite() {
            return Ok(self.clone());
        }
        self.filter_with(cfc, class_for_cfc(cfc), method)
    }

    fn filter_with(&self, cfc: f64, filter_class: char, method: FilterMethod) -> Result<Channel> {
        let sample_interval = self.sampling_interval()?;
        let values = cfc_filter(&self.values, cfc, sample_interval, method)?;
        let code = self
            .code
            .with(CodeField::FilterClass, filter_class.encode_utf8(&mut [0; 4]))?;
        let mut info = self.info.clone();
        info.insert("Channel frequency class", cfc);
        Ok(Channel::from_parts(code, self.time.clone(), values, self.unit.clone(), info))
    }

    /// Numerical derivative (second-order central differences inside,
    /// one-sided at the ends) on the possibly non-uniform time grid.
    pub fn differentiate(&self) -> Result<Channel> {
        let code = self.code.differentiate()?;
        if self.len() < 2 {
            return Err(Error::Calculation(format!(
                "{}: at least two samples needed to differentiate",
                self.code
            )));
        }
        let values = gradient(&self.values, &self.time);
        let unit = &self.unit / &time_unit();
        let mut info = self.info.clone();
        info.insert("Dimension", code.physical_dimension());
        Ok(Channel::from_parts(code, self.time.clone(), values, unit, info))
    }

    /// Cumulative trapezoidal integral passing through `x0` at t = 0.
    pub fn integrate(&self, x0: f64) -> Result<Channel> {
        let code = self.code.integrate()?;
        let mut values = cumulative_trapezoid(&self.values, &self.time);
        let offset = interpolate(&self.time, &values, 0.0);
        for v in &mut values {
            *v = *v - offset + x0;
        }
        let unit = &self.unit * &time_unit();
        let mut info = self.info.clone();
        info.insert("Dimension", code.physical_dimension());
        Ok(Channel::from_parts(code, self.time.clone(), values, unit, info))
    }

    /// Elementwise power; the unit is raised as well.
    pub fn powf(&self, exponent: f64) -> Result<Channel> {
        let unit = self.unit.powf(exponent)?;
        let values = self.values.iter().map(|v| v.powf(exponent)).collect();
        let mut info = self.info.clone();
        info.append_to("Calculation History", format!("x^{exponent}"));
        Ok(Channel::from_parts(self.code.clone(), self.time.clone(), values, unit, info))
    }

    pub fn abs(&self) -> Channel {
        let mut info = self.info.clone();
        info.append_to("Calculation History", "abs(x)");
        self.map_values(f64::abs).with_info(info)
    }

    /// Same grid, code and unit with every value mapped through `f`.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Channel {
        let values = self.values.iter().map(|&v| f(v)).collect();
        Channel::from_parts(
            self.code.clone(),
            self.time.clone(),
            values,
            self.unit.clone(),
            self.info.clone(),
        )
    }

    /// Combine with another channel on the intersection of both time grids.
    fn combine(&self, other: &Channel, unit: Unit, op: &str, f: impl Fn(f64, f64) -> f64) -> Channel {
        let time = time_intersect(&[self, other]);
        let lhs: Vec<f64> = time.iter().map(|&t| self.value_at(t)).collect();
        let rhs: Vec<f64> = time.iter().map(|&t| other.value_at(t)).collect();
        let values = lhs.iter().zip(&rhs).map(|(&a, &b)| f(a, b)).collect();
        let mut info = self.info.clone();
        info.append_to("Calculation History", format!("x {op} {}", other.code));
        Channel::from_parts(self.code.clone(), time, values, unit, info)
    }

    /// `other` expressed in this channel's unit for `+`/`-`. A mismatch of
    /// physical type is logged and the raw numbers are used.
    fn aligned_for_sum<'a>(&self, other: &'a Channel, op: &str) -> std::borrow::Cow<'a, Channel> {
        if self.unit == other.unit {
            return std::borrow::Cow::Borrowed(other);
        }
        match other.converted(&self.unit) {
            Ok(converted) => std::borrow::Cow::Owned(converted),
            Err(_) => {
                warn!(
                    "'{}' {op} '{}': unit mismatch ({} vs {}), combining raw values",
                    self.code, other.code, self.unit, other.unit
                );
                std::borrow::Cow::Borrowed(other)
            }
        }
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.time == other.time && self.values == other.values
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

fn time_unit() -> Unit {
    Unit::parse("s").unwrap_or_else(|_| Unit::dimensionless())
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

impl Add for &Channel {
    type Output = Channel;

    fn add(self, rhs: &Channel) -> Channel {
        let rhs = self.aligned_for_sum(rhs, "+");
        self.combine(&rhs, self.unit.clone(), "+", |a, b| a + b)
    }
}

impl Sub for &Channel {
    type Output = Channel;

    fn sub(self, rhs: &Channel) -> Channel {
        let rhs = self.aligned_for_sum(rhs, "-");
        self.combine(&rhs, self.unit.clone(), "-", |a, b| a - b)
    }
}

impl Mul for &Channel {
    type Output = Channel;

    fn mul(self, rhs: &Channel) -> Channel {
        self.combine(rhs, &self.unit * &rhs.unit, "*", |a, b| a * b)
    }
}

impl Div for &Channel {
    type Output = Channel;

    fn div(self, rhs: &Channel) -> Channel {
        self.combine(rhs, &self.unit / &rhs.unit, "/", |a, b| a / b)
    }
}

impl Add<f64> for &Channel {
    type Output = Channel;

    fn add(self, rhs: f64) -> Channel {
        self.map_values(|v| v + rhs)
    }
}

impl Sub<f64> for &Channel {
    type Output = Channel;

    fn sub(self, rhs: f64) -> Channel {
        self.map_values(|v| v - rhs)
    }
}

impl Mul<f64> for &Channel {
    type Output = Channel;

    fn mul(self, rhs: f64) -> Channel {
        self.map_values(|v| v * rhs)
    }
}

impl Div<f64> for &Channel {
    type Output = Channel;

    fn div(self, rhs: f64) -> Channel {
        self.map_values(|v| v / rhs)
    }
}

impl Neg for &Channel {
    type Output = Channel;

    fn neg(self) -> Channel {
        self.map_values(|v| -v)
    }
}

macro_rules! forward_owned_ops {
    ($($trait:ident $method:ident),*) => {$(
        impl $trait for Channel {
            type Output = Channel;
            fn $method(self, rhs: Channel) -> Channel {
                (&self).$method(&rhs)
            }
        }
        impl $trait<f64> for Channel {
            type Output = Channel;
            fn $method(self, rhs: f64) -> Channel {
                (&self).$method(rhs)
            }
        }
    )*};
}

forward_owned_ops!(Add add, Sub sub, Mul mul, Div div);

impl Neg for Channel {
    type Output = Channel;

    fn neg(self) -> Channel {
        -&self
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Sorted intersection of the channels' time grids.
pub fn time_intersect(channels: &[&Channel]) -> Vec<f64> {
    let Some((first, rest)) = channels.split_first() else {
        return Vec::new();
    };
    let mut time = first.time.clone();
    for channel in rest {
        let other = &channel.time;
        let mut j = 0;
        time.retain(|&t| {
            while j < other.len() && other[j] < t {
                j += 1;
            }
            j < other.len() && other[j] == t
        });
    }
    time
}

/// Linear interpolation with 0 outside `[time[0], time[n-1]]`.
pub(crate) fn interpolate(time: &[f64], values: &[f64], t: f64) -> f64 {
    let n = time.len();
    if n == 0 || t < time[0] || t > time[n - 1] || t.is_nan() {
        return 0.0;
    }
    let idx = time.partition_point(|&x| x <= t);
    if idx == 0 {
        return values[0];
    }
    let i = idx - 1;
    if i + 1 >= n || time[i] == t {
        return values[i];
    }
    let w = (t - time[i]) / (time[i + 1] - time[i]);
    values[i] + w * (values[i + 1] - values[i])
}

fn gradient(values: &[f64], time: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n];
    out[0] = (values[1] - values[0]) / (time[1] - time[0]);
    out[n - 1] = (values[n - 1] - values[n - 2]) / (time[n - 1] - time[n - 2]);
    for i in 1..n - 1 {
        let hl = time[i] - time[i - 1];
        let hr = time[i + 1] - time[i];
        out[i] = (hl * hl * values[i + 1] - hr * hr * values[i - 1] + (hr * hr - hl * hl) * values[i])
            / (hl * hr * (hl + hr));
    }
    out
}

pub(crate) fn cumulative_trapezoid(values: &[f64], time: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for i in 0..values.len() {
        if i > 0 {
            acc += 0.5 * (values[i] + values[i - 1]) * (time[i] - time[i - 1]);
        }
        out.push(acc);
    }
    out
}

// ---------------------------------------------------------------------------
// Sample channels
// ---------------------------------------------------------------------------

/// Shape of a generated sample channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Linear,
    Sine,
}

/// Create a synthetic channel: `num` samples on `[t_start, t_end]` with
/// values spanning `[y_min, y_max]`.
pub fn create_sample(
    code: Code,
    (t_start, t_end, num): (f64, f64, usize),
    (y_min, y_max): (f64, f64),
    mode: SampleMode,
    unit: Unit,
) -> Result<Channel> {
    if num < 2 || !(t_end > t_start) {
        return Err(Error::InvalidParameter(format!(
            "sample needs at least two points on an ascending range, got {num} on [{t_start}, {t_end}]"
        )));
    }
    let step = (t_end - t_start) / (num - 1) as f64;
    let time: Vec<f64> = (0..num).map(|i| t_start + i as f64 * step).collect();
    let values = (0..num)
        .map(|i| {
            let fraction = i as f64 / (num - 1) as f64;
            match mode {
                SampleMode::Linear => y_min + fraction * (y_max - y_min),
                SampleMode::Sine => {
                    (y_max - y_min).abs() / 2.0 * (2.0 * std::f64::consts::PI * fraction).sin()
                        + (y_min + y_max) / 2.0
                }
            }
        })
        .collect();
    let mut channel = Channel::new(code, time, values, Some(unit))?;
    channel.info.push("Data source", "Sample");
    Ok(channel)
}
