use log::debug;

use crate::data::channel::{cumulative_trapezoid, Channel};
use crate::data::code::CodeField;
use crate::data::info::Info;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Slack for comparing window widths built from float time grids. The window
/// bound itself is inclusive: `t2 - t1 <= Δ`.
const WINDOW_TOLERANCE: f64 = 1e-9;

/// Head Injury Criterion over windows of at most `max_window_ms` milliseconds.
///
/// `channel` is the head resultant acceleration; it is evaluated in g.
/// The result is a single-sample channel (`HICR`, fine location 2 = window
/// width) with the optimal window recorded as `.Start time` / `.End time`.
pub fn hic(channel: &Channel, max_window_ms: f64) -> Result<Channel> {
    if !(max_window_ms > 0.0 && max_window_ms < 100.0) {
        return Err(Error::InvalidParameter(format!(
            "HIC window must be between 0 and 100 ms, got {max_window_ms}"
        )));
    }
    if channel.len() < 2 {
        return Err(Error::Calculation(format!("{}: HIC needs at least two samples", channel.code)));
    }

    let max_window = max_window_ms * 1e-3;
    let time = channel.time();
    let accel = channel.get_data(Some(&Unit::standard_gravity()))?;
    let integral = cumulative_trapezoid(&accel, time);

    let best = if accel.iter().all(|&a| a >= 0.0) {
        widest_windows(time, &integral, max_window)
    } else {
        debug!("{}: negative samples, searching all HIC windows", channel.code);
        all_windows(time, &integral, max_window)
    };

    let (value, window) = match best {
        Some((value, t1, t2)) => (value, Some((t1, t2))),
        None => (0.0, None),
    };

    let code = channel.code.set(&[
        (CodeField::MainLocation, "HICR"),
        (CodeField::FineLocation1, "00"),
        (CodeField::FineLocation2, &format!("{:02.0}", max_window_ms)),
        (CodeField::PhysicalDimension, "00"),
        (CodeField::FilterClass, "X"),
    ])?;

    let mut info = Info::new();
    info.push("Data source", "Calculation")
        .push("Name of the channel", format!("HIC VALUE {max_window_ms:.0}"))
        .push("Number of samples", 1usize)
        .push(".Channel 001", channel.code.to_string())
        .push(".Start time", window.map(|w| w.0))
        .push(".End time", window.map(|w| w.1))
        .push(".Analysis start time", time[0])
        .push(".Analysis end time", time[time.len() - 1]);

    let t = window.map_or(time[0], |w| w.0);
    Ok(Channel::scalar(code, t, value, Unit::dimensionless()).with_info(info))
}

/// `(t2 - t1) * (mean acceleration)^2.5` for a window with a positive integral.
fn hic_value(t1: f64, t2: f64, integral: f64) -> Option<f64> {
    let width = t2 - t1;
    (width > 0.0 && integral >= 0.0).then(|| width * (integral / width).powf(2.5))
}

/// Index of the last sample reachable from `start` within `max_window`.
fn window_end(time: &[f64], start: usize, max_window: f64) -> usize {
    let limit = time[start] + max_window + WINDOW_TOLERANCE;
    time.partition_point(|&t| t <= limit).saturating_sub(1)
}

/// With non-negative data the integral only grows with the window, so only
/// the widest window per start time is a candidate.
fn widest_windows(time: &[f64], integral: &[f64], max_window: f64) -> Option<(f64, f64, f64)> {
    let mut best: Option<(f64, f64, f64)> = None;
    for i in 0..time.len() - 1 {
        let j = window_end(time, i, max_window);
        if j <= i {
            continue;
        }
        if let Some(value) = hic_value(time[i], time[j], integral[j] - integral[i]) {
            if best.map_or(true, |b| value > b.0) {
                best = Some((value, time[i], time[j]));
            }
        }
    }
    best
}

fn all_windows(time: &[f64], integral: &[f64], max_window: f64) -> Option<(f64, f64, f64)> {
    let mut best: Option<(f64, f64, f64)> = None;
    for i in 0..time.len() - 1 {
        let end = window_end(time, i, max_window);
        for j in i + 1..=end {
            if let Some(value) = hic_value(time[i], time[j], integral[j] - integral[i]) {
                if best.map_or(true, |b| value > b.0) {
                    best = Some((value, time[i], time[j]));
                }
            }
        }
    }
    best
}
