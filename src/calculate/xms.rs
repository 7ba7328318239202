use crate::data::channel::Channel;
use crate::data::code::CodeField;
use crate::error::{Error, Result};

const WINDOW_TOLERANCE: f64 = 1e-9;

/// Variant of the "exceeded for at least x ms" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmsMethod {
    /// Single peak: highest level held without interruption for the duration.
    Single,
    /// Cumulative: highest level exceeded for the duration in total.
    Cumulative,
}

impl XmsMethod {
    pub fn letter(self) -> char {
        match self {
            XmsMethod::Single => 'S',
            XmsMethod::Cumulative => 'C',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'S' => Some(XmsMethod::Single),
            'C' => Some(XmsMethod::Cumulative),
            _ => None,
        }
    }
}

/// Highest value exceeded for at least `min_duration_ms` (e.g. the 3 ms
/// chest acceleration). The result code carries `<ms><method>` in fine
/// location 2 and filter class `X`.
pub fn xms(channel: &Channel, min_duration_ms: f64, method: XmsMethod) -> Result<Channel> {
    if !(min_duration_ms > 0.0 && min_duration_ms < 10.0) {
        return Err(Error::InvalidParameter(format!(
            "xms duration must be between 0 and 10 ms, got {min_duration_ms}"
        )));
    }
    if channel.is_empty() {
        return Err(Error::Calculation(format!("{}: no samples", channel.code)));
    }
    let duration = min_duration_ms * 1e-3;
    let time = channel.time();
    let values = channel.values();

    let (value, window) = match method {
        XmsMethod::Single => single_peak(time, values, duration),
        XmsMethod::Cumulative => cumulative(time, values, duration),
    };

    let code = channel.code.set(&[
        (CodeField::FineLocation2, &format!("{:.0}{}", min_duration_ms, method.letter())),
        (CodeField::FilterClass, "X"),
    ])?;
    let mut info = channel.info.clone();
    info.insert("Data source", "Calculation");
    info.push(".Analysis start time", time[0])
        .push(".Analysis end time", time[time.len() - 1]);
    if method == XmsMethod::Single {
        info.push(".Start time", window.map(|w| w.0))
            .push(".End time", window.map(|w| w.1));
    }
    let t = window.map_or(time[0], |w| w.0);
    Ok(Channel::scalar(code, t, value, channel.unit.clone()).with_info(info))
}

/// Maximum over windows of the window minimum; windows start at every
/// sample and end at the first sample at least `duration` later.
fn single_peak(time: &[f64], values: &[f64], duration: f64) -> (f64, Option<(f64, f64)>) {
    let mut best = 0.0;
    let mut window = None;
    for i in 0..time.len() {
        let end = time.partition_point(|&t| t < time[i] + duration - WINDOW_TOLERANCE);
        if end >= time.len() {
            break;
        }
        let level = values[i..=end].iter().copied().fold(f64::INFINITY, f64::min);
        if level > best {
            best = level;
            window = Some((time[i], time[end]));
        }
    }
    (best, window)
}

/// Highest level such that the intervals between adjacent samples both at
/// or above it add up to at least `duration`.
fn cumulative(time: &[f64], values: &[f64], duration: f64) -> (f64, Option<(f64, f64)>) {
    let mut intervals: Vec<(f64, usize)> = (0..values.len().saturating_sub(1))
        .map(|k| (values[k].min(values[k + 1]), k))
        .collect();
    intervals.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut total = 0.0;
    let mut level = None;
    for &(min, k) in &intervals {
        total += time[k + 1] - time[k];
        if total >= duration - WINDOW_TOLERANCE {
            level = Some(min);
            break;
        }
    }
    let Some(level) = level else {
        return (0.0, None);
    };

    let above = intervals.iter().filter(|(min, _)| *min >= level).map(|&(_, k)| k);
    let first = above.clone().min().unwrap_or(0);
    let last = above.max().unwrap_or(0);
    (level, Some((time[first], time[last + 1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::code::Code;

    fn chest(values: Vec<f64>) -> Channel {
        let time = (0..values.len()).map(|i| i as f64 * 1e-4).collect();
        Channel::new(Code::new("11CHST0000H3ACRA").unwrap(), time, values, None).unwrap()
    }

    /// 10 g baseline, 60 g plateau for 5 ms, single 80 g spike.
    fn plateau() -> Channel {
        let mut values = vec![10.0; 500];
        for v in &mut values[100..=150] {
            *v = 60.0;
        }
        values[300] = 80.0;
        chest(values)
    }

    #[test]
    fn test_single_peak() {
        let result = xms(&plateau(), 3.0, XmsMethod::Single).unwrap();
        assert_eq!(result.values(), &[60.0]);
        assert_eq!(result.code.as_str(), "11CHST003SH3ACRX");
        let start = result.get_info(&[".Start time"]).and_then(|v| v.as_f64()).unwrap();
        assert!((0.01..=0.012 + 1e-9).contains(&start));
    }

    #[test]
    fn test_cumulative_adds_separate_runs() {
        // two 2 ms runs at 50 g separated by a dip
        let mut values = vec![0.0; 300];
        let (head, tail) = values.split_at_mut(150);
        for v in head[50..=70].iter_mut().chain(tail[..=20].iter_mut()) {
            *v = 50.0;
        }
        let channel = chest(values);
        let cumulative = xms(&channel, 3.0, XmsMethod::Cumulative).unwrap();
        assert_eq!(cumulative.values(), &[50.0]);
        assert_eq!(cumulative.code.fine_location_2(), "3C");
        let single = xms(&channel, 3.0, XmsMethod::Single).unwrap();
        assert_eq!(single.values(), &[0.0]);
    }

    #[test]
    fn test_duration_range() {
        assert!(xms(&plateau(), 0.0, XmsMethod::Single).is_err());
        assert!(xms(&plateau(), 12.0, XmsMethod::Cumulative).is_err());
    }
}
