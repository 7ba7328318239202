//! Pure injury-criterion and signal calculations.
//!
//! Every function takes resolved input channels and returns new channels;
//! inputs are never modified. Missing inputs are the resolver's concern:
//! nothing here deals in `Option<Channel>` arguments.

pub mod bric;
pub mod damage;
pub mod hic;
pub mod irtracc;
pub mod neck;
pub mod olc;
pub mod resultant;
pub mod tibia;
pub mod vc;
pub mod xms;

pub use bric::{bric, BricMethod};
pub use damage::{damage, Damage};
pub use hic::hic;
pub use irtracc::{length_to_displacement, thor_position};
pub use neck::{neck_moment, NeckMoment};
pub use olc::{olc, Olc};
pub use resultant::resultant;
pub use tibia::tibia_index;
pub use vc::viscous_criterion;
pub use xms::{xms, XmsMethod};

use crate::data::channel::{time_intersect, Channel};
use crate::data::code::{Code, CodeField};
use crate::data::info::Info;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Info of a calculated channel: `base` plus the data source and the codes
/// and filter classes of every input.
pub(crate) fn calculation_info(base: &Info, inputs: &[&Channel]) -> Info {
    let mut info = base.clone();
    info.insert("Data source", "Calculation");
    for (idx, input) in inputs.iter().enumerate() {
        info.push(format!(".Channel {:03}", idx + 1), input.code.to_string());
    }
    for (idx, input) in inputs.iter().enumerate() {
        info.push(format!(".Filter {:03}", idx + 1), input.code.filter_class());
    }
    info
}

/// The single dummy type (fine location 3) shared by all inputs.
pub(crate) fn common_dummy(channels: &[&Channel]) -> Result<String> {
    let first = channels
        .first()
        .ok_or_else(|| Error::InvalidParameter("no input channels".into()))?
        .code
        .fine_location_3();
    if let Some(other) = channels.iter().find(|c| c.code.fine_location_3() != first) {
        return Err(Error::InconsistentInputs(format!(
            "multiple dummy types found: {first}, {}",
            other.code.fine_location_3()
        )));
    }
    Ok(first.to_string())
}

/// How a scalar is picked from a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peak {
    /// Sample with the largest magnitude, sign kept.
    MaxAbs,
    /// Largest magnitude, always positive.
    AbsMax,
    Max,
    Min,
    /// Magnitude of the minimum.
    AbsOfMin,
}

/// Reduce a time series to a single-sample channel with filter class `X`.
pub fn peak(channel: &Channel, mode: Peak) -> Result<Channel> {
    let (time, value) = match mode {
        Peak::MaxAbs => channel.peak_abs(),
        Peak::AbsMax => channel.peak_abs().map(|(t, v)| (t, v.abs())),
        Peak::Max => channel.peak_max(),
        Peak::Min => channel.peak_min(),
        Peak::AbsOfMin => channel.peak_min().map(|(t, v)| (t, v.abs())),
    }
    .ok_or_else(|| Error::Calculation(format!("{}: no samples to take a peak from", channel.code)))?;

    let mut info = channel.info.clone();
    info.push(".Time", time);
    if let (Some(first), Some(last)) = (channel.time().first(), channel.time().last()) {
        info.push(".Analysis start time", *first);
        info.push(".Analysis end time", *last);
    }
    let code = channel.code.with(CodeField::FilterClass, "X")?;
    Ok(Channel::scalar(code, time, value, channel.unit.clone()).with_info(info))
}

/// Element-wise combination of sibling channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Min,
    Max,
    /// Value of the largest magnitude, sign kept.
    MaxAbs,
}

impl Envelope {
    fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Envelope::Min => a.min(b),
            Envelope::Max => a.max(b),
            Envelope::MaxAbs if b.abs() > a.abs() => b,
            Envelope::MaxAbs => a,
        }
    }
}

/// Envelope of `channels` on their common time grid, in the first
/// channel's unit and labelled with `code`.
pub fn envelope(channels: &[&Channel], mode: Envelope, code: Code) -> Result<Channel> {
    let first = channels
        .first()
        .ok_or_else(|| Error::InvalidParameter("envelope of no channels".into()))?;
    let time = time_intersect(channels);
    let mut values = first.get_data_at(&time, None)?;
    for channel in &channels[1..] {
        let other = channel.get_data_at(&time, Some(&first.unit))?;
        for (v, o) in values.iter_mut().zip(other) {
            *v = mode.pick(*v, o);
        }
    }
    let info = calculation_info(&first.info, channels);
    Ok(Channel::from_parts(code, time, values, first.unit.clone(), info))
}

/// Largest-magnitude peak over several channels as one scalar channel.
pub fn peak_of_peaks(channels: &[&Channel], code: Code) -> Result<Channel> {
    let first = channels
        .first()
        .ok_or_else(|| Error::InvalidParameter("peak of no channels".into()))?;
    let mut best: Option<(f64, f64)> = None;
    for channel in channels {
        let converted = channel.converted(&first.unit)?;
        if let Some((t, v)) = converted.peak_abs() {
            if best.map_or(true, |(_, b)| v.abs() > b.abs()) {
                best = Some((t, v));
            }
        }
    }
    let (time, value) = best.ok_or_else(|| Error::Calculation(format!("{code}: inputs hold no samples")))?;
    let info = calculation_info(&Info::new(), channels);
    Ok(Channel::scalar(code, time, value, first.unit.clone()).with_info(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::unit::Unit;

    fn channel(code: &str, time: Vec<f64>, values: Vec<f64>, unit: &str) -> Channel {
        Channel::new(Code::new(code).unwrap(), time, values, Some(Unit::parse(unit).unwrap())).unwrap()
    }

    #[test]
    fn test_envelopes() {
        let left = channel("11FEMRLE00H3FOZB", vec![0.0, 1.0, 2.0], vec![-1.0, -5.0, 2.0], "kN");
        let right = channel("11FEMRRI00H3FOZB", vec![0.0, 1.0, 2.0], vec![-3000.0, -1000.0, 1000.0], "N");
        let code = Code::new("11FEMR0000H3FOZB").unwrap();

        let min = envelope(&[&left, &right], Envelope::Min, code.clone()).unwrap();
        assert_eq!(min.values(), &[-3.0, -5.0, 1.0]);
        assert_eq!(min.unit, Unit::parse("kN").unwrap());
        assert_eq!(min.code, code);

        let max = envelope(&[&left, &right], Envelope::Max, code.clone()).unwrap();
        assert_eq!(max.values(), &[-1.0, -1.0, 2.0]);

        let max_abs = envelope(&[&left, &right], Envelope::MaxAbs, code).unwrap();
        assert_eq!(max_abs.values(), &[-3.0, -5.0, 2.0]);
        assert_eq!(
            max_abs.get_info(&[".Channel 002"]).and_then(|v| v.as_str()),
            Some("11FEMRRI00H3FOZB")
        );
    }

    #[test]
    fn test_peak_modes() {
        let c = channel("11NECKUP00H3MOYB", vec![0.0, 0.1, 0.2], vec![10.0, -40.0, 20.0], "Nm");
        let p = peak(&c, Peak::MaxAbs).unwrap();
        assert_eq!(p.values(), &[-40.0]);
        assert_eq!(p.time(), &[0.1]);
        assert_eq!(p.code.filter_class(), "X");
        assert_eq!(peak(&c, Peak::Max).unwrap().values(), &[20.0]);
        assert_eq!(peak(&c, Peak::AbsOfMin).unwrap().values(), &[40.0]);
        assert_eq!(peak(&c, Peak::AbsMax).unwrap().values(), &[40.0]);
    }

    #[test]
    fn test_common_dummy() {
        let a = channel("11NECKUP00H3MOYB", vec![0.0], vec![1.0], "Nm");
        let b = channel("11NECKUP00WSFOXB", vec![0.0], vec![1.0], "N");
        assert_eq!(common_dummy(&[&a]).unwrap(), "H3");
        assert!(matches!(common_dummy(&[&a, &b]), Err(Error::InconsistentInputs(_))));
    }

    #[test]
    fn test_peak_of_peaks() {
        let a = channel("11VCCRLE00H3VEXC", vec![0.0, 1.0], vec![0.5, 0.2], "m/s");
        let b = channel("11VCCRRI00H3VEXC", vec![0.0, 1.0], vec![0.1, -0.8], "m/s");
        let p = peak_of_peaks(&[&a, &b], Code::new("11VCCR0000H3VEXX").unwrap()).unwrap();
        assert_eq!(p.values(), &[-0.8]);
        assert_eq!(p.time(), &[1.0]);
    }
}
