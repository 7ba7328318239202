use log::warn;

use crate::data::channel::{cumulative_trapezoid, interpolate, Channel};
use crate::data::code::CodeField;
use crate::data::info::Info;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Relative occupant travel before the restraint engages (m).
pub const FREE_FLIGHT_DISPLACEMENT: f64 = 0.065;
/// Relative occupant travel while restrained (m).
pub const RESTRAINING_DISPLACEMENT: f64 = 0.235;

/// Occupant Load Criterion result.
#[derive(Debug, Clone)]
pub struct Olc {
    /// Constant occupant deceleration in g, single sample, filter class `X`.
    pub value: Channel,
    /// Virtual occupant velocity: constant, then decelerating, then vehicle velocity.
    pub visual: Channel,
}

/// OLC of a vehicle velocity pulse.
///
/// The virtual occupant moves on at the initial velocity until it has
/// travelled `free_flight` relative to the vehicle (t1). It then decelerates
/// uniformly so that it reaches the vehicle velocity at t2 after a further
/// `restraining` of relative travel.
pub fn olc(velocity: &Channel, free_flight: f64, restraining: f64) -> Result<Olc> {
    let m_s = Unit::parse("m/s")?;
    let v = velocity.get_data(Some(&m_s))?;
    let time = velocity.time();
    let v0 = velocity.value_at(0.0) * velocity.unit.conversion_factor(&m_s)?;

    // relative displacement of the free occupant, zero at t = 0
    let relative: Vec<f64> = v.iter().map(|vi| v0 - vi).collect();
    let mut s_rel = cumulative_trapezoid(&relative, time);
    let offset = interpolate(time, &s_rel, 0.0);
    for s in &mut s_rel {
        *s -= offset;
    }

    let i1 = s_rel
        .iter()
        .position(|&s| s >= free_flight)
        .ok_or_else(|| Error::Calculation("OLC: free flight phase too short".into()))?;
    let t1 = time[i1];

    let mut found = None;
    let mut last = None;
    for i2 in i1 + 1..time.len() {
        let t2 = time[i2];
        let deceleration = (v0 - v[i2]) / (t2 - t1);
        last = Some((i2, deceleration));
        if s_rel[i2] - deceleration * (t2 - t1).powi(2) / 2.0 >= free_flight + restraining {
            found = Some((i2, deceleration));
            break;
        }
    }
    let (i2, deceleration) = match (found, last) {
        (Some(hit), _) => hit,
        (None, Some(end)) => {
            warn!("OLC: restraining phase displacement not reached, using end of signal");
            end
        }
        (None, None) => return Err(Error::Calculation("OLC: no samples after free flight phase".into())),
    };
    let t2 = time[i2];
    let v2 = v[i2];

    let visual_values = time
        .iter()
        .map(|&t| {
            if t < t1 {
                v0
            } else if t < t2 {
                v0 - deceleration * (t - t1)
            } else {
                v2
            }
        })
        .collect();

    let olc_code = velocity.code.set(&[(CodeField::FineLocation1, "0O"), (CodeField::FineLocation2, "LC")])?;
    let g0 = Unit::standard_gravity();
    let olc_g = deceleration * Unit::parse("m/s^2")?.conversion_factor(&g0)?;

    let mut info = Info::new();
    info.push("Data source", "Calculation")
        .push(".Channel 001", velocity.code.to_string())
        .push("t_1 [s]", t1)
        .push("t_2 [s]", t2);

    let mut visual_info = velocity.info.clone();
    visual_info.insert("Data source", "Calculation");
    visual_info.push("OLC [g]", olc_g).push("t_1 [s]", t1).push("t_2 [s]", t2);
    let visual = Channel::from_parts(olc_code.clone(), time.to_vec(), visual_values, m_s, visual_info);

    let value = Channel::scalar(olc_code.with(CodeField::FilterClass, "X")?, t1, olc_g, g0).with_info(info);
    Ok(Olc { value, visual })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::code::Code;

    #[test]
    fn test_constant_deceleration_pulse() {
        let v0 = 30.0;
        let d = 200.0;
        let time: Vec<f64> = (0..1501).map(|i| i as f64 * 1e-4).collect();
        let values = time.iter().map(|t| v0 - d * t).collect();
        let velocity = Channel::new(Code::new("10VEHCCG0000VEXA").unwrap(), time, values, Some(Unit::parse("m/s").unwrap()))
            .unwrap();

        let result = olc(&velocity, FREE_FLIGHT_DISPLACEMENT, RESTRAINING_DISPLACEMENT).unwrap();

        // s_rel = d t²/2 → t1 = sqrt(2·0.065/d); end condition d·t1·t2/2 = 0.3
        let t1 = (2.0 * FREE_FLIGHT_DISPLACEMENT / d).sqrt();
        let t2 = 2.0 * (FREE_FLIGHT_DISPLACEMENT + RESTRAINING_DISPLACEMENT) / (d * t1);
        let expected = d * t2 / (t2 - t1) / 9.80665;

        let value = result.value.values()[0];
        assert!((value - expected).abs() / expected < 1e-2, "{value} vs {expected}");
        assert_eq!(result.value.code.as_str(), "10VEHC0OLC00VEXX");
        assert_eq!(result.value.unit, Unit::standard_gravity());
        assert_eq!(result.visual.code.filter_class(), "A");
        assert_eq!(result.visual.values()[0], v0);
        let got_t2 = result.visual.get_info(&["t_2 [s]"]).and_then(|v| v.as_f64()).unwrap();
        assert!((got_t2 - t2).abs() < 1e-3);
    }

    #[test]
    fn test_short_pulse_fails() {
        let time: Vec<f64> = (0..11).map(|i| i as f64 * 1e-3).collect();
        let velocity = Channel::new(Code::new("10VEHCCG0000VEXA").unwrap(), time, vec![10.0; 11], None).unwrap();
        assert!(olc(&velocity, FREE_FLIGHT_DISPLACEMENT, RESTRAINING_DISPLACEMENT).is_err());
    }
}
