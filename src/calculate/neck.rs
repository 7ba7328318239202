use super::{calculation_info, common_dummy, peak, Peak};
use crate::data::channel::Channel;
use crate::data::code::CodeField;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Neck moments transferred from the load cell to another joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeckMoment {
    /// Mx at the occipital condyle: `Mx + Fy·d`.
    OccipitalX,
    /// My at the occipital condyle: `My - Fx·d`.
    OccipitalY,
    /// Mx at the neck base: `Mx - Fy·dz`.
    BaseX,
    /// My at the neck base: `My + Fx·dz`.
    BaseY,
}

impl NeckMoment {
    /// Select the transform from the `TMON` code fields (fine location 1, direction).
    pub fn from_code_fields(fine_location_1: &str, direction: &str) -> Option<Self> {
        match (fine_location_1, direction) {
            ("UP", "X") => Some(NeckMoment::OccipitalX),
            ("UP", "Y") => Some(NeckMoment::OccipitalY),
            ("LO", "X") => Some(NeckMoment::BaseX),
            ("LO", "Y") => Some(NeckMoment::BaseY),
            _ => None,
        }
    }

    /// Direction of the measured moment; the shear force acts on the other axis.
    pub fn moment_direction(self) -> &'static str {
        match self {
            NeckMoment::OccipitalX | NeckMoment::BaseX => "X",
            NeckMoment::OccipitalY | NeckMoment::BaseY => "Y",
        }
    }

    pub fn force_direction(self) -> &'static str {
        match self {
            NeckMoment::OccipitalX | NeckMoment::BaseX => "Y",
            NeckMoment::OccipitalY | NeckMoment::BaseY => "X",
        }
    }

    fn name(self) -> &'static str {
        match self {
            NeckMoment::OccipitalX => "neck MOCx",
            NeckMoment::OccipitalY => "neck MOCy",
            NeckMoment::BaseX => "neck Mx base",
            NeckMoment::BaseY => "neck My base",
        }
    }

    /// Lever arm in m for a dummy type.
    pub fn lever_arm(self, dummy: &str) -> Result<f64> {
        let arm = match (self, dummy) {
            (NeckMoment::OccipitalX, "WS") => 0.0195,
            (NeckMoment::OccipitalY, "WS") => 0.0195,
            (NeckMoment::OccipitalY, "H3" | "HF") => 0.01778,
            (NeckMoment::BaseX | NeckMoment::BaseY, "WS") => 0.0145,
            _ => {
                return Err(Error::UnsupportedDummy {
                    dummy: dummy.to_string(),
                    calculation: self.name(),
                })
            }
        };
        Ok(arm)
    }

    /// Sign of the force term.
    fn sign(self) -> f64 {
        match self {
            NeckMoment::OccipitalX | NeckMoment::BaseY => 1.0,
            NeckMoment::OccipitalY | NeckMoment::BaseX => -1.0,
        }
    }

    /// How the scalar value is taken from the time series.
    pub fn peak_mode(self) -> Peak {
        match self {
            NeckMoment::OccipitalX => Peak::MaxAbs,
            NeckMoment::BaseX => Peak::AbsMax,
            NeckMoment::OccipitalY => Peak::Min,
            NeckMoment::BaseY => Peak::AbsOfMin,
        }
    }
}

/// Transferred neck moment in N·m, main location `TMON`.
///
/// `lever_arm` (m) overrides the dummy-specific default.
pub fn neck_moment(kind: NeckMoment, moment: &Channel, force: &Channel, lever_arm: Option<f64>) -> Result<Channel> {
    let arm = match lever_arm {
        Some(arm) => arm,
        None => kind.lever_arm(&common_dummy(&[moment, force])?)?,
    };
    let nm = Unit::parse("Nm")?;
    let moment_nm = moment.converted(&nm)?;
    let mut force_term = &force.converted(&Unit::parse("N")?)? * (kind.sign() * arm);
    force_term.set_unit(nm);

    let mut channel = &moment_nm + &force_term;
    channel.set_code(moment.code.with(CodeField::MainLocation, "TMON")?);
    let label = match kind {
        NeckMoment::OccipitalX | NeckMoment::OccipitalY => ".D",
        NeckMoment::BaseX | NeckMoment::BaseY => ".Dz",
    };
    let mut info = calculation_info(&moment.info, &[moment, force]);
    info.push(label, arm);
    Ok(channel.with_info(info))
}

/// Scalar value of a transferred moment as used for rating.
pub fn neck_moment_peak(kind: NeckMoment, channel: &Channel) -> Result<Channel> {
    peak(channel, kind.peak_mode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::code::Code;

    fn channel(code: &str, values: Vec<f64>, unit: &str) -> Channel {
        let time = (0..values.len()).map(|i| i as f64 * 1e-3).collect();
        Channel::new(Code::new(code).unwrap(), time, values, Some(Unit::parse(unit).unwrap())).unwrap()
    }

    #[test]
    fn test_occipital_y_h3() {
        let my = channel("11NECKUP00H3MOYB", vec![10.0, -20.0, 5.0], "Nm");
        let fx = channel("11NECKUP00H3FOXB", vec![1.0, 2.0, -3.0], "kN");
        let mocy = neck_moment(NeckMoment::OccipitalY, &my, &fx, None).unwrap();
        assert_eq!(mocy.code.as_str(), "11TMONUP00H3MOYB");
        let expected = [10.0 - 17.78, -20.0 - 35.56, 5.0 + 53.34];
        for (v, e) in mocy.values().iter().zip(expected) {
            assert!((v - e).abs() < 1e-9, "{v} vs {e}");
        }
        assert_eq!(mocy.unit, Unit::parse("Nm").unwrap());

        let scalar = neck_moment_peak(NeckMoment::OccipitalY, &mocy).unwrap();
        assert!((scalar.values()[0] - (-55.56)).abs() < 1e-9);
        assert_eq!(scalar.code.filter_class(), "X");
    }

    #[test]
    fn test_base_y_positive_magnitude() {
        let my = channel("11NECKLO00WSMOYB", vec![-10.0, -30.0], "Nm");
        let fx = channel("11NECKLO00WSFOXB", vec![0.0, 0.0], "N");
        let base = neck_moment(NeckMoment::BaseY, &my, &fx, None).unwrap();
        let scalar = neck_moment_peak(NeckMoment::BaseY, &base).unwrap();
        assert_eq!(scalar.values(), &[30.0]);
    }

    #[test]
    fn test_base_x_reports_magnitude() {
        let mx = channel("11NECKLO00WSMOXB", vec![1.0, -7.0, 3.0], "Nm");
        let fy = channel("11NECKLO00WSFOYB", vec![0.0, 0.0, 0.0], "N");
        let base = neck_moment(NeckMoment::BaseX, &mx, &fy, None).unwrap();
        assert_eq!(base.code.as_str(), "11TMONLO00WSMOXB");
        let scalar = neck_moment_peak(NeckMoment::BaseX, &base).unwrap();
        assert_eq!(scalar.values(), &[7.0]);
        assert_eq!(scalar.time(), &[1e-3]);

        // the occipital variant keeps the sign
        let mocx = neck_moment(NeckMoment::OccipitalX, &mx, &fy, None).unwrap();
        assert_eq!(neck_moment_peak(NeckMoment::OccipitalX, &mocx).unwrap().values(), &[-7.0]);
    }

    #[test]
    fn test_unsupported_dummy() {
        let mx = channel("11NECKUP00H3MOXB", vec![1.0], "Nm");
        let fy = channel("11NECKUP00H3FOYB", vec![1.0], "N");
        assert!(matches!(
            neck_moment(NeckMoment::OccipitalX, &mx, &fy, None),
            Err(Error::UnsupportedDummy { .. })
        ));
        assert!(neck_moment(NeckMoment::OccipitalX, &mx, &fy, Some(0.02)).is_ok());
    }

    #[test]
    fn test_mixed_dummies_rejected() {
        let mx = channel("11NECKUP00WSMOXB", vec![1.0], "Nm");
        let fy = channel("11NECKUP00H3FOYB", vec![1.0], "N");
        assert!(matches!(
            neck_moment(NeckMoment::OccipitalX, &mx, &fy, None),
            Err(Error::InconsistentInputs(_))
        ));
    }
}
