use super::calculation_info;
use crate::data::channel::Channel;
use crate::data::code::CodeField;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Scaling factor and deformation constant (m) per dummy type.
pub fn vc_constants(dummy: &str) -> Result<(f64, f64)> {
    let constants = match dummy {
        "BS" => (1.0, 0.175),
        "E2" | "ER" => (1.0, 0.140),
        "H3" => (1.3, 0.229),
        "HF" => (1.3, 0.187),
        "HM" => (1.3, 0.254),
        "S2" | "WF" => (1.0, 0.138),
        "WS" => (1.0, 0.170),
        "Y6" => (1.3, 0.122),
        "Y7" => (1.3, 0.143),
        "YA" => (1.3, 0.166),
        other => {
            return Err(Error::UnsupportedDummy {
                dummy: other.to_string(),
                calculation: "viscous criterion",
            })
        }
    };
    Ok(constants)
}

/// Viscous criterion `VC = sf · v(t) · D(t)/D0` from a deflection channel.
///
/// The deformation velocity uses the 5-point central difference; the first
/// and last two samples are 0. Chest inputs give `VCCR`, abdominal inputs
/// (`ABDO`, `ABRI`) give `VCAR`.
pub fn viscous_criterion(deflection: &Channel, constants: Option<(f64, f64)>) -> Result<Channel> {
    let (scaling_factor, deformation_constant) = match constants {
        Some(constants) => constants,
        None => vc_constants(deflection.code.fine_location_3())?,
    };
    let m = Unit::parse("m")?;
    let d = deflection.get_data(Some(&m))?;
    let t = deflection.time();
    let n = d.len();

    let mut vc = vec![0.0; n];
    for i in 2..n.saturating_sub(2) {
        let velocity = (8.0 * (d[i + 1] - d[i - 1]) - (d[i + 2] - d[i - 2])) / (12.0 * (t[i] - t[i - 1]));
        vc[i] = scaling_factor * velocity * d[i] / deformation_constant;
    }

    let main_location = match deflection.code.main_location() {
        "ABDO" | "ABRI" => "VCAR",
        _ => "VCCR",
    };
    let code = deflection.code.set(&[
        (CodeField::MainLocation, main_location),
        (CodeField::PhysicalDimension, "VE"),
        (CodeField::Direction, "X"),
    ])?;
    let mut info = calculation_info(&deflection.info, &[deflection]);
    info.push(".Scaling factor", scaling_factor)
        .push(".Deformation constant", deformation_constant);
    Ok(Channel::from_parts(code, t.to_vec(), vc, Unit::parse("m/s")?, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::code::Code;

    fn deflection(code: &str, rate: f64) -> Channel {
        let time: Vec<f64> = (0..100).map(|i| i as f64 * 1e-4).collect();
        let values = time.iter().map(|t| rate * t * 1000.0).collect();
        Channel::new(Code::new(code).unwrap(), time, values, Some(Unit::parse("mm").unwrap())).unwrap()
    }

    #[test]
    fn test_linear_compression() {
        // D(t) = 2 t m, v = 2 m/s, H3: VC = 1.3 * 2 * 2t / 0.229
        let chest = deflection("11CHST0000H3DSXC", 2.0);
        let vc = viscous_criterion(&chest, None).unwrap();
        assert_eq!(vc.code.as_str(), "11VCCR0000H3VEXC");
        assert_eq!(vc.values()[0], 0.0);
        assert_eq!(vc.values()[99], 0.0);
        for i in 2..98 {
            let t = chest.time()[i];
            let expected = 1.3 * 2.0 * 2.0 * t / 0.229;
            assert!((vc.values()[i] - expected).abs() < 1e-9, "sample {i}");
        }
    }

    #[test]
    fn test_abdomen_code_and_override() {
        let abdomen = deflection("11ABRI0100WSDSYC", 1.0);
        let vc = viscous_criterion(&abdomen, Some((1.0, 0.1))).unwrap();
        assert_eq!(vc.code.main_location(), "VCAR");
        assert_eq!(vc.get_info(&[".Deformation constant"]).and_then(|v| v.as_f64()), Some(0.1));
    }

    #[test]
    fn test_unsupported_dummy() {
        let chest = deflection("11CHST0000Q6DSXC", 1.0);
        assert!(matches!(
            viscous_criterion(&chest, None),
            Err(Error::UnsupportedDummy { .. })
        ));
    }
}
