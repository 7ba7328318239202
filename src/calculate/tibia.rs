use super::{calculation_info, common_dummy, resultant};
use crate::data::channel::{time_intersect, Channel};
use crate::data::code::CodeField;
use crate::data::info::Info;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Dummy types the tibia index is defined for.
pub const TIBIA_INDEX_DUMMIES: [&str; 4] = ["H3", "HF", "TH", "T3"];

/// Critical resultant moment (Nm) and axial force (kN).
fn critical_values(dummy: &str) -> Result<(f64, f64)> {
    match dummy {
        "H3" | "TH" | "T3" => Ok((225.0, 35.9)),
        "HF" => Ok((115.0, 22.9)),
        other => Err(Error::UnsupportedDummy {
            dummy: other.to_string(),
            calculation: "tibia index",
        }),
    }
}

/// `TI = |M_R| / M_c + |F_Z| / F_c` on the common time grid.
pub fn tibia_index(mx: &Channel, my: &Channel, fz: &Channel) -> Result<Channel> {
    let inputs = [mx, my, fz];
    let dummy = common_dummy(&inputs)?;
    let (moment_critical, force_critical) = critical_values(&dummy)?;
    for (field, name) in [(CodeField::TestObject, "test objects"), (CodeField::Position, "positions")] {
        if inputs.iter().any(|c| c.code.field(field) != mx.code.field(field)) {
            return Err(Error::InconsistentInputs(format!("channels with different {name}")));
        }
    }

    let moment = resultant(&[mx, my])?;
    let time = time_intersect(&[&moment, fz]);
    let m = moment.get_data_at(&time, Some(&Unit::parse("Nm")?))?;
    let f = fz.get_data_at(&time, Some(&Unit::parse("kN")?))?;
    let values = m
        .iter()
        .zip(&f)
        .map(|(m, f)| (m / moment_critical).abs() + (f / force_critical).abs())
        .collect();

    let code = mx.code.set(&[
        (CodeField::MainLocation, "TIIN"),
        (CodeField::PhysicalDimension, "00"),
        (CodeField::Direction, "0"),
    ])?;
    let info = calculation_info(&Info::new(), &inputs);
    Ok(Channel::from_parts(code, time, values, Unit::dimensionless(), info))
}
