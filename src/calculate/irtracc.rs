use super::calculation_info;
use crate::data::channel::{time_intersect, Channel};
use crate::data::code::CodeField;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Dummy types fitted with 3D IR-TRACCs in chest and abdomen.
pub const THOR_DUMMIES: [&str; 2] = ["TH", "T3"];

/// Vertical offset (mm) of the upper and lower chest IR-TRACC attachment.
pub const THOR_CHEST_OFFSET: f64 = 15.65;

/// Offset of a THOR IR-TRACC from fine location 2 (`UP`, `LO`, abdomen `00`).
pub fn thor_offset(fine_location_2: &str) -> f64 {
    match fine_location_2 {
        "UP" => THOR_CHEST_OFFSET,
        "LO" => -THOR_CHEST_OFFSET,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_letter(direction: &str) -> Option<Self> {
        match direction {
            "X" => Some(Axis::X),
            "Y" => Some(Axis::Y),
            "Z" => Some(Axis::Z),
            _ => None,
        }
    }

    fn letter(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// Component of a THOR IR-TRACC end position in mm.
///
/// `length` is the measured length (direction `0`), `angle_y`/`angle_z` the
/// potentiometer angles. With `θy`, `θz` and offset `δ`:
///
/// ```text
/// X = δ·sin θy + L·cos θy·cos θz
/// Y = L·sin θz
/// Z = δ·cos θy − L·sin θy·cos θz
/// ```
///
/// `angle_y` is not needed for the Y component.
pub fn thor_position(
    axis: Axis,
    length: &Channel,
    angle_y: Option<&Channel>,
    angle_z: &Channel,
    offset: f64,
) -> Result<Channel> {
    let mut inputs = vec![length, angle_z];
    if axis != Axis::Y {
        let angle_y = angle_y.ok_or_else(|| Error::InvalidParameter("IR-TRACC X/Z needs the Y angle".into()))?;
        inputs.push(angle_y);
    }
    let time = time_intersect(&inputs);
    let rad = Unit::parse("rad")?;
    let l = length.get_data_at(&time, Some(&Unit::parse("mm")?))?;
    let theta_z = angle_z.get_data_at(&time, Some(&rad))?;
    let theta_y = match (axis, angle_y) {
        (Axis::Y, _) | (_, None) => vec![0.0; time.len()],
        (_, Some(angle_y)) => angle_y.get_data_at(&time, Some(&rad))?,
    };

    let values = l
        .iter()
        .zip(&theta_y)
        .zip(&theta_z)
        .map(|((l, ty), tz)| match axis {
            Axis::X => offset * ty.sin() + l * ty.cos() * tz.cos(),
            Axis::Y => l * tz.sin(),
            Axis::Z => offset * ty.cos() - l * ty.sin() * tz.cos(),
        })
        .collect();

    let code = length.code.with(CodeField::Direction, axis.letter())?;
    let mut info = calculation_info(&length.info, &inputs);
    info.push(".Offset", offset);
    Ok(Channel::from_parts(code, time, values, Unit::parse("mm")?, info))
}

/// Displacement from a length channel: `L(t) − L(0)`, physical dimension `DS`.
pub fn length_to_displacement(length: &Channel) -> Result<Channel> {
    let mut displacement = length - length.value_at(0.0);
    displacement.set_code(length.code.with(CodeField::PhysicalDimension, "DS")?);
    Ok(displacement)
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
    fn test_offsets() {
        assert_eq!(thor_offset("UP"), 15.65);
        assert_eq!(thor_offset("LO"), -15.65);
        assert_eq!(thor_offset("00"), 0.0);
    }

    #[test]
    fn test_position_without_rotation() {
        let length = channel("11CHSTLEUPTHDC0C", vec![100.0, 90.0], "mm");
        let any = channel("11CHSTLEUPTHANYC", vec![0.0, 0.0], "rad");
        let anz = channel("11CHSTLEUPTHANZC", vec![0.0, 0.0], "rad");

        let x = thor_position(Axis::X, &length, Some(&any), &anz, 15.65).unwrap();
        assert_eq!(x.code.as_str(), "11CHSTLEUPTHDCXC");
        assert_eq!(x.values(), &[100.0, 90.0]);

        let y = thor_position(Axis::Y, &length, None, &anz, 15.65).unwrap();
        assert_eq!(y.values(), &[0.0, 0.0]);

        let z = thor_position(Axis::Z, &length, Some(&any), &anz, 15.65).unwrap();
        assert!(z.values().iter().all(|v| (v - 15.65).abs() < 1e-12));
        assert_eq!(z.unit, Unit::parse("mm").unwrap());
    }

    #[test]
    fn test_position_rotated() {
        let length = channel("11CHSTRILOTHDC0C", vec![0.1], "m");
        let any = channel("11CHSTRILOTHANYC", vec![90.0], "deg");
        let anz = channel("11CHSTRILOTHANZC", vec![30.0], "deg");

        // θy = 90°: X is the offset alone, Z the projected length
        let x = thor_position(Axis::X, &length, Some(&any), &anz, -15.65).unwrap();
        assert!((x.values()[0] + 15.65).abs() < 1e-9, "{}", x.values()[0]);
        let z = thor_position(Axis::Z, &length, Some(&any), &anz, -15.65).unwrap();
        let expected = -100.0 * (30.0f64).to_radians().cos();
        assert!((z.values()[0] - expected).abs() < 1e-9, "{}", z.values()[0]);
        let y = thor_position(Axis::Y, &length, None, &anz, -15.65).unwrap();
        assert!((y.values()[0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_y_angle() {
        let length = channel("11CHSTLEUPTHDC0C", vec![100.0], "mm");
        let anz = channel("11CHSTLEUPTHANZC", vec![0.0], "rad");
        assert!(matches!(
            thor_position(Axis::X, &length, None, &anz, 0.0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_length_to_displacement() {
        let length = channel("11ABDOLE00THDC0C", vec![120.0, 110.0, 95.0], "mm");
        let ds = length_to_displacement(&length).unwrap();
        assert_eq!(ds.code.as_str(), "11ABDOLE00THDS0C");
        assert_eq!(ds.values(), &[0.0, -10.0, -25.0]);
    }
}
