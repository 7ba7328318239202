//! Diffuse Axonal Multi-Axis General Evaluation (DAMAGE).
//!
//! Three coupled mass-spring-damper oscillators driven by the head angular
//! accelerations:
//!
//! ```text
//! M δ'' + C δ' + K δ = M a(t),   C = a1 · K
//! ```
//!
//! reduced to a 6-state first-order system and integrated with the
//! trapezoidal rule. The fast damped mode is stiff, hence the implicit
//! scheme and the fixed sub-stepping between samples.

use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use super::resultant;
use super::{calculation_info, peak, Peak};
use crate::data::channel::{time_intersect, Channel};
use crate::data::code::CodeField;
use crate::data::info::Info;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

const K_XX: f64 = 32142.0;
const K_XY: f64 = 0.0;
const K_XZ: f64 = 1636.3;
const K_YY: f64 = 23493.0;
const K_YZ: f64 = 0.0;
const K_ZZ: f64 = 16935.0;
const A1: f64 = 5.9148;
const BETA: f64 = 2.9903;

/// Integration steps per sample interval.
const SUBSTEPS: usize = 10;

/// DAMAGE time series per axis and their resultant (dimensionless).
#[derive(Debug, Clone)]
pub struct Damage {
    pub x: Channel,
    pub y: Channel,
    pub z: Channel,
    pub resultant: Channel,
}

impl Damage {
    /// Time series for direction `X`, `Y`, `Z` or `R`.
    pub fn component(&self, direction: &str) -> Option<&Channel> {
        match direction {
            "X" => Some(&self.x),
            "Y" => Some(&self.y),
            "Z" => Some(&self.z),
            "R" => Some(&self.resultant),
            _ => None,
        }
    }

    /// Maximum of a component as a scalar channel (filter class `X`).
    pub fn maximum(&self, direction: &str) -> Result<Option<Channel>> {
        self.component(direction).map(|c| peak(c, Peak::Max)).transpose()
    }
}

/// Coupled stiffness matrix of the model.
#[rustfmt::skip]
fn stiffness() -> Matrix3<f64> {
    Matrix3::new(
        K_XX + K_XY + K_XZ, -K_XY, -K_XZ,
        -K_XY, K_XY + K_YY + K_YZ, -K_YZ,
        -K_XZ, -K_YZ, K_XZ + K_YZ + K_ZZ,
    )
}

/// `A` of `s' = A s + b(t)` with `s = [δ, δ']`.
fn system_matrix() -> Matrix6<f64> {
    let k = stiffness();
    let c = k * A1;
    let mut a = Matrix6::zeros();
    a.fixed_view_mut::<3, 3>(0, 3).copy_from(&Matrix3::identity());
    a.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-k));
    a.fixed_view_mut::<3, 3>(3, 3).copy_from(&(-c));
    a
}

/// Trapezoidal step `s1 = P s0 + G (b0 + b1)` for one step width.
struct Stepper {
    h: f64,
    propagator: Matrix6<f64>,
    input_gain: Matrix6<f64>,
}

impl Stepper {
    fn new(a: &Matrix6<f64>, h: f64) -> Result<Self> {
        let identity = Matrix6::identity();
        let implicit = identity - a * (h / 2.0);
        let inverse = implicit
            .try_inverse()
            .ok_or_else(|| Error::Calculation(format!("DAMAGE: singular step matrix for h = {h}")))?;
        Ok(Stepper {
            h,
            propagator: inverse * (identity + a * (h / 2.0)),
            input_gain: inverse * (h / 2.0),
        })
    }

    fn step(&self, state: &Vector6<f64>, a0: &Vector3<f64>, a1: &Vector3<f64>) -> Vector6<f64> {
        let mut forcing = Vector6::zeros();
        forcing.fixed_rows_mut::<3>(3).copy_from(&(a0 + a1));
        self.propagator * state + self.input_gain * forcing
    }
}

/// Integrate the model over the common grid of the three angular accelerations.
pub fn damage(aa_x: &Channel, aa_y: &Channel, aa_z: &Channel) -> Result<Damage> {
    let rad_s2 = Unit::parse("rad/s^2")?;
    let time = time_intersect(&[aa_x, aa_y, aa_z]);
    if time.len() < 2 {
        return Err(Error::Calculation("DAMAGE needs at least two common samples".into()));
    }
    let ax = aa_x.get_data_at(&time, Some(&rad_s2))?;
    let ay = aa_y.get_data_at(&time, Some(&rad_s2))?;
    let az = aa_z.get_data_at(&time, Some(&rad_s2))?;
    let accel = |i: usize| Vector3::new(ax[i], ay[i], az[i]);

    let a = system_matrix();
    let mut stepper: Option<Stepper> = None;
    let mut state = Vector6::zeros();
    let mut deflection = Vec::with_capacity(time.len());
    deflection.push(Vector3::zeros());

    for i in 1..time.len() {
        let h = (time[i] - time[i - 1]) / SUBSTEPS as f64;
        let reuse = stepper.as_ref().is_some_and(|s| (s.h - h).abs() <= 1e-12 * h);
        if !reuse {
            stepper = Some(Stepper::new(&a, h)?);
        }
        let Some(stepper) = stepper.as_ref() else {
            continue;
        };
        let (start, end) = (accel(i - 1), accel(i));
        for sub in 0..SUBSTEPS {
            let w0 = sub as f64 / SUBSTEPS as f64;
            let w1 = (sub + 1) as f64 / SUBSTEPS as f64;
            let f0 = start + (end - start) * w0;
            let f1 = start + (end - start) * w1;
            state = stepper.step(&state, &f0, &f1);
        }
        deflection.push(state.fixed_rows::<3>(0).into_owned());
    }

    let axis = |source: &Channel, direction: &str, index: usize| -> Result<Channel> {
        let code = source.code.set(&[
            (CodeField::FineLocation1, "DA"),
            (CodeField::FineLocation2, "MA"),
            (CodeField::Direction, direction),
        ])?;
        let values = deflection.iter().map(|d| BETA * d[index].abs()).collect();
        let info = calculation_info(&Info::new(), &[aa_x, aa_y, aa_z]);
        Ok(Channel::from_parts(code, time.clone(), values, Unit::dimensionless(), info))
    };
    let x = axis(aa_x, "X", 0)?;
    let y = axis(aa_y, "Y", 1)?;
    let z = axis(aa_z, "Z", 2)?;
    let resultant = resultant(&[&x, &y, &z])?;
    Ok(Damage { x, y, z, resultant })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::code::Code;

    fn aa(direction: char, value: f64) -> Channel {
        let time: Vec<f64> = (0..1001).map(|i| i as f64 * 1e-4).collect();
        let code = Code::new(&format!("11HEAD0000H3AA{direction}A")).unwrap();
        Channel::new(code, time, vec![value; 1001], Some(Unit::parse("rad/s^2").unwrap())).unwrap()
    }

    #[test]
    fn test_zero_input() {
        let result = damage(&aa('X', 0.0), &aa('Y', 0.0), &aa('Z', 0.0)).unwrap();
        assert!(result.resultant.values().iter().all(|&v| v == 0.0));
        assert_eq!(result.x.code.as_str(), "11HEADDAMAH3AAXA");
        assert_eq!(result.resultant.code.direction(), "R");
    }

    #[test]
    fn test_uncoupled_axis_matches_closed_form() {
        // y is decoupled (k_xy = k_yz = 0): δ'' + c δ' + k δ = a from rest
        let amplitude = 5000.0;
        let result = damage(&aa('X', 0.0), &aa('Y', amplitude), &aa('Z', 0.0)).unwrap();

        let k = K_YY;
        let c = A1 * K_YY;
        let disc = (c * c - 4.0 * k).sqrt();
        let r1 = (-c + disc) / 2.0;
        let r2 = (-c - disc) / 2.0;
        let t = 0.1;
        let expected = amplitude / k * (1.0 - (r2 * (r1 * t).exp() - r1 * (r2 * t).exp()) / (r2 - r1));

        let last = *result.y.values().last().unwrap();
        assert!((last - BETA * expected).abs() / (BETA * expected) < 1e-3, "{last} vs {}", BETA * expected);
        assert!(result.x.values().iter().all(|&v| v.abs() < 1e-15));
    }

    #[test]
    fn test_maximum() {
        let result = damage(&aa('X', 1000.0), &aa('Y', 0.0), &aa('Z', 0.0)).unwrap();
        let max = result.maximum("X").unwrap().unwrap();
        assert_eq!(max.code.filter_class(), "X");
        assert_eq!(max.values()[0], *result.x.values().last().unwrap());
        assert!(result.maximum("Q").unwrap().is_none());
        // x couples into z through k_xz
        assert!(result.z.values().last().unwrap() > &0.0);
    }
}
