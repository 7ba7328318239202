use super::calculation_info;
use crate::data::channel::Channel;
use crate::data::code::CodeField;
use crate::data::info::Info;
use crate::data::unit::Unit;
use crate::error::Result;

/// Source of the critical angular velocities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BricMethod {
    /// Maximum principal strain.
    #[default]
    Mps,
    /// Cumulative strain damage measure.
    Csdm,
    /// Mean of both.
    Average,
}

impl BricMethod {
    /// Critical angular velocity per axis (x, y, z) in rad/s.
    pub fn critical_values(self) -> [f64; 3] {
        match self {
            BricMethod::Mps => [66.30, 53.80, 41.50],
            BricMethod::Csdm => [66.20, 59.10, 44.25],
            BricMethod::Average => [66.25, 56.45, 42.87],
        }
    }
}

/// Brain Injury Criterion from the three head angular velocities.
pub fn bric(av_x: &Channel, av_y: &Channel, av_z: &Channel, method: BricMethod) -> Result<Channel> {
    let rad_s = Unit::parse("rad/s")?;
    let critical = method.critical_values();

    let mut sum_sq = 0.0;
    for (channel, critical) in [av_x, av_y, av_z].into_iter().zip(critical) {
        let peak = channel
            .get_data(Some(&rad_s))?
            .into_iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));
        sum_sq += (peak / critical).powi(2);
    }

    let code = av_x.code.set(&[
        (CodeField::MainLocation, "BRIC"),
        (CodeField::PhysicalDimension, "00"),
        (CodeField::Direction, "0"),
        (CodeField::FilterClass, "X"),
    ])?;
    let mut info = calculation_info(&Info::new(), &[av_x, av_y, av_z]);
    let all_times = [av_x, av_y, av_z].into_iter().flat_map(|c| c.time().iter().copied());
    let (start, end) = all_times.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
    info.push(".Analysis start time", start).push(".Analysis end time", end);

    Ok(Channel::scalar(code, 0.0, sum_sq.sqrt(), Unit::dimensionless()).with_info(info))
}
