use super::calculation_info;
use crate::data::channel::{time_intersect, Channel};
use crate::data::code::CodeField;
use crate::error::{Error, Result};

/// Euclidean norm of 2 or 3 orthogonal components on their common time grid.
///
/// The result carries the first component's unit and code with direction `R`.
pub fn resultant(components: &[&Channel]) -> Result<Channel> {
    let [first, ..] = components else {
        return Err(Error::InvalidParameter("resultant of no channels".into()));
    };
    if !(2..=3).contains(&components.len()) {
        return Err(Error::InvalidParameter(format!(
            "resultant needs 2 or 3 components, got {}",
            components.len()
        )));
    }

    let time = time_intersect(components);
    let mut sum_sq = vec![0.0; time.len()];
    for component in components {
        let values = component.get_data_at(&time, Some(&first.unit))?;
        for (s, v) in sum_sq.iter_mut().zip(values) {
            *s += v * v;
        }
    }
    let values = sum_sq.into_iter().map(f64::sqrt).collect();

    let code = first.code.with(CodeField::Direction, "R")?;
    let info = calculation_info(&first.info, components);
    Ok(Channel::from_parts(code, time, values, first.unit.clone(), info))
}
