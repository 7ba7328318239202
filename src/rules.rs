//! Calculation rules consulted by the resolver.
//!
//! Each [`Rule`] is a predicate on the requested code, a builder for the
//! prerequisite patterns (one or more alternative sets, tried in order) and
//! a pure compute function. [`RULES`] is evaluated top to bottom; the first
//! rule whose prerequisites resolve and whose computation yields a channel
//! wins.

use crate::calculate::{
    self, bric, damage, envelope, hic, length_to_displacement, neck_moment, olc, peak, peak_of_peaks, thor_position,
    tibia_index, viscous_criterion, xms, BricMethod, Envelope, NeckMoment, Peak, XmsMethod,
};
use crate::calculate::irtracc::{thor_offset, Axis, THOR_DUMMIES};
use crate::calculate::neck::neck_moment_peak;
use crate::calculate::olc::{FREE_FLIGHT_DISPLACEMENT, RESTRAINING_DISPLACEMENT};
use crate::calculate::tibia::TIBIA_INDEX_DUMMIES;
use crate::data::channel::{time_intersect, Channel};
use crate::data::code::{Code, CodeField as F};
use crate::data::pattern::glob_match;
use crate::data::unit::Unit;
use crate::error::{Error, Result};

/// Alternative prerequisite sets; all patterns of one set must resolve.
pub type Inputs = Vec<Vec<Code>>;

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&Code) -> bool,
    pub inputs: fn(&Code) -> Result<Inputs>,
    pub compute: fn(&Code, &[Channel]) -> Result<Option<Channel>>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

pub static RULES: &[Rule] = &[
    Rule {
        name: "resultant",
        applies: |p| p.direction() == "R" && p.filter_class() != "X",
        inputs: resultant_inputs,
        compute: |_, c| Ok(Some(calculate::resultant(&refs(c))?)),
    },
    Rule {
        name: "BrIC",
        applies: |p| p.main_location() == "BRIC" && p.filter_class() == "X",
        inputs: bric_inputs,
        compute: |_, c| Ok(Some(bric(&c[0], &c[1], &c[2], BricMethod::default())?)),
    },
    Rule {
        name: "HIC",
        applies: |p| {
            p.main_location() == "HICR"
                && p.filter_class() == "X"
                && p.fine_location_2().chars().all(|c| c.is_ascii_digit())
        },
        inputs: hic_inputs,
        compute: hic_compute,
    },
    Rule {
        name: "xms",
        applies: |p| glob_match(p.fine_location_2(), "[0-9][CS]") && p.filter_class() == "X",
        inputs: |p| one(p.set(&[(F::FineLocation2, "00"), (F::FilterClass, "A")])?),
        compute: xms_compute,
    },
    Rule {
        name: "DAMAGE",
        applies: |p| {
            p.fine_location_1() == "DA" && p.fine_location_2() == "MA" && matches!(p.direction(), "X" | "Y" | "Z" | "R")
        },
        inputs: damage_inputs,
        compute: damage_compute,
    },
    Rule {
        name: "neck moment transfer",
        applies: |p| {
            p.main_location() == "TMON" && NeckMoment::from_code_fields(p.fine_location_1(), p.direction()).is_some()
        },
        inputs: neck_inputs,
        compute: neck_compute,
    },
    Rule {
        name: "shoulder lateral force envelope",
        applies: |p| {
            p.main_location() == "SHLD"
                && p.fine_location_1() == "00"
                && p.physical_dimension() == "FO"
                && p.direction() == "Y"
        },
        inputs: |p| Ok(vec![siblings(p, F::FineLocation1, &["LE", "RI"])?]),
        compute: |p, c| sibling_envelope(p, c, Envelope::MaxAbs),
    },
    Rule {
        name: "viscous criterion envelope",
        applies: |p| {
            matches!(p.main_location(), "VCCR" | "VCAR") && (p.fine_location_1() == "00" || p.fine_location_2() == "00")
        },
        inputs: vc_envelope_inputs,
        compute: vc_envelope_compute,
    },
    Rule {
        name: "viscous criterion",
        applies: |p| matches!(p.main_location(), "VCCR" | "VCAR"),
        inputs: vc_inputs,
        compute: vc_compute,
    },
    Rule {
        name: "acetabulum force envelope",
        applies: |p| {
            p.main_location() == "ACTB"
                && p.fine_location_1() == "00"
                && p.fine_location_2() == "00"
                && p.physical_dimension() == "FO"
                && p.direction() == "R"
        },
        inputs: |p| Ok(vec![siblings(p, F::FineLocation1, &["LE", "RI"])?]),
        compute: |p, c| sibling_envelope(p, c, Envelope::Min),
    },
    Rule {
        name: "femur force envelope",
        applies: |p| {
            p.main_location() == "FEMR"
                && p.fine_location_1() == "00"
                && p.fine_location_2() == "00"
                && p.physical_dimension() == "FO"
                && p.direction() == "Z"
        },
        inputs: |p| Ok(vec![siblings(p, F::FineLocation1, &["LE", "RI"])?]),
        compute: |p, c| sibling_envelope(p, c, Envelope::Min),
    },
    Rule {
        name: "knee slider envelope",
        applies: |p| {
            p.main_location() == "KNSL"
                && p.fine_location_1() == "00"
                && p.fine_location_2() == "00"
                && matches!(p.physical_dimension(), "FO" | "DS")
                && p.direction() == "X"
        },
        inputs: |p| Ok(vec![siblings(p, F::FineLocation1, &["LE", "RI"])?]),
        compute: |p, c| sibling_envelope(p, c, Envelope::Min),
    },
    Rule {
        name: "tibia index envelope",
        applies: |p| {
            p.main_location() == "TIIN"
                && (p.fine_location_1() == "00" || p.fine_location_2() == "00")
                && p.physical_dimension() == "00"
                && p.direction() == "0"
        },
        inputs: left_right_or_upper_lower,
        compute: |p, c| sibling_envelope(p, c, Envelope::Max),
    },
    Rule {
        name: "tibia force envelope",
        applies: |p| {
            p.main_location() == "TIBI"
                && (p.fine_location_1() == "00" || p.fine_location_2() == "00")
                && p.physical_dimension() == "FO"
                && p.direction() == "Z"
        },
        inputs: left_right_or_upper_lower,
        compute: |p, c| sibling_envelope(p, c, Envelope::Min),
    },
    Rule {
        name: "tibia index",
        applies: |p| p.main_location() == "TIIN" && p.physical_dimension() == "00" && p.direction() == "0",
        inputs: |p| {
            Ok(vec![vec![
                p.set(&[(F::MainLocation, "TIBI"), (F::PhysicalDimension, "MO"), (F::Direction, "X")])?,
                p.set(&[(F::MainLocation, "TIBI"), (F::PhysicalDimension, "MO"), (F::Direction, "Y")])?,
                p.set(&[(F::MainLocation, "TIBI"), (F::PhysicalDimension, "FO"), (F::Direction, "Z")])?,
            ]])
        },
        compute: |_, c| {
            if !c.iter().all(|c| TIBIA_INDEX_DUMMIES.contains(&c.code.fine_location_3())) {
                return Ok(None);
            }
            Ok(Some(tibia_index(&c[0], &c[1], &c[2])?))
        },
    },
    Rule {
        name: "THOR IR-TRACC deflection envelope",
        applies: |p| {
            matches!(p.main_location(), "CHST" | "ABDO")
                && p.fine_location_1() == "00"
                && p.fine_location_2() == "00"
                && p.physical_dimension() == "DS"
        },
        inputs: |p| {
            let locations: &[(&str, &str)] = if p.main_location() == "CHST" {
                &[("LE", "UP"), ("RI", "UP"), ("LE", "LO"), ("RI", "LO")]
            } else {
                &[("LE", "00"), ("RI", "00")]
            };
            let codes = locations
                .iter()
                .map(|(lateral, vertical)| p.set(&[(F::FineLocation1, *lateral), (F::FineLocation2, *vertical)]))
                .collect::<Result<Vec<_>>>()?;
            Ok(vec![codes])
        },
        compute: |p, c| {
            let fitted = |c: &Channel| matches!(c.code.fine_location_3(), "TH" | "T3" | "00" | "??");
            if !c.iter().all(fitted) {
                return Ok(None);
            }
            sibling_envelope(p, c, Envelope::Min)
        },
    },
    Rule {
        name: "THOR IR-TRACC position",
        applies: |p| is_thor_irtracc(p) && p.physical_dimension() == "DC" && Axis::from_letter(p.direction()).is_some(),
        inputs: |p| {
            let length = p.with(F::Direction, "0")?;
            let angle_z = p.set(&[(F::PhysicalDimension, "AN"), (F::Direction, "Z")])?;
            if p.direction() == "Y" {
                return Ok(vec![vec![length, angle_z]]);
            }
            let angle_y = p.set(&[(F::PhysicalDimension, "AN"), (F::Direction, "Y")])?;
            Ok(vec![vec![length, angle_z, angle_y]])
        },
        compute: thor_position_compute,
    },
    Rule {
        name: "THOR IR-TRACC displacement",
        applies: |p| {
            is_thor_irtracc(p) && p.physical_dimension() == "DS" && matches!(p.direction(), "0" | "X" | "Y" | "Z")
        },
        inputs: |p| one(p.with(F::PhysicalDimension, "DC")?),
        compute: |_, c| Ok(Some(length_to_displacement(&c[0])?)),
    },
    Rule {
        name: "WorldSID rib deflection envelope",
        applies: |p| {
            matches!(p.main_location(), "TRRI" | "ABRI")
                && p.fine_location_2() == "00"
                && is_worldsid(p)
                && p.physical_dimension() == "DS"
        },
        inputs: |p| {
            let ribs: &[&str] = if p.main_location() == "TRRI" { &["01", "02", "03"] } else { &["01", "02"] };
            Ok(vec![siblings(p, F::FineLocation2, ribs)?])
        },
        compute: |p, c| sibling_envelope(p, c, Envelope::Min),
    },
    Rule {
        name: "WorldSID IR-TRACC lateral length",
        applies: |p| {
            matches!(p.main_location(), "TRRI" | "ABRI")
                && is_worldsid(p)
                && p.physical_dimension() == "DC"
                && p.direction() == "Y"
        },
        inputs: |p| {
            Ok(vec![vec![
                p.set(&[(F::Direction, "0")])?,
                p.set(&[(F::PhysicalDimension, "AN"), (F::Direction, "Z")])?,
            ]])
        },
        compute: lateral_length_compute,
    },
    Rule {
        name: "WorldSID IR-TRACC displacement",
        applies: |p| matches!(p.main_location(), "TRRI" | "ABRI") && is_worldsid(p) && p.physical_dimension() == "DS",
        inputs: |p| one(p.with(F::PhysicalDimension, "DC")?),
        compute: |_, c| Ok(Some(length_to_displacement(&c[0])?)),
    },
    Rule {
        name: "OLC",
        applies: |p| p.fine_location_1() == "0O" && p.fine_location_2() == "LC" && p.physical_dimension() == "VE",
        inputs: |p| {
            let filter = if p.filter_class() == "X" { "A" } else { p.filter_class() };
            one(p.set(&[(F::FineLocation1, "??"), (F::FineLocation2, "??"), (F::FilterClass, filter)])?)
        },
        compute: |p, c| {
            let result = olc(&c[0], FREE_FLIGHT_DISPLACEMENT, RESTRAINING_DISPLACEMENT)?;
            Ok(Some(if p.filter_class() == "X" { result.value } else { result.visual }))
        },
    },
];

// ---------------------------------------------------------------------------
// Shared builders
// ---------------------------------------------------------------------------

fn one(code: Code) -> Result<Inputs> {
    Ok(vec![vec![code]])
}

fn refs(channels: &[Channel]) -> Vec<&Channel> {
    channels.iter().collect()
}

/// Filter class for prerequisites: `scalar` when a scalar (`X`) is requested.
fn input_filter<'a>(pattern: &'a Code, scalar: &'a str) -> &'a str {
    if pattern.filter_class() == "X" {
        scalar
    } else {
        pattern.filter_class()
    }
}

fn siblings(pattern: &Code, field: F, values: &[&str]) -> Result<Vec<Code>> {
    values.iter().map(|value| pattern.with(field, value)).collect()
}

fn left_right_or_upper_lower(pattern: &Code) -> Result<Inputs> {
    let mut alternatives = Vec::new();
    if pattern.fine_location_1() == "00" {
        alternatives.push(siblings(pattern, F::FineLocation1, &["LE", "RI"])?);
    }
    if pattern.fine_location_2() == "00" {
        alternatives.push(siblings(pattern, F::FineLocation2, &["UP", "LO"])?);
    }
    Ok(alternatives)
}

fn is_worldsid(pattern: &Code) -> bool {
    matches!(pattern.fine_location_3(), "WS" | "??")
}

/// Chest IR-TRACCs (left/right × upper/lower) or abdomen IR-TRACCs
/// (left/right) of a THOR dummy.
fn is_thor_irtracc(pattern: &Code) -> bool {
    let chest = pattern.main_location() == "CHST"
        && matches!(pattern.fine_location_1(), "LE" | "RI")
        && matches!(pattern.fine_location_2(), "UP" | "LO");
    let abdomen = pattern.main_location() == "ABDO"
        && matches!(pattern.fine_location_1(), "LE" | "RI")
        && pattern.fine_location_2() == "00";
    (chest || abdomen) && THOR_DUMMIES.contains(&pattern.fine_location_3())
}

/// Code of a combined channel: the first input with the fine locations the
/// pattern requests as `00` collapsed.
fn collapsed_code(pattern: &Code, first: &Channel) -> Result<Code> {
    let fields: Vec<(F, &str)> = [F::FineLocation1, F::FineLocation2]
        .into_iter()
        .filter(|&field| pattern.field(field) == "00")
        .map(|field| (field, "00"))
        .collect();
    first.code.set(&fields)
}

fn sibling_envelope(pattern: &Code, channels: &[Channel], mode: Envelope) -> Result<Option<Channel>> {
    let code = collapsed_code(pattern, &channels[0])?;
    Ok(Some(envelope(&refs(channels), mode, code)?))
}

// ---------------------------------------------------------------------------
// Rule bodies
// ---------------------------------------------------------------------------

fn resultant_inputs(pattern: &Code) -> Result<Inputs> {
    [["X", "Y", "Z"], ["1", "2", "3"]]
        .iter()
        .map(|directions| siblings(pattern, F::Direction, directions))
        .collect()
}

fn bric_inputs(pattern: &Code) -> Result<Inputs> {
    let axes = ["X", "Y", "Z"]
        .iter()
        .map(|direction| {
            pattern.set(&[
                (F::MainLocation, "HEAD"),
                (F::PhysicalDimension, "AV"),
                (F::Direction, *direction),
                (F::FilterClass, "D"),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(vec![axes])
}

fn hic_inputs(pattern: &Code) -> Result<Inputs> {
    one(pattern.set(&[
        (F::MainLocation, "HEAD"),
        (F::FineLocation1, "??"),
        (F::FineLocation2, "00"),
        (F::PhysicalDimension, "AC"),
        (F::FilterClass, "A"),
    ])?)
}

fn hic_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let window: f64 = pattern
        .fine_location_2()
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("HIC window '{}'", pattern.fine_location_2())))?;
    Ok(Some(hic(&inputs[0], window)?))
}

fn xms_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let mut chars = pattern.fine_location_2().chars();
    let duration = chars.next().and_then(|c| c.to_digit(10));
    let method = chars.next().and_then(XmsMethod::from_letter);
    match (duration, method) {
        (Some(duration), Some(method)) => Ok(Some(xms(&inputs[0], duration as f64, method)?)),
        _ => Ok(None),
    }
}

fn damage_inputs(pattern: &Code) -> Result<Inputs> {
    let filter = input_filter(pattern, "A");
    let axes = ["X", "Y", "Z"]
        .iter()
        .map(|direction| {
            pattern.set(&[
                (F::FineLocation1, "00"),
                (F::FineLocation2, "00"),
                (F::Direction, *direction),
                (F::FilterClass, filter),
            ])
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(vec![axes])
}

fn damage_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let result = damage(&inputs[0], &inputs[1], &inputs[2])?;
    if pattern.filter_class() == "X" {
        result.maximum(pattern.direction())
    } else {
        Ok(result.component(pattern.direction()).cloned())
    }
}

fn neck_inputs(pattern: &Code) -> Result<Inputs> {
    let Some(kind) = NeckMoment::from_code_fields(pattern.fine_location_1(), pattern.direction()) else {
        return Ok(Vec::new());
    };
    let filter = input_filter(pattern, "B");
    let moment = pattern.set(&[
        (F::MainLocation, "NECK"),
        (F::PhysicalDimension, "MO"),
        (F::Direction, kind.moment_direction()),
        (F::FilterClass, filter),
    ])?;
    let force = pattern.set(&[
        (F::MainLocation, "NECK"),
        (F::PhysicalDimension, "FO"),
        (F::Direction, kind.force_direction()),
        (F::FilterClass, filter),
    ])?;
    Ok(vec![vec![moment, force]])
}

fn neck_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let Some(kind) = NeckMoment::from_code_fields(pattern.fine_location_1(), pattern.direction()) else {
        return Ok(None);
    };
    let moment = neck_moment(kind, &inputs[0], &inputs[1], None)?;
    if pattern.filter_class() == "X" {
        Ok(Some(neck_moment_peak(kind, &moment)?))
    } else {
        Ok(Some(moment))
    }
}

fn vc_envelope_inputs(pattern: &Code) -> Result<Inputs> {
    let filter = input_filter(pattern, "C");
    let with_filter = |codes: Vec<Code>| -> Result<Vec<Code>> {
        codes.iter().map(|c| c.with(F::FilterClass, filter)).collect()
    };
    let mut alternatives = Vec::new();
    if pattern.fine_location_1() == "00" {
        alternatives.push(with_filter(siblings(pattern, F::FineLocation1, &["LE", "RI"])?)?);
    }
    if pattern.fine_location_2() == "00" {
        if pattern.main_location() == "VCAR" {
            alternatives.push(with_filter(siblings(pattern, F::FineLocation2, &["01", "02"])?)?);
        } else {
            alternatives.push(with_filter(siblings(pattern, F::FineLocation2, &["LO", "UP"])?)?);
            alternatives.push(with_filter(siblings(pattern, F::FineLocation2, &["01", "02", "03"])?)?);
        }
    }
    Ok(alternatives)
}

fn vc_envelope_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let code = collapsed_code(pattern, &inputs[0])?;
    if pattern.filter_class() == "X" {
        Ok(Some(peak_of_peaks(&refs(inputs), code.with(F::FilterClass, "X")?)?))
    } else {
        Ok(Some(envelope(&refs(inputs), Envelope::MaxAbs, code)?))
    }
}

fn vc_inputs(pattern: &Code) -> Result<Inputs> {
    let filter = input_filter(pattern, "C");
    let sources: [&str; 2] = if pattern.main_location() == "VCAR" { ["ABDO", "ABRI"] } else { ["CHST", "TRRI"] };
    sources
        .iter()
        .map(|source| {
            Ok(vec![pattern.set(&[
                (F::MainLocation, *source),
                (F::PhysicalDimension, "DS"),
                (F::FilterClass, filter),
            ])?])
        })
        .collect()
}

fn vc_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let vc = viscous_criterion(&inputs[0], None)?;
    if pattern.filter_class() == "X" {
        Ok(Some(peak(&vc, Peak::MaxAbs)?))
    } else {
        Ok(Some(vc))
    }
}

fn thor_position_compute(pattern: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let Some(axis) = Axis::from_letter(pattern.direction()) else {
        return Ok(None);
    };
    let offset = thor_offset(pattern.fine_location_2());
    let channel = thor_position(axis, &inputs[0], inputs.get(2), &inputs[1], offset)?;
    Ok(Some(channel))
}

/// Lateral IR-TRACC length `D0 · sin(θz)`.
fn lateral_length_compute(_: &Code, inputs: &[Channel]) -> Result<Option<Channel>> {
    let (length, angle) = (&inputs[0], &inputs[1]);
    let time = time_intersect(&[length, angle]);
    let d = length.get_data_at(&time, None)?;
    let theta = angle.get_data_at(&time, Some(&Unit::parse("rad")?))?;
    let values = d.iter().zip(&theta).map(|(d, t)| d * t.sin()).collect();
    let code = length.code.with(F::Direction, "Y")?;
    let channel = Channel::new(code, time, values, Some(length.unit.clone()))?;
    Ok(Some(channel.with_info(length.info.clone())))
}
