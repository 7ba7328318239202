use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Rational – exponent of a base dimension
// ---------------------------------------------------------------------------

/// Small normalised fraction used for dimension exponents (`m^1/2` etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i32,
    den: i32,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    /// `den` must be non-zero.
    pub fn new(num: i32, den: i32) -> Self {
        debug_assert!(den != 0, "zero denominator");
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i32;
        let sign = if den < 0 { -1 } else { 1 };
        Rational {
            num: sign * num / g,
            den: sign * den / g,
        }
    }

    pub fn integer(value: i32) -> Self {
        Rational { num: value, den: 1 }
    }

    /// Closest fraction with a denominator up to 12, or `None` if `value`
    /// is not representable that way.
    pub fn approximate(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        (1..=12).find_map(|den| {
            let num = value * den as f64;
            ((num - num.round()).abs() < 1e-9).then(|| Rational::new(num.round() as i32, den))
        })
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn add(self, other: Rational) -> Rational {
        Rational::new(self.num * other.den + other.num * self.den, self.den * other.den)
    }

    fn mul(self, other: Rational) -> Rational {
        Rational::new(self.num * other.num, self.den * other.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

// ---------------------------------------------------------------------------
// Unit – exponent vector over base dimensions plus a scale factor
// ---------------------------------------------------------------------------

/// Base dimensions in exponent-vector order.
const BASE_DIMENSIONS: [&str; 4] = ["length", "mass", "time", "angle"];

type Dimensions = [Rational; 4];

const STANDARD_GRAVITY: f64 = 9.80665;

/// Directly parseable symbols: (symbol, exponents [L, M, T, A], scale to SI).
const SYMBOLS: &[(&str, [i32; 4], f64)] = &[
    ("m", [1, 0, 0, 0], 1.0),
    ("mm", [1, 0, 0, 0], 1e-3),
    ("cm", [1, 0, 0, 0], 1e-2),
    ("km", [1, 0, 0, 0], 1e3),
    ("s", [0, 0, 1, 0], 1.0),
    ("ms", [0, 0, 1, 0], 1e-3),
    ("us", [0, 0, 1, 0], 1e-6),
    ("min", [0, 0, 1, 0], 60.0),
    ("h", [0, 0, 1, 0], 3600.0),
    ("kg", [0, 1, 0, 0], 1.0),
    ("g", [0, 1, 0, 0], 1e-3),
    ("g0", [1, 0, -2, 0], STANDARD_GRAVITY),
    ("gn", [1, 0, -2, 0], STANDARD_GRAVITY),
    ("N", [1, 1, -2, 0], 1.0),
    ("kN", [1, 1, -2, 0], 1e3),
    ("Nm", [2, 1, -2, 0], 1.0),
    ("J", [2, 1, -2, 0], 1.0),
    ("W", [2, 1, -3, 0], 1.0),
    ("Pa", [-1, 1, -2, 0], 1.0),
    ("kPa", [-1, 1, -2, 0], 1e3),
    ("bar", [-1, 1, -2, 0], 1e5),
    ("rad", [0, 0, 0, 1], 1.0),
    ("deg", [0, 0, 0, 1], std::f64::consts::PI / 180.0),
    ("Hz", [0, 0, -1, 0], 1.0),
];

/// Preferred names for results of unit algebra, tried in order.
const CANONICAL_NAMES: &[&str] = &[
    "1", "m", "mm", "s", "ms", "kg", "g0", "N", "kN", "Nm", "kPa", "rad", "deg", "m/s", "mm/s",
    "km/h", "m/s^2", "rad/s", "deg/s", "rad/s^2", "deg/s^2", "N*s", "m^2", "s^2", "1/s",
];

/// A physical unit: exponent vector over length, mass, time and angle plus
/// the factor converting one of it into the coherent SI unit.
///
/// `PartialEq` compares dimensions and scale; use
/// [`Unit::is_same_physical_type`] to ignore the scale.
#[derive(Debug, Clone)]
pub struct Unit {
    dims: Dimensions,
    scale: f64,
    symbol: String,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Unit {
            dims: [Rational::ZERO; 4],
            scale: 1.0,
            symbol: "1".to_string(),
        }
    }

    /// Standard gravity g₀ as an acceleration unit.
    pub fn standard_gravity() -> Self {
        Unit {
            dims: dims_from([1, 0, -2, 0]),
            scale: STANDARD_GRAVITY,
            symbol: "g0".to_string(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        text.parse()
    }

    /// Parse a unit as found in channel files, where a bare `g` on an
    /// acceleration channel means standard gravity rather than gram.
    pub fn parse_for_dimension(text: &str, physical_dimension: &str) -> Result<Self> {
        if text.trim() == "g" && physical_dimension == "AC" {
            return Ok(Unit::standard_gravity());
        }
        text.parse()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.iter().all(Rational::is_zero)
    }

    /// Two units are of the same physical type if their dimension vectors agree.
    pub fn is_same_physical_type(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Human-readable physical type (`"acceleration"`, `"force"`, ...).
    pub fn physical_type(&self) -> String {
        let known: &[([i32; 4], &str)] = &[
            ([0, 0, 0, 0], "dimensionless"),
            ([1, 0, 0, 0], "length"),
            ([0, 1, 0, 0], "mass"),
            ([0, 0, 1, 0], "time"),
            ([0, 0, 0, 1], "angle"),
            ([1, 0, -1, 0], "velocity"),
            ([1, 0, -2, 0], "acceleration"),
            ([0, 0, -1, 1], "angular velocity"),
            ([0, 0, -2, 1], "angular acceleration"),
            ([1, 1, -2, 0], "force"),
            ([2, 1, -2, 0], "moment"),
            ([-1, 1, -2, 0], "pressure"),
            ([0, 0, -1, 0], "frequency"),
        ];
        known
            .iter()
            .find(|(exps, _)| dims_from(*exps) == self.dims)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| {
                self.dims
                    .iter()
                    .zip(BASE_DIMENSIONS)
                    .filter(|(e, _)| !e.is_zero())
                    .map(|(e, name)| format!("{name}^{e}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
    }

    /// Factor `f` such that `value_in_self * f == value_in_other`.
    pub fn conversion_factor(&self, other: &Unit) -> Result<f64> {
        if !self.is_same_physical_type(other) {
            return Err(Error::IncompatibleUnits {
                from: self.symbol.clone(),
                to: other.symbol.clone(),
            });
        }
        Ok(self.scale / other.scale)
    }

    /// Convert a slice of values from `self` into `other`.
    pub fn convert(&self, values: &[f64], other: &Unit) -> Result<Vec<f64>> {
        let factor = self.conversion_factor(other)?;
        Ok(values.iter().map(|v| v * factor).collect())
    }

    pub fn powr(&self, exponent: Rational) -> Unit {
        let mut dims = self.dims;
        for d in &mut dims {
            *d = d.mul(exponent);
        }
        let symbol = if exponent == Rational::ONE {
            self.symbol.clone()
        } else {
            format!("{}^{}", wrap(&self.symbol), wrap(&exponent.to_string()))
        };
        Unit {
            dims,
            scale: self.scale.powf(exponent.as_f64()),
            symbol,
        }
        .canonical()
    }

    /// Power with a floating exponent; fails if the exponent is not a simple fraction.
    pub fn powf(&self, exponent: f64) -> Result<Unit> {
        Rational::approximate(exponent)
            .map(|e| self.powr(e))
            .ok_or_else(|| Error::UnitParse(format!("({})^{exponent}", self.symbol)))
    }

    /// Replace a composite symbol by a preferred name if one describes the same unit.
    fn canonical(mut self) -> Unit {
        if let Some(name) = CANONICAL_NAMES.iter().find(|name| {
            parse_expression(name)
                .map(|u| u.dims == self.dims && approx_eq(u.scale, self.scale))
                .unwrap_or(false)
        }) {
            self.symbol = name.to_string();
        }
        self
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && approx_eq(self.scale, other.scale)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_expression(s)
    }
}

impl Mul for &Unit {
    type Output = Unit;

    fn mul(self, rhs: &Unit) -> Unit {
        let mut dims = self.dims;
        for (d, r) in dims.iter_mut().zip(rhs.dims) {
            *d = d.add(r);
        }
        let symbol = match (self.is_dimensionless_one(), rhs.is_dimensionless_one()) {
            (true, _) => rhs.symbol.clone(),
            (_, true) => self.symbol.clone(),
            _ => format!("{}*{}", self.symbol, rhs.symbol),
        };
        Unit {
            dims,
            scale: self.scale * rhs.scale,
            symbol,
        }
        .canonical()
    }
}

impl Div for &Unit {
    type Output = Unit;

    fn div(self, rhs: &Unit) -> Unit {
        let mut dims = self.dims;
        for (d, r) in dims.iter_mut().zip(rhs.dims) {
            *d = d.add(r.mul(Rational::integer(-1)));
        }
        let symbol = if rhs.is_dimensionless_one() {
            self.symbol.clone()
        } else {
            format!("{}/{}", self.symbol, wrap(&rhs.symbol))
        };
        Unit {
            dims,
            scale: self.scale / rhs.scale,
            symbol,
        }
        .canonical()
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        &self * &rhs
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        &self / &rhs
    }
}

impl Unit {
    fn is_dimensionless_one(&self) -> bool {
        self.is_dimensionless() && approx_eq(self.scale, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse expressions such as `m/s^2`, `N*m`, `deg/s**2`, `1/s`, `km/h`.
fn parse_expression(text: &str) -> Result<Unit> {
    let cleaned = text.trim().replace("**", "^").replace('·', "*");
    if cleaned.is_empty() || cleaned == "1" {
        return Ok(Unit::dimensionless());
    }

    let mut dims = [Rational::ZERO; 4];
    let mut scale = 1.0;
    let mut dividing = false;
    let mut term = String::new();

    let mut apply = |term: &str, dividing: bool| -> Result<()> {
        let (factor_dims, factor_scale) = parse_term(term).ok_or_else(|| Error::UnitParse(text.to_string()))?;
        let sign = if dividing { -1 } else { 1 };
        for (d, f) in dims.iter_mut().zip(factor_dims) {
            *d = d.add(f.mul(Rational::integer(sign)));
        }
        scale *= if dividing { 1.0 / factor_scale } else { factor_scale };
        Ok(())
    };

    for c in cleaned.chars() {
        match c {
            '*' | '/' | ' ' => {
                if !term.is_empty() {
                    apply(&term, dividing)?;
                    term.clear();
                }
                match c {
                    '/' => dividing = true,
                    '*' => dividing = false,
                    _ => {}
                }
            }
            _ => term.push(c),
        }
    }
    if !term.is_empty() {
        apply(&term, dividing)?;
    } else {
        return Err(Error::UnitParse(text.to_string()));
    }

    Ok(Unit {
        dims,
        scale,
        symbol: text.trim().to_string(),
    })
}

fn parse_term(term: &str) -> Option<(Dimensions, f64)> {
    let (symbol, exponent) = match term.split_once('^') {
        Some((s, e)) => (s, parse_exponent(e)?),
        None => (term, Rational::ONE),
    };
    if symbol == "1" {
        return Some(([Rational::ZERO; 4], 1.0));
    }
    let (_, exps, scale) = SYMBOLS.iter().find(|(name, _, _)| *name == symbol)?;
    let mut dims = dims_from(*exps);
    for d in &mut dims {
        *d = d.mul(exponent);
    }
    Some((dims, scale.powf(exponent.as_f64())))
}

fn parse_exponent(text: &str) -> Option<Rational> {
    let text = text.trim_matches(|c| c == '(' || c == ')');
    match text.split_once('/') {
        Some((n, d)) => {
            let den: i32 = d.parse().ok()?;
            (den != 0).then(|| n.parse().ok().map(|num| Rational::new(num, den)))?
        }
        None => Rational::approximate(text.parse().ok()?),
    }
}

fn dims_from(exps: [i32; 4]) -> Dimensions {
    exps.map(Rational::integer)
}

fn wrap(symbol: &str) -> String {
    if symbol.contains(['*', '/', '^']) {
        format!("({symbol})")
    } else {
        symbol.to_string()
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}
