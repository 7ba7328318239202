use rusty_isomme::data::channel::time_intersect;
use rusty_isomme::{Channel, Code, Error, FilterMethod, Isomme, ResolveOptions, Unit};

fn grid(n: usize, dt: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 * dt).collect()
}

fn channel(code: &str, time: Vec<f64>, f: impl Fn(f64) -> f64, unit: &str) -> Channel {
    let values = time.iter().map(|&t| f(t)).collect();
    Channel::new(Code::new(code).unwrap(), time, values, Some(Unit::parse(unit).unwrap())).unwrap()
}

fn constant(code: &str, value: f64, unit: &str) -> Channel {
    channel(code, grid(501, 1e-4), |_| value, unit)
}

#[test]
fn resultant_head_acceleration() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11HEAD0000H3ACXA", 3.0, "g0"),
        constant("11HEAD0000H3ACYA", 4.0, "g0"),
        constant("11HEAD0000H3ACZA", 0.0, "g0"),
    ]);

    let resultant = isomme
        .get_channel(&["11HEAD0000H3ACRA"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(resultant.code.as_str(), "11HEAD0000H3ACRA");
    assert_eq!(resultant.time(), isomme.channels()[0].time());
    assert!(resultant.values().iter().all(|v| (v - 5.0).abs() < 1e-12));
}

#[test]
fn wildcard_pattern_is_resolved_in_result_code() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11HEAD0000H3ACXA", 3.0, "g0"),
        constant("11HEAD0000H3ACYA", 4.0, "g0"),
        constant("11HEAD0000H3ACZA", 0.0, "g0"),
    ]);
    let resultant = isomme
        .get_channel(&["11HEAD????H3ACRA"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(resultant.code.as_str(), "11HEAD0000H3ACRA");
}

#[test]
fn velocity_is_never_differentiated_when_disabled() {
    let mut isomme = Isomme::new("T1");
    isomme.push(channel("11CHST0000H3DSXC", grid(201, 1e-4), |t| 2.0 * t, "m"));
    let no_differentiation = ResolveOptions::default().with_differentiate(false);

    let velocity = isomme.get_channel(&["11CHST0000H3VEXC"], no_differentiation).unwrap();
    assert!(velocity.is_none());

    // with differentiation the displacement is used
    let velocity = isomme
        .get_channel(&["11CHST0000H3VEXC"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert!(velocity.values().iter().all(|v| (v - 2.0).abs() < 1e-9));

    // an acceleration channel is integrated instead
    isomme.push(constant("11CHST0000H3ACXC", 1.0, "g0"));
    let velocity = isomme
        .get_channel(&["11CHST0000H3VEXC"], no_differentiation)
        .unwrap()
        .unwrap();
    assert_eq!(velocity.code.as_str(), "11CHST0000H3VEXC");
    let m_s = Unit::parse("m/s").unwrap();
    let last = velocity.get_data(Some(&m_s)).unwrap()[500];
    assert!((last - 9.80665 * 0.05).abs() < 1e-9, "{last}");
}

#[test]
fn duplicates_keep_first_inserted() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11HEAD0000H3ACXA", 1.0, "g0"),
        constant("11HEAD0000H3ACXA", 2.0, "g0"),
    ]);
    isomme.delete_duplicates(false);
    assert_eq!(isomme.len(), 1);
    assert_eq!(isomme.channels()[0].values()[0], 1.0);
}

#[test]
fn hic15_of_constant_acceleration() {
    let mut isomme = Isomme::new("T1");
    isomme.push(constant("11HEAD0000H3ACRA", 100.0, "g0"));

    let hic = isomme
        .get_channel(&["11HICR0015H300RX"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(hic.code.as_str(), "11HICR0015H300RX");
    assert!(hic.is_scalar());
    // (15 ms) · (100 g)^2.5
    assert!((hic.values()[0] - 1500.0).abs() < 1.0, "{}", hic.values()[0]);
}

#[test]
fn hic_from_unfiltered_components() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11HEAD0000H3ACX0", 60.0, "g0"),
        constant("11HEAD0000H3ACY0", 80.0, "g0"),
        constant("11HEAD0000H3ACZ0", 0.0, "g0"),
    ]);
    let hic = isomme
        .get_channel(&["11HICR0015H300RX"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert!((hic.values()[0] - 1500.0).abs() < 5.0, "{}", hic.values()[0]);
}

#[test]
fn cfc_class_zero_is_identity() {
    let original = channel("11HEAD0000H3ACX0", grid(301, 1e-4), |t| (60.0 * t).sin(), "g0");
    for method in [FilterMethod::SaeJ211, FilterMethod::Iso6487Padded] {
        let copy = original.cfc('0', method).unwrap();
        assert_eq!(copy, original);
    }
}

#[test]
fn integrate_then_differentiate_round_trip() {
    let code = Code::new("11HEAD0000H3ACXA").unwrap();
    assert_eq!(code.integrate().unwrap().differentiate().unwrap(), code);

    let velocity = channel(
        "11HEAD0000H3VEXA",
        grid(2001, 1e-4),
        |t| (2.0 * std::f64::consts::PI * 10.0 * t).sin(),
        "m/s",
    );
    let back = velocity.integrate(0.0).unwrap().differentiate().unwrap();
    assert_eq!(back.code, velocity.code);
    for i in 1..velocity.len() - 1 {
        assert!((back.values()[i] - velocity.values()[i]).abs() < 1e-3, "sample {i}");
    }
}

#[test]
fn arithmetic_uses_time_intersection() {
    let a = channel("11HEAD0000H3ACXA", grid(11, 1.0), |t| t, "g0");
    let b = channel("11HEAD0000H3ACYA", (5..16).map(f64::from).collect(), |t| 2.0 * t, "g0");
    let sum = &a + &b;
    assert_eq!(sum.time(), time_intersect(&[&a, &b]).as_slice());
    assert_eq!(sum.time(), &[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    assert_eq!(sum.values()[0], 15.0);
}

#[test]
fn femur_envelope_is_filtered_on_demand() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11FEMRLE00H3FOZ0", -2000.0, "N"),
        constant("11FEMRRI00H3FOZ0", -3000.0, "N"),
    ]);
    let femur = isomme
        .get_channel(&["11FEMR0000H3FOZB"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(femur.code.as_str(), "11FEMR0000H3FOZB");
    assert!((femur.values()[250] + 3000.0).abs() < 1e-6);
}

#[test]
fn neck_moment_at_occipital_condyle() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11NECKUP00H3MOYB", 10.0, "Nm"),
        constant("11NECKUP00H3FOXB", 1.0, "kN"),
    ]);
    let mocy = isomme
        .get_channel(&["11TMONUP00H3MOYX"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(mocy.code.as_str(), "11TMONUP00H3MOYX");
    assert!((mocy.values()[0] - (10.0 - 17.78)).abs() < 1e-9);
}

#[test]
fn thor_chest_deflection_from_irtracc_lengths() {
    let mut isomme = Isomme::new("T1");
    for (location, rate) in [("LEUP", 1000.0), ("RIUP", 2000.0), ("LELO", 500.0), ("RILO", 3000.0)] {
        let code = format!("11CHST{location}THDC0C");
        isomme.push(channel(&code, grid(501, 1e-4), |t| 100.0 - rate * t, "mm"));
    }

    let deflection = isomme
        .get_channel(&["11CHST0000THDS0C"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(deflection.code.as_str(), "11CHST0000THDS0C");
    assert_eq!(deflection.values()[0], 0.0);
    assert!((deflection.values()[500] + 150.0).abs() < 1e-9, "{}", deflection.values()[500]);
}

#[test]
fn thor_irtracc_position_without_rotation() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11ABDOLE00THDC0C", 120.0, "mm"),
        constant("11ABDOLE00THANYC", 0.0, "rad"),
        constant("11ABDOLE00THANZC", 0.0, "rad"),
    ]);
    let x = isomme
        .get_channel(&["11ABDOLE00THDCXC"], ResolveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(x.code.as_str(), "11ABDOLE00THDCXC");
    assert!(x.values().iter().all(|v| (v - 120.0).abs() < 1e-12));
}

#[test]
fn unsupported_dummy_is_an_error() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11NECKUP00H3MOXB", 10.0, "Nm"),
        constant("11NECKUP00H3FOYB", 1.0, "kN"),
    ]);
    let result = isomme.get_channel(&["11TMONUP00H3MOXB"], ResolveOptions::default());
    assert!(matches!(result, Err(Error::UnsupportedDummy { .. })));
}

#[test]
fn get_channels_without_derivation() {
    let mut isomme = Isomme::new("T1");
    isomme.extend([
        constant("11HEAD0000H3ACXA", 1.0, "g0"),
        constant("11HEAD0000H3ACYA", 1.0, "g0"),
    ]);
    let channels = isomme
        .get_channels(&["11HEAD0000H3AC?A"], ResolveOptions::collection())
        .unwrap();
    assert_eq!(channels.len(), 2);
    assert!(isomme
        .get_channels(&["11HEAD0000H3VEXA"], ResolveOptions::collection())
        .unwrap()
        .is_empty());
}
