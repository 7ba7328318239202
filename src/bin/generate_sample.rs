use std::f64::consts::PI;
use std::path::Path;

use anyhow::Result;

use rusty_isomme::data::loader::save_json;
use rusty_isomme::{Channel, Code, Isomme, Unit};

/// Half-sine pulse of `amplitude` between `start` and `start + duration`.
fn half_sine(t: f64, start: f64, duration: f64, amplitude: f64) -> f64 {
    if t < start || t > start + duration {
        0.0
    } else {
        amplitude * (PI * (t - start) / duration).sin()
    }
}

/// Deterministic measurement noise: a 64-bit LCG summed Irwin-Hall style
/// into an approximately normal sample.
struct SensorNoise(u64);

impl SensorNoise {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean sample with standard deviation `level`.
    fn sample(&mut self, level: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.uniform()).sum();
        level * (sum - 6.0)
    }
}

/// One sensor channel: a half-sine pulse plus measurement noise.
struct Sensor {
    code: &'static str,
    unit: &'static str,
    start: f64,
    duration: f64,
    amplitude: f64,
    noise: f64,
}

const SENSORS: &[Sensor] = &[
    Sensor { code: "11HEAD0000H3ACX0", unit: "g0", start: 0.030, duration: 0.040, amplitude: -55.0, noise: 0.8 },
    Sensor { code: "11HEAD0000H3ACY0", unit: "g0", start: 0.032, duration: 0.036, amplitude: 8.0, noise: 0.8 },
    Sensor { code: "11HEAD0000H3ACZ0", unit: "g0", start: 0.035, duration: 0.030, amplitude: 22.0, noise: 0.8 },
    Sensor { code: "11HEAD0000H3AVX0", unit: "rad/s", start: 0.030, duration: 0.060, amplitude: 6.0, noise: 0.05 },
    Sensor { code: "11HEAD0000H3AVY0", unit: "rad/s", start: 0.030, duration: 0.060, amplitude: 28.0, noise: 0.05 },
    Sensor { code: "11HEAD0000H3AVZ0", unit: "rad/s", start: 0.030, duration: 0.060, amplitude: 4.0, noise: 0.05 },
    Sensor { code: "11NECKUP00H3FOX0", unit: "N", start: 0.030, duration: 0.050, amplitude: -900.0, noise: 15.0 },
    Sensor { code: "11NECKUP00H3FOZ0", unit: "N", start: 0.030, duration: 0.050, amplitude: 1800.0, noise: 15.0 },
    Sensor { code: "11NECKUP00H3MOY0", unit: "Nm", start: 0.030, duration: 0.050, amplitude: 35.0, noise: 0.5 },
    Sensor { code: "11CHST0000H3DSX0", unit: "mm", start: 0.025, duration: 0.070, amplitude: -38.0, noise: 0.2 },
    Sensor { code: "11CHST0000H3ACX0", unit: "g0", start: 0.025, duration: 0.060, amplitude: -42.0, noise: 0.8 },
    Sensor { code: "11FEMRLE00H3FOZ0", unit: "N", start: 0.030, duration: 0.040, amplitude: -2500.0, noise: 20.0 },
    Sensor { code: "11FEMRRI00H3FOZ0", unit: "N", start: 0.031, duration: 0.040, amplitude: -3100.0, noise: 20.0 },
];

fn main() -> Result<()> {
    let mut noise = SensorNoise(42);

    // 10 kHz from -20 ms to 200 ms
    let time: Vec<f64> = (0..2201).map(|i| -0.02 + i as f64 * 1e-4).collect();

    let mut isomme = Isomme::new("SAMPLE-001");
    isomme
        .test_info
        .push("Laboratory name", "Sample lab")
        .push("Type of test", "Full width frontal")
        .push("Velocity test object 1", 56.0);
    isomme.channel_info.push("Number of channels", SENSORS.len() + 1);

    for sensor in SENSORS {
        let values = time
            .iter()
            .map(|&t| half_sine(t, sensor.start, sensor.duration, sensor.amplitude) + noise.sample(sensor.noise))
            .collect();
        let channel = Channel::new(Code::new(sensor.code)?, time.clone(), values, Some(Unit::parse(sensor.unit)?))?;
        isomme.push(channel);
    }

    // Vehicle velocity: 56 km/h brought to rest over ~80 ms
    let v0 = 56.0 / 3.6;
    let velocity = time
        .iter()
        .map(|&t| {
            let progress = (t / 0.08).clamp(0.0, 1.0);
            v0 * (1.0 - (PI / 2.0 * progress).sin()) + noise.sample(0.02)
        })
        .collect();
    isomme.push(Channel::new(
        Code::new("10VEHCCG0000VEX0")?,
        time.clone(),
        velocity,
        Some(Unit::parse("m/s")?),
    )?);

    let output_path = Path::new("sample_collection.json");
    save_json(&isomme, output_path)?;

    println!(
        "Wrote {} channels ({} samples each) to {}",
        isomme.len(),
        time.len(),
        output_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_reproducible_and_centred() {
        let mut a = SensorNoise(7);
        let mut b = SensorNoise(7);
        let samples: Vec<f64> = (0..10_000).map(|_| a.sample(1.0)).collect();
        assert!(samples.iter().all(|&s| s == b.sample(1.0)));
        assert!(samples.iter().all(|s| s.abs() <= 6.0));

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "{mean}");
        assert!((variance - 1.0).abs() < 0.1, "{variance}");
    }

    #[test]
    fn test_half_sine_support() {
        assert_eq!(half_sine(0.01, 0.02, 0.04, 50.0), 0.0);
        assert!((half_sine(0.04, 0.02, 0.04, 50.0) - 50.0).abs() < 1e-9);
        assert_eq!(half_sine(0.07, 0.02, 0.04, 50.0), 0.0);
    }
}
