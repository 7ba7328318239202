use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;

use rusty_isomme::data::loader::load_file;
use rusty_isomme::{Channel, Isomme, ResolveOptions, ResolverConfig};

const USAGE: &str = "usage: rusty-isomme <collection.json|.csv> [--config <resolver.json>] [--all] <pattern>...";

struct Args {
    collection: PathBuf,
    config: Option<PathBuf>,
    all: bool,
    patterns: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let collection = args.next().map(PathBuf::from).context(USAGE)?;
    let mut config = None;
    let mut all = false;
    let mut patterns = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(args.next().map(PathBuf::from).context("--config needs a file")?),
            "--all" => all = true,
            _ => patterns.push(arg),
        }
    }
    if patterns.is_empty() {
        bail!("{USAGE}");
    }
    Ok(Args {
        collection,
        config,
        all,
        patterns,
    })
}

fn load(path: &Path, config: Option<&Path>) -> Result<Isomme> {
    let config = match config {
        Some(path) => ResolverConfig::from_file(path).with_context(|| format!("reading {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    // channel codes are validated while loading
    config.install_codebook()?;
    let isomme = load_file(path).with_context(|| format!("loading {}", path.display()))?;
    info!("Loaded test '{}' with {} channels", isomme.test_number, isomme.len());
    Ok(isomme.with_config(config)?)
}

fn print_channel(channel: &Channel) {
    match channel.peak_abs() {
        Some((t, v)) if channel.is_scalar() => println!("{}  {v:.4} {}  (t = {t:.4} s)", channel.code, channel.unit),
        Some((t, v)) => println!(
            "{}  {} samples, peak {v:.4} {} at t = {t:.4} s",
            channel.code,
            channel.len(),
            channel.unit
        ),
        None => println!("{}  (empty)", channel.code),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let isomme = load(&args.collection, args.config.as_deref())?;

    for pattern in &args.patterns {
        if args.all {
            let channels = isomme.get_channels(&[pattern.as_str()], ResolveOptions::collection())?;
            if channels.is_empty() {
                println!("{pattern}  not available");
            }
            channels.iter().for_each(print_channel);
        } else {
            match isomme.get_channel(&[pattern.as_str()], ResolveOptions::default())? {
                Some(channel) => print_channel(&channel),
                None => println!("{pattern}  not available"),
            }
        }
    }
    Ok(())
}
