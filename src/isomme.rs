//! Channel collection of one crash test and the recursive channel resolver.
//!
//! ```text
//!   get_channel(pattern)
//!        │
//!        ├─ 1. existing channel matching the pattern
//!        ├─ 2. sibling with a lower filter class, filtered on demand
//!        ├─ 3. calculation rule (inputs resolved recursively)
//!        ├─ 4. integral of the pattern, differentiated
//!        └─ 5. derivative of the pattern, integrated
//! ```

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::config::{ResolveOptions, ResolverConfig};
use crate::data::channel::{create_sample, Channel, SampleMode};
use crate::data::code::{Code, CodeField};
use crate::data::filter::filter_class_rank;
use crate::data::info::{Info, MetadataValue};
use crate::data::unit::Unit;
use crate::error::{Error, Result};
use crate::rules::RULES;

// ---------------------------------------------------------------------------
// Isomme – the channel collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Isomme {
    pub test_number: String,
    pub test_info: Info,
    pub channel_info: Info,
    channels: Vec<Channel>,
    config: ResolverConfig,
}

impl Isomme {
    pub fn new(test_number: impl Into<String>) -> Self {
        Self {
            test_number: test_number.into(),
            ..Self::default()
        }
    }

    /// Use `config` for all resolutions. A configured codebook is installed
    /// process-wide, see [`ResolverConfig::install_codebook`].
    pub fn with_config(mut self, config: ResolverConfig) -> Result<Self> {
        config.install_codebook()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub fn push(&mut self, channel: Channel) -> &mut Self {
        self.channels.push(channel);
        self
    }

    pub fn extend(&mut self, channels: impl IntoIterator<Item = Channel>) -> &mut Self {
        self.channels.extend(channels);
        self
    }

    /// Append a synthetic channel (see [`create_sample`]).
    pub fn add_sample_channel(
        &mut self,
        code: &str,
        time_range: (f64, f64, usize),
        value_range: (f64, f64),
        mode: SampleMode,
        unit: &str,
    ) -> Result<&mut Self> {
        let channel = create_sample(Code::new(code)?, time_range, value_range, mode, Unit::parse(unit)?)?;
        Ok(self.push(channel))
    }

    pub fn get_test_info(&self, labels: &[&str]) -> Option<&MetadataValue> {
        self.test_info.get(labels)
    }

    pub fn get_channel_info(&self, labels: &[&str]) -> Option<&MetadataValue> {
        self.channel_info.get(labels)
    }

    /// Drop channels whose code already occurred earlier in the collection.
    ///
    /// With `filter_class_duplicates`, channels differing only in filter class
    /// are collapsed as well, keeping the least filtered one (first on ties).
    pub fn delete_duplicates(&mut self, filter_class_duplicates: bool) -> &mut Self {
        let before = self.channels.len();
        let mut seen = HashSet::new();
        self.channels.retain(|channel| seen.insert(channel.code.clone()));

        if filter_class_duplicates {
            let mut best: Vec<(Code, usize, usize)> = Vec::new();
            for (idx, channel) in self.channels.iter().enumerate() {
                let family = filter_family(&channel.code);
                let rank = filter_rank(&channel.code);
                match best.iter_mut().find(|(code, _, _)| *code == family) {
                    Some(entry) if rank < entry.2 => *entry = (family, idx, rank),
                    Some(_) => {}
                    None => best.push((family, idx, rank)),
                }
            }
            let keep: HashSet<usize> = best.into_iter().map(|(_, idx, _)| idx).collect();
            let mut idx = 0;
            self.channels.retain(|_| {
                idx += 1;
                keep.contains(&(idx - 1))
            });
        }

        let removed = before - self.channels.len();
        if removed > 0 {
            debug!("Removed {removed} duplicate channels");
        }
        self
    }

    /// First channel resolving one of `patterns`, tried in order.
    ///
    /// `Ok(None)` means the channel is not available. Errors are raised for
    /// configuration problems such as an unsupported dummy type.
    pub fn get_channel(&self, patterns: &[&str], options: ResolveOptions) -> Result<Option<Channel>> {
        let mut resolver = Resolver::new(self);
        for pattern in patterns {
            if let Some(channel) = resolver.resolve(pattern, options)? {
                return Ok(Some(channel));
            }
        }
        info!("No channel found for {patterns:?}");
        Ok(None)
    }

    /// Every existing channel matching `patterns`, plus filtered siblings and
    /// one calculated channel per pattern. Derivations are not deduplicated
    /// across patterns.
    pub fn get_channels(&self, patterns: &[&str], options: ResolveOptions) -> Result<Vec<Channel>> {
        let mut resolver = Resolver::new(self);
        let mut channels = Vec::new();
        for pattern in patterns {
            channels.extend(resolver.collect(pattern, options)?);
        }
        Ok(channels)
    }
}

impl<'a> IntoIterator for &'a Isomme {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

fn filter_family(code: &Code) -> Code {
    code.with(CodeField::FilterClass, "?").unwrap_or_else(|_| code.clone())
}

fn filter_rank(code: &Code) -> usize {
    code.filter_class().chars().next().map_or(usize::MAX, filter_class_rank)
}

// ---------------------------------------------------------------------------
// Resolver – one resolution call with its recursion stack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Frame {
    pattern: String,
    options: ResolveOptions,
    collect: bool,
}

#[derive(Debug, Clone, Copy)]
enum Derivation {
    Differentiate,
    Integrate,
}

struct Resolver<'a> {
    isomme: &'a Isomme,
    stack: Vec<Frame>,
}

impl<'a> Resolver<'a> {
    fn new(isomme: &'a Isomme) -> Self {
        Self {
            isomme,
            stack: Vec::new(),
        }
    }

    fn indent(&self) -> usize {
        self.stack.len() * 2
    }

    /// Push a frame unless it would recurse into itself or too deep.
    fn enter(&mut self, pattern: &str, options: ResolveOptions, collect: bool) -> bool {
        let frame = Frame {
            pattern: pattern.to_string(),
            options,
            collect,
        };
        if self.stack.contains(&frame) {
            debug!("{:w$}{pattern}: already being resolved", "", w = self.indent());
            return false;
        }
        if self.stack.len() >= self.isomme.config.max_depth {
            warn!("{pattern}: resolution depth limit {} reached", self.isomme.config.max_depth);
            return false;
        }
        self.stack.push(frame);
        true
    }

    fn resolve(&mut self, pattern: &str, options: ResolveOptions) -> Result<Option<Channel>> {
        if !self.enter(pattern, options, false) {
            return Ok(None);
        }
        let result = self.resolve_pattern(pattern, options);
        self.stack.pop();
        result
    }

    fn resolve_pattern(&mut self, pattern: &str, options: ResolveOptions) -> Result<Option<Channel>> {
        let w = self.indent();
        debug!("{:w$}{pattern}: {options:?}", "");

        if let Some(channel) = self.isomme.channels.iter().find(|c| c.code.matches(pattern)) {
            debug!("{:w$}found {}", "", channel.code);
            return Ok(Some(channel.clone()));
        }

        if options.filter {
            if let Some(channel) = self.filter_on_demand(pattern)? {
                debug!("{:w$}filtered to {}", "", channel.code);
                return Ok(Some(channel));
            }
        }

        let code = match Code::new(pattern) {
            Ok(code) => code,
            Err(e) => {
                debug!("{:w$}{e}", "");
                return Ok(None);
            }
        };

        if options.calculate {
            if let Some(channel) = self.calculate(&code)? {
                return Ok(Some(channel));
            }
        }
        if options.differentiate {
            if let Some(channel) = self.derive(&code, Derivation::Differentiate, options)? {
                return Ok(Some(channel));
            }
        }
        if options.integrate {
            if let Some(channel) = self.derive(&code, Derivation::Integrate, options)? {
                return Ok(Some(channel));
            }
        }

        debug!("{:w$}{pattern}: not available", "");
        Ok(None)
    }

    /// Filter the least filtered sibling of `pattern` to its filter class.
    fn filter_on_demand(&self, pattern: &str) -> Result<Option<Channel>> {
        let Some((sibling, target)) = filter_sibling(pattern) else {
            return Ok(None);
        };
        let source = self
            .isomme
            .channels
            .iter()
            .filter(|c| c.code.matches(&sibling) && can_filter_to(&c.code, target))
            .min_by_key(|c| filter_rank(&c.code));
        match source {
            Some(source) => self.filter(source, target),
            None => Ok(None),
        }
    }

    fn filter(&self, source: &Channel, target: char) -> Result<Option<Channel>> {
        match source.cfc(target, self.isomme.config.filter_method) {
            Ok(channel) => Ok(Some(channel)),
            Err(e @ Error::MissingSamplingInterval { .. }) => {
                warn!("{e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn calculate(&mut self, code: &Code) -> Result<Option<Channel>> {
        let w = self.indent();
        for rule in RULES.iter().filter(|rule| (rule.applies)(code)) {
            debug!("{:w$}rule '{}'", "", rule.name);
            'alternatives: for inputs in (rule.inputs)(code)? {
                let mut channels = Vec::with_capacity(inputs.len());
                for input in &inputs {
                    match self.resolve(input.as_str(), ResolveOptions::default())? {
                        Some(channel) => channels.push(channel),
                        None => continue 'alternatives,
                    }
                }
                if let Some(mut channel) = (rule.compute)(code, &channels)? {
                    channel.set_code(code.resolve_wildcards(&channel.code));
                    debug!("{:w$}calculated {}", "", channel.code);
                    return Ok(Some(channel));
                }
            }
        }
        Ok(None)
    }

    fn derive(&mut self, code: &Code, derivation: Derivation, options: ResolveOptions) -> Result<Option<Channel>> {
        let w = self.indent();
        let (source, options) = match derivation {
            Derivation::Differentiate => (code.integrate(), options.with_integrate(false)),
            Derivation::Integrate => (code.differentiate(), options.with_differentiate(false)),
        };
        let source = match source {
            Ok(source) => source,
            Err(e @ Error::DerivationNotPossible { .. }) => {
                debug!("{:w$}{e}", "");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some(channel) = self.resolve(source.as_str(), options)? else {
            return Ok(None);
        };
        match apply(&channel, derivation) {
            Ok(mut derived) => {
                derived.set_code(code.resolve_wildcards(&derived.code));
                debug!("{:w$}{derivation:?} {} to {}", "", channel.code, derived.code);
                Ok(Some(derived))
            }
            Err(e @ (Error::DerivationNotPossible { .. } | Error::Calculation(_))) => {
                debug!("{:w$}{e}", "");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// All channels `pattern` can stand for.
    fn collect(&mut self, pattern: &str, options: ResolveOptions) -> Result<Vec<Channel>> {
        if !self.enter(pattern, options, true) {
            return Ok(Vec::new());
        }
        let result = self.collect_pattern(pattern, options);
        self.stack.pop();
        result
    }

    fn collect_pattern(&mut self, pattern: &str, options: ResolveOptions) -> Result<Vec<Channel>> {
        let mut found: Vec<Channel> = self
            .isomme
            .channels
            .iter()
            .filter(|c| c.code.matches(pattern))
            .cloned()
            .collect();

        if options.filter {
            if let Some((sibling, target)) = filter_sibling(pattern) {
                for source in self.isomme.channels.iter() {
                    if !source.code.matches(&sibling) || !can_filter_to(&source.code, target) {
                        continue;
                    }
                    if let Some(channel) = self.filter(source, target)? {
                        push_new(&mut found, channel);
                    }
                }
            }
        }

        let Ok(code) = Code::new(pattern) else {
            return Ok(found);
        };

        if options.calculate {
            if let Some(channel) = self.resolve(pattern, options)? {
                push_new(&mut found, channel);
            }
        }
        for (enabled, derivation) in [
            (options.differentiate, Derivation::Differentiate),
            (options.integrate, Derivation::Integrate),
        ] {
            if !enabled {
                continue;
            }
            let (source, options) = match derivation {
                Derivation::Differentiate => (code.integrate(), options.with_integrate(false)),
                Derivation::Integrate => (code.differentiate(), options.with_differentiate(false)),
            };
            let Ok(source) = source else {
                continue;
            };
            for channel in self.collect(source.as_str(), options)? {
                match apply(&channel, derivation) {
                    Ok(derived) => push_new(&mut found, derived),
                    Err(e) => debug!("{:w$}{e}", "", w = self.indent()),
                }
            }
        }
        Ok(found)
    }
}

fn apply(channel: &Channel, derivation: Derivation) -> Result<Channel> {
    match derivation {
        Derivation::Differentiate => channel.differentiate(),
        Derivation::Integrate => channel.integrate(0.0),
    }
}

/// Pattern of channels that may be filtered to the filter class `pattern` asks for.
fn filter_sibling(pattern: &str) -> Option<(String, char)> {
    let target = pattern.chars().last().filter(|c| matches!(c, 'A' | 'B' | 'C' | 'D'))?;
    Some((format!("{}?", &pattern[..pattern.len() - 1]), target))
}

/// Only less filtered, non-scalar channels are filtered further.
fn can_filter_to(code: &Code, target: char) -> bool {
    let Some(class) = code.filter_class().chars().next() else {
        return false;
    };
    class != 'X' && filter_class_rank(class) < filter_class_rank(target)
}

fn push_new(channels: &mut Vec<Channel>, channel: Channel) {
    if !channels.contains(&channel) {
        channels.push(channel);
    }
}
