use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Modules of the chain, in processing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleId {
  Bitcrusher,
  RingMod,
  Phaser,
  Flanger,
  Chorus,
  Tremolo,
  Delay,
  Reverb,
  Distortion,
  StereoWidener,
  Modulation,
}

impl ModuleId {
  pub const COUNT: usize = 11;

  /// Fixed processing order; never changes at run time.
  pub const ORDER: [ModuleId; Self::COUNT] = [
    ModuleId::Bitcrusher,
    ModuleId::RingMod,
    ModuleId::Phaser,
    ModuleId::Flanger,
    ModuleId::Chorus,
    ModuleId::Tremolo,
    ModuleId::Delay,
    ModuleId::Reverb,
    ModuleId::Distortion,
    ModuleId::StereoWidener,
    ModuleId::Modulation,
  ];

  #[inline] pub fn index(self) -> usize { self as usize }

  pub fn key(self) -> &'static str {
    match self {
      ModuleId::Bitcrusher => "bitcrusher",
      ModuleId::RingMod => "ringmod",
      ModuleId::Phaser => "phaser",
      ModuleId::Flanger => "flanger",
      ModuleId::Chorus => "chorus",
      ModuleId::Tremolo => "tremolo",
      ModuleId::Delay => "delay",
      ModuleId::Reverb => "reverb",
      ModuleId::Distortion => "distortion",
      ModuleId::StereoWidener => "widener",
      ModuleId::Modulation => "modulation",
    }
  }

  /// Key of the module's enable flag, e.g. `delay.enabled`.
  pub fn enabled_key(self) -> &'static str { ENABLED_KEYS[self.index()] }
}

const ENABLED_KEYS: [&str; ModuleId::COUNT] = [
  "bitcrusher.enabled",
  "ringmod.enabled",
  "phaser.enabled",
  "flanger.enabled",
  "chorus.enabled",
  "tremolo.enabled",
  "delay.enabled",
  "reverb.enabled",
  "distortion.enabled",
  "widener.enabled",
  "modulation.enabled",
];

/// Every continuous parameter of the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
  BitcrusherBits,
  BitcrusherDownsample,
  RingModRate,
  RingModDepth,
  PhaserRate,
  PhaserDepth,
  PhaserFeedback,
  PhaserMix,
  FlangerRate,
  FlangerDepth,
  FlangerFeedback,
  FlangerMix,
  ChorusRate,
  ChorusDepth,
  ChorusMix,
  TremoloRate,
  TremoloDepth,
  DelayTimeMs,
  DelayFeedback,
  DelayMix,
  ReverbRoomSize,
  ReverbDamping,
  ReverbWet,
  ReverbDry,
  ReverbWidth,
  DistortionDrive,
  WidenerWidth,
  ModulationRate,
  ModulationDepth,
}

impl ParamId {
  pub const COUNT: usize = 29;

  pub const ALL: [ParamId; Self::COUNT] = [
    ParamId::BitcrusherBits,
    ParamId::BitcrusherDownsample,
    ParamId::RingModRate,
    ParamId::RingModDepth,
    ParamId::PhaserRate,
    ParamId::PhaserDepth,
    ParamId::PhaserFeedback,
    ParamId::PhaserMix,
    ParamId::FlangerRate,
    ParamId::FlangerDepth,
    ParamId::FlangerFeedback,
    ParamId::FlangerMix,
    ParamId::ChorusRate,
    ParamId::ChorusDepth,
    ParamId::ChorusMix,
    ParamId::TremoloRate,
    ParamId::TremoloDepth,
    ParamId::DelayTimeMs,
    ParamId::DelayFeedback,
    ParamId::DelayMix,
    ParamId::ReverbRoomSize,
    ParamId::ReverbDamping,
    ParamId::ReverbWet,
    ParamId::ReverbDry,
    ParamId::ReverbWidth,
    ParamId::DistortionDrive,
    ParamId::WidenerWidth,
    ParamId::ModulationRate,
    ParamId::ModulationDepth,
  ];

  #[inline] pub fn index(self) -> usize { self as usize }
  #[inline] pub fn spec(self) -> &'static ParamSpec { &SPECS[self.index()] }
  #[inline] pub fn key(self) -> &'static str { self.spec().key }

  pub fn module(self) -> ModuleId {
    use ParamId::*;
    match self {
      BitcrusherBits | BitcrusherDownsample => ModuleId::Bitcrusher,
      RingModRate | RingModDepth => ModuleId::RingMod,
      PhaserRate | PhaserDepth | PhaserFeedback | PhaserMix => ModuleId::Phaser,
      FlangerRate | FlangerDepth | FlangerFeedback | FlangerMix => ModuleId::Flanger,
      ChorusRate | ChorusDepth | ChorusMix => ModuleId::Chorus,
      TremoloRate | TremoloDepth => ModuleId::Tremolo,
      DelayTimeMs | DelayFeedback | DelayMix => ModuleId::Delay,
      ReverbRoomSize | ReverbDamping | ReverbWet | ReverbDry | ReverbWidth => ModuleId::Reverb,
      DistortionDrive => ModuleId::Distortion,
      WidenerWidth => ModuleId::StereoWidener,
      ModulationRate | ModulationDepth => ModuleId::Modulation,
    }
  }
}

/// Range, default and UI mapping of one parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
  pub key: &'static str,
  pub min: f32,
  pub max: f32,
  pub default: f32,
  /// Legal-value grid for normalized input.
  pub step: f32,
  /// Exponent of the normalized mapping; below 1 spends more of the knob on
  /// the low end.
  pub skew: f32,
}

impl ParamSpec {
  const fn new(key: &'static str, min: f32, max: f32, default: f32, step: f32, skew: f32) -> Self {
    Self { key, min, max, default, step, skew }
  }

  /// Non-finite input falls back to the default.
  #[inline]
  pub fn clamp(&self, v: f32) -> f32 {
    if v.is_finite() { v.clamp(self.min, self.max) } else { self.default }
  }

  pub fn to_normalized(&self, v: f32) -> f32 {
    let p = (self.clamp(v) - self.min) / (self.max - self.min);
    p.powf(self.skew)
  }

  pub fn from_normalized(&self, p: f32) -> f32 {
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    let v = self.min + (self.max - self.min) * p.powf(1.0 / self.skew);
    self.snap(v)
  }

  fn snap(&self, v: f32) -> f32 {
    if self.step <= 0.0 { return self.clamp(v); }
    self.clamp(self.min + ((v - self.min) / self.step).round() * self.step)
  }
}

static SPECS: [ParamSpec; ParamId::COUNT] = [
  ParamSpec::new("bitcrusher.bits", 1.0, 16.0, 8.0, 1.0, 1.0),
  ParamSpec::new("bitcrusher.downsample", 1.0, 100.0, 1.0, 1.0, 1.0),
  ParamSpec::new("ringmod.rate", 0.1, 5000.0, 500.0, 0.1, 0.3),
  ParamSpec::new("ringmod.depth", 0.0, 1.0, 1.0, 0.01, 1.0),
  ParamSpec::new("phaser.rate", 0.01, 10.0, 0.5, 0.01, 0.5),
  ParamSpec::new("phaser.depth", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("phaser.feedback", -0.9, 0.9, 0.3, 0.01, 1.0),
  ParamSpec::new("phaser.mix", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("flanger.rate", 0.01, 10.0, 0.25, 0.01, 0.5),
  ParamSpec::new("flanger.depth", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("flanger.feedback", -0.9, 0.9, 0.5, 0.01, 1.0),
  ParamSpec::new("flanger.mix", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("chorus.rate", 0.01, 10.0, 1.0, 0.01, 0.5),
  ParamSpec::new("chorus.depth", 0.0, 1.0, 0.25, 0.01, 1.0),
  ParamSpec::new("chorus.mix", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("tremolo.rate", 0.1, 20.0, 5.0, 0.01, 0.5),
  ParamSpec::new("tremolo.depth", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("delay.time_ms", 1.0, 2000.0, 500.0, 1.0, 0.5),
  ParamSpec::new("delay.feedback", 0.0, 0.98, 0.3, 0.01, 1.0),
  ParamSpec::new("delay.mix", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("reverb.room_size", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("reverb.damping", 0.0, 1.0, 0.5, 0.01, 1.0),
  ParamSpec::new("reverb.wet", 0.0, 1.0, 0.33, 0.01, 1.0),
  ParamSpec::new("reverb.dry", 0.0, 1.0, 0.4, 0.01, 1.0),
  ParamSpec::new("reverb.width", 0.0, 1.0, 1.0, 0.01, 1.0),
  ParamSpec::new("distortion.drive", 0.0, 5.0, 1.0, 0.01, 1.0),
  ParamSpec::new("widener.width", 0.0, 2.0, 1.0, 0.01, 1.0),
  ParamSpec::new("modulation.rate", 0.1, 20.0, 2.0, 0.01, 0.5),
  ParamSpec::new("modulation.depth", 0.0, 1.0, 0.5, 0.01, 1.0),
];

/// A value as it appears in presets and string-keyed setters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
  Bool(bool),
  F32(f32),
}

/// What a string path resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKey {
  Param(ParamId),
  Enabled(ModuleId),
}

static PATHS: Lazy<HashMap<u64, (&'static str, ParamKey)>> = Lazy::new(|| {
  let mut m = HashMap::with_capacity(ParamId::COUNT + ModuleId::COUNT);
  for id in ParamId::ALL { m.insert(hash_path(id.key()), (id.key(), ParamKey::Param(id))); }
  for module in ModuleId::ORDER {
    m.insert(hash_path(module.enabled_key()), (module.enabled_key(), ParamKey::Enabled(module)));
  }
  m
});

/// Resolve `delay.time_ms`, `reverb.enabled` and friends.
pub fn lookup(path: &str) -> Option<ParamKey> {
  match PATHS.get(&hash_path(path)) {
    Some((name, key)) if *name == path => Some(*key),
    _ => None,
  }
}

#[inline]
fn fast_hash(s: &str) -> u64 {
  // FNV-1a 64-bit
  let mut hash: u64 = 0xcbf29ce484222325;
  for b in s.as_bytes() {
    hash ^= *b as u64;
    hash = hash.wrapping_mul(0x100000001b3);
  }
  hash
}

pub fn hash_path(path: &str) -> u64 { fast_hash(path) }

/// Complete parameter state of the chain.
///
/// Plain `Copy` data, so a snapshot crosses to the audio thread as a single
/// message and is never observed half-written.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainParams {
  values: [f32; ParamId::COUNT],
  enabled: [bool; ModuleId::COUNT],
}

impl Default for ChainParams {
  fn default() -> Self {
    let mut values = [0.0; ParamId::COUNT];
    for id in ParamId::ALL { values[id.index()] = id.spec().default; }
    Self { values, enabled: [false; ModuleId::COUNT] }
  }
}

impl ChainParams {
  #[inline] pub fn get(&self, id: ParamId) -> f32 { self.values[id.index()] }

  /// Stores the clamped value and returns it.
  pub fn set(&mut self, id: ParamId, v: f32) -> f32 {
    let v = id.spec().clamp(v);
    self.values[id.index()] = v;
    v
  }

  #[inline] pub fn is_enabled(&self, module: ModuleId) -> bool { self.enabled[module.index()] }
  #[inline] pub fn set_enabled(&mut self, module: ModuleId, on: bool) { self.enabled[module.index()] = on; }
}
