use crate::config::EngineConfig;
use crate::error::EngineError;

use super::block::{AudioBuffer, ProcessSpec};
use super::dsp::{
  bitcrusher::Bitcrusher,
  delay::Delay,
  distortion::Distortion,
  mod_delay::{Chorus, Flanger},
  modulation::Modulation,
  phaser::Phaser,
  reverb::{Reverb, ReverbRecycler},
  ring_mod::RingMod,
  tremolo::Tremolo,
  widener::StereoWidener,
  Effect,
};
use super::params::{ChainParams, ModuleId, ParamId};

/// The fixed-order effect chain.
///
/// Each module is a concrete field; dispatch walks `ModuleId::ORDER` and
/// skips disabled modules entirely, so a bypassed module's state is frozen
/// until it is enabled again or the chain is reset.
pub struct EffectChain {
  spec: ProcessSpec,
  params: ChainParams,
  bitcrusher: Bitcrusher,
  ring_mod: RingMod,
  phaser: Phaser,
  flanger: Flanger,
  chorus: Chorus,
  tremolo: Tremolo,
  delay: Delay,
  reverb: Reverb,
  distortion: Distortion,
  widener: StereoWidener,
  modulation: Modulation,
}

impl EffectChain {
  pub fn new(spec: &ProcessSpec, config: &EngineConfig) -> Result<Self, EngineError> {
    spec.validate()?;
    let config = config.sanitized();
    let mut chain = Self {
      spec: *spec,
      params: ChainParams::default(),
      bitcrusher: Bitcrusher::new(),
      ring_mod: RingMod::new(),
      phaser: Phaser::new(),
      flanger: Flanger::new(),
      chorus: Chorus::new(),
      tremolo: Tremolo::new(),
      delay: Delay::new(config.max_delay_ms),
      reverb: Reverb::new(),
      distortion: Distortion::new(),
      widener: StereoWidener::new(),
      modulation: Modulation::new(),
    };
    let defaults = chain.params;
    for id in ParamId::ALL { chain.apply_one(id, defaults.get(id)); }
    chain.prepare(spec)?;
    Ok(chain)
  }

  /// (Re)allocates every module for `spec` and clears all state.
  pub fn prepare(&mut self, spec: &ProcessSpec) -> Result<(), EngineError> {
    spec.validate()?;
    self.report_overruns();
    self.spec = *spec;
    for id in ModuleId::ORDER { self.module_mut(id).prepare(spec); }
    log::info!(
      "chain prepared: {} Hz, {} frames ({:.2} ms), {} ch, delay capacity {:.0} ms",
      spec.sample_rate,
      spec.max_block_size,
      spec.block_seconds() * 1000.0,
      spec.channels,
      self.delay.capacity_ms()
    );
    Ok(())
  }

  pub fn spec(&self) -> &ProcessSpec { &self.spec }
  pub fn params(&self) -> &ChainParams { &self.params }

  pub fn set_param(&mut self, id: ParamId, value: f32) {
    let v = self.params.set(id, value);
    self.apply_one(id, v);
  }

  pub fn set_enabled(&mut self, module: ModuleId, on: bool) { self.params.set_enabled(module, on); }
  pub fn set_bypassed(&mut self, module: ModuleId, bypassed: bool) { self.set_enabled(module, !bypassed); }
  pub fn is_enabled(&self, module: ModuleId) -> bool { self.params.is_enabled(module) }

  /// Take over a whole parameter set; only changed values reach the modules.
  pub fn apply_params(&mut self, params: &ChainParams) {
    for id in ParamId::ALL {
      let v = params.get(id);
      if v != self.params.get(id) { self.set_param(id, v); }
    }
    for module in ModuleId::ORDER { self.params.set_enabled(module, params.is_enabled(module)); }
  }

  /// Jump every ramped control to its current target.
  pub fn settle(&mut self) {
    for id in ModuleId::ORDER { self.module_mut(id).settle(); }
  }

  /// Runs enabled modules in order, in place. The block must not exceed the
  /// prepared channel count or block size.
  pub fn process(&mut self, block: &mut AudioBuffer) {
    for id in ModuleId::ORDER {
      if self.params.is_enabled(id) { self.module_mut(id).process(block); }
    }
  }

  /// Clears delay lines, oscillators, hold counters and tails without
  /// allocating.
  pub fn reset(&mut self) {
    for id in ModuleId::ORDER { self.module_mut(id).reset(); }
  }

  /// Longest tail among enabled modules.
  pub fn latency_seconds(&self) -> f32 {
    ModuleId::ORDER
      .iter()
      .filter(|&&id| self.params.is_enabled(id))
      .map(|&id| self.module(id).tail_seconds())
      .fold(0.0, f32::max)
  }

  /// Control-side handle that frees used reverb instances and supplies clean
  /// ones for in-cycle resets. Without it a second `reset` between two
  /// `prepare` calls leaves the reverb muted.
  pub fn reverb_recycler(&self) -> ReverbRecycler { self.reverb.recycler() }

  /// Delay-time requests clamped to the buffer since the last call.
  pub fn take_delay_overruns(&mut self) -> u32 { self.delay.take_overruns() }

  pub(crate) fn report_overruns(&mut self) {
    let n = self.delay.take_overruns();
    if n > 0 {
      log::warn!("{n} delay time request(s) exceeded the {:.0} ms buffer and were clamped", self.delay.capacity_ms());
    }
  }

  fn apply_one(&mut self, id: ParamId, v: f32) {
    use ParamId::*;
    match id {
      BitcrusherBits => self.bitcrusher.set_bits(v),
      BitcrusherDownsample => self.bitcrusher.set_factor(v),
      RingModRate => self.ring_mod.set_rate(v),
      RingModDepth => self.ring_mod.set_depth(v),
      PhaserRate => self.phaser.set_rate(v),
      PhaserDepth => self.phaser.set_depth(v),
      PhaserFeedback => self.phaser.set_feedback(v),
      PhaserMix => self.phaser.set_mix(v),
      FlangerRate => self.flanger.set_rate(v),
      FlangerDepth => self.flanger.set_depth(v),
      FlangerFeedback => self.flanger.set_feedback(v),
      FlangerMix => self.flanger.set_mix(v),
      ChorusRate => self.chorus.set_rate(v),
      ChorusDepth => self.chorus.set_depth(v),
      ChorusMix => self.chorus.set_mix(v),
      TremoloRate => self.tremolo.set_rate(v),
      TremoloDepth => self.tremolo.set_depth(v),
      DelayTimeMs => self.delay.set_time_ms(v),
      DelayFeedback => self.delay.set_feedback(v),
      DelayMix => self.delay.set_mix(v),
      ReverbRoomSize => self.reverb.set_room_size(v),
      ReverbDamping => self.reverb.set_damping(v),
      ReverbWet => self.reverb.set_wet(v),
      ReverbDry => self.reverb.set_dry(v),
      ReverbWidth => self.reverb.set_width(v),
      DistortionDrive => self.distortion.set_drive(v),
      WidenerWidth => self.widener.set_width(v),
      ModulationRate => self.modulation.set_rate(v),
      ModulationDepth => self.modulation.set_depth(v),
    }
  }

  fn module(&self, id: ModuleId) -> &dyn Effect {
    match id {
      ModuleId::Bitcrusher => &self.bitcrusher,
      ModuleId::RingMod => &self.ring_mod,
      ModuleId::Phaser => &self.phaser,
      ModuleId::Flanger => &self.flanger,
      ModuleId::Chorus => &self.chorus,
      ModuleId::Tremolo => &self.tremolo,
      ModuleId::Delay => &self.delay,
      ModuleId::Reverb => &self.reverb,
      ModuleId::Distortion => &self.distortion,
      ModuleId::StereoWidener => &self.widener,
      ModuleId::Modulation => &self.modulation,
    }
  }

  fn module_mut(&mut self, id: ModuleId) -> &mut dyn Effect {
    match id {
      ModuleId::Bitcrusher => &mut self.bitcrusher,
      ModuleId::RingMod => &mut self.ring_mod,
      ModuleId::Phaser => &mut self.phaser,
      ModuleId::Flanger => &mut self.flanger,
      ModuleId::Chorus => &mut self.chorus,
      ModuleId::Tremolo => &mut self.tremolo,
      ModuleId::Delay => &mut self.delay,
      ModuleId::Reverb => &mut self.reverb,
      ModuleId::Distortion => &mut self.distortion,
      ModuleId::StereoWidener => &mut self.widener,
      ModuleId::Modulation => &mut self.modulation,
    }
  }
}
