use super::{oscillator::Oscillator, smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

/// Gain ramp length; the LFO target is never applied as a step.
pub const RAMP_MS: f32 = 20.0;

/// LFO amplitude modulation through a smoothed gain stage.
pub struct Tremolo {
  lfo: Oscillator,
  depth: f32,
  gain: Smooth,
}

impl Tremolo {
  pub fn new() -> Self {
    let mut lfo = Oscillator::new(44_100.0);
    lfo.set_frequency(5.0);
    let mut gain = Smooth::new(44_100.0, RAMP_MS);
    gain.snap(1.0);
    Self { lfo, depth: 0.5, gain }
  }
  pub fn set_rate(&mut self, hz: f32) { self.lfo.set_frequency(hz); }
  pub fn set_depth(&mut self, d: f32) { self.depth = d.clamp(0.0, 1.0); }

  #[inline]
  fn target(&mut self) -> f32 { 1.0 - self.depth * ((self.lfo.next_sample() + 1.0) * 0.5) }
}

impl Default for Tremolo {
  fn default() -> Self { Self::new() }
}

impl Effect for Tremolo {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.lfo.set_sample_rate(spec.sample_rate);
    self.gain.set_tau(spec.sample_rate, RAMP_MS);
    self.reset();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    for n in 0..block.frames() {
      let t = self.target();
      let g = self.gain.next(t);
      for ch in 0..block.channels() { block.set(ch, n, block.get(ch, n) * g); }
    }
  }

  fn reset(&mut self) {
    self.lfo.reset();
    self.settle();
  }

  fn settle(&mut self) { self.gain.snap(1.0 - self.depth * ((self.lfo.value() + 1.0) * 0.5)); }
}
