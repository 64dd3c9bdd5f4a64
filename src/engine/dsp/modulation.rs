use super::{oscillator::Oscillator, smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

const SMOOTH_MS: f32 = 10.0;

/// Sine amplitude modulation, `x · ((1 − depth) + depth · sin φ)`.
///
/// Unlike tremolo the gain swings negative, so full depth inverts the signal
/// on every other half-cycle. The phase advances once per frame and is shared
/// by all channels.
pub struct Modulation {
  lfo: Oscillator,
  depth: f32,
  s_depth: Smooth,
}

impl Modulation {
  pub fn new() -> Self {
    let mut lfo = Oscillator::new(44_100.0);
    lfo.set_frequency(2.0);
    let mut s_depth = Smooth::new(44_100.0, SMOOTH_MS);
    s_depth.snap(0.5);
    Self { lfo, depth: 0.5, s_depth }
  }
  pub fn set_rate(&mut self, hz: f32) { self.lfo.set_frequency(hz); }
  pub fn set_depth(&mut self, d: f32) { self.depth = d.clamp(0.0, 1.0); }
}

impl Default for Modulation {
  fn default() -> Self { Self::new() }
}

impl Effect for Modulation {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.lfo.set_sample_rate(spec.sample_rate);
    self.s_depth.set_tau(spec.sample_rate, SMOOTH_MS);
    self.reset();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    for n in 0..block.frames() {
      let depth = self.s_depth.next(self.depth);
      let g = (1.0 - depth) + depth * self.lfo.next_sample();
      for ch in 0..block.channels() { block.set(ch, n, block.get(ch, n) * g); }
    }
  }

  fn reset(&mut self) {
    self.lfo.reset();
    self.settle();
  }

  fn settle(&mut self) { self.s_depth.snap(self.depth); }
}
