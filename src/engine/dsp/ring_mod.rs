use super::{oscillator::Oscillator, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

/// Multiplies every channel by one shared LFO carrier.
pub struct RingMod {
  lfo: Oscillator,
  depth: f32,
}

impl RingMod {
  pub fn new() -> Self {
    let mut lfo = Oscillator::new(44_100.0);
    lfo.set_frequency(500.0);
    Self { lfo, depth: 1.0 }
  }
  pub fn set_rate(&mut self, hz: f32) { self.lfo.set_frequency(hz); }
  pub fn set_depth(&mut self, d: f32) { self.depth = d.clamp(0.0, 1.0); }
}

impl Default for RingMod {
  fn default() -> Self { Self::new() }
}

impl Effect for RingMod {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.lfo.set_sample_rate(spec.sample_rate);
    self.lfo.reset();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    let dry = 1.0 - self.depth;
    for n in 0..block.frames() {
      let carrier = self.depth * self.lfo.next_sample() + dry;
      for ch in 0..block.channels() { block.set(ch, n, block.get(ch, n) * carrier); }
    }
  }

  fn reset(&mut self) { self.lfo.reset(); }
}
