use super::Effect;
use crate::engine::block::{AudioBuffer, ProcessSpec};

/// Amplitude quantizer with sample-and-hold rate reduction.
pub struct Bitcrusher {
  bits: f32,     // 1..16
  factor: u32,   // 1..100
  step: f32,
  hold: Vec<f32>,
  cnt: u32,
}

impl Bitcrusher {
  pub fn new() -> Self {
    let mut b = Self { bits: 8.0, factor: 1, step: 0.0, hold: Vec::new(), cnt: 0 };
    b.set_bits(8.0);
    b
  }
  pub fn set_bits(&mut self, b: f32) {
    self.bits = b.clamp(1.0, 16.0);
    self.step = 1.0 / (2f32.powf(self.bits) - 1.0);
  }
  pub fn set_factor(&mut self, f: f32) { self.factor = f.clamp(1.0, 100.0).round() as u32; }
  pub fn bits(&self) -> f32 { self.bits }
  pub fn factor(&self) -> u32 { self.factor }

  #[inline]
  pub fn quantize(x: f32, step: f32) -> f32 { step * (x / step).round() }
}

impl Default for Bitcrusher {
  fn default() -> Self { Self::new() }
}

impl Effect for Bitcrusher {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.hold = vec![0.0; spec.channels];
    self.cnt = 0;
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    let chans = block.channels().min(self.hold.len());
    let mut cnt = self.cnt;
    for n in 0..block.frames() {
      if cnt == 0 {
        for ch in 0..chans { self.hold[ch] = Self::quantize(block.get(ch, n), self.step); }
        cnt = self.factor;
      }
      cnt -= 1;
      for ch in 0..chans { block.set(ch, n, self.hold[ch]); }
    }
    self.cnt = cnt;
  }

  fn reset(&mut self) {
    self.hold.fill(0.0);
    self.cnt = 0;
  }
}
