use super::{smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

const SMOOTH_MS: f32 = 10.0;

/// Soft clipper: `tanh(d·x)`, saturating to ±1 as drive rises.
///
/// `d = 0` would mute the signal, so a drive of exactly zero passes the
/// input through unchanged instead.
pub struct Distortion {
  drive: f32,
  s_drive: Smooth,
}

impl Distortion {
  pub fn new() -> Self {
    let mut s_drive = Smooth::new(44_100.0, SMOOTH_MS);
    s_drive.snap(1.0);
    Self { drive: 1.0, s_drive }
  }
  pub fn set_drive(&mut self, d: f32) { self.drive = d.clamp(0.0, 5.0); }
}

impl Default for Distortion {
  fn default() -> Self { Self::new() }
}

#[inline]
pub fn shape(x: f32, drive: f32) -> f32 {
  if drive <= 0.0 { return x; }
  (drive * x).tanh()
}

impl Effect for Distortion {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.s_drive.set_tau(spec.sample_rate, SMOOTH_MS);
    self.settle();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    for n in 0..block.frames() {
      let d = self.s_drive.next(self.drive);
      for ch in 0..block.channels() { block.set(ch, n, shape(block.get(ch, n), d)); }
    }
  }

  fn reset(&mut self) { self.settle(); }

  fn settle(&mut self) { self.s_drive.snap(self.drive); }
}
