pub mod bitcrusher;
pub mod delay;
pub mod delay_line;
pub mod distortion;
pub mod mod_delay;
pub mod modulation;
pub mod oscillator;
pub mod phaser;
pub mod reverb;
pub mod ring_mod;
pub mod smooth;
pub mod tremolo;
pub mod widener;

use super::block::{AudioBuffer, ProcessSpec};

/// Per-block transform shared by every module in the chain.
///
/// `prepare` is the only place a module may allocate. `process` runs on the
/// audio thread and must not allocate, lock or fail.
pub trait Effect {
  fn prepare(&mut self, spec: &ProcessSpec);
  fn process(&mut self, block: &mut AudioBuffer);
  fn reset(&mut self);
  /// Jump ramped controls straight to their targets.
  fn settle(&mut self) {}
  /// How long the module keeps ringing after input stops.
  fn tail_seconds(&self) -> f32 { 0.0 }
}

#[inline]
pub(crate) fn ms_to_samples(ms: f32, sr: f32) -> f32 { ms * sr / 1000.0 }
