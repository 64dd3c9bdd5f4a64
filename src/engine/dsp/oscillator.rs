use core::f32::consts::TAU;

/// Phase-accumulator LFO.
///
/// Phase is kept in radians in `[0, 2π)` and advances by `2π·f/sr` per call,
/// so frequency changes never jump the phase. The output is `shape(phase)`,
/// a sine unless another shaping function is supplied.
#[derive(Clone, Copy)]
pub struct Oscillator {
  phase: f32,
  start_phase: f32,
  inc: f32,
  freq: f32,
  sr: f32,
  shape: fn(f32) -> f32,
}

impl Oscillator {
  pub fn new(sr: f32) -> Self { Self::with_shape(sr, f32::sin) }

  pub fn with_shape(sr: f32, shape: fn(f32) -> f32) -> Self {
    Self { phase: 0.0, start_phase: 0.0, inc: 0.0, freq: 0.0, sr, shape }
  }

  /// Start (and reset) at a fixed phase offset, used for stereo spread.
  pub fn with_phase(mut self, phase: f32) -> Self {
    self.start_phase = phase.rem_euclid(TAU);
    self.phase = self.start_phase;
    self
  }

  pub fn set_sample_rate(&mut self, sr: f32) {
    self.sr = sr;
    self.set_frequency(self.freq);
  }

  pub fn set_frequency(&mut self, hz: f32) {
    self.freq = hz.max(0.0);
    self.inc = TAU * self.freq / self.sr;
  }

  #[inline] pub fn phase(&self) -> f32 { self.phase }
  /// Output at the current phase, without advancing.
  #[inline] pub fn value(&self) -> f32 { (self.shape)(self.phase) }

  #[inline]
  pub fn next_sample(&mut self) -> f32 {
    let y = (self.shape)(self.phase);
    self.phase += self.inc;
    if self.phase >= TAU { self.phase = self.phase.rem_euclid(TAU); }
    y
  }

  pub fn reset(&mut self) { self.phase = self.start_phase; }
}
