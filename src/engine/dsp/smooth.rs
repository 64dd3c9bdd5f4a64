/// One-pole exponential smoother for control values.
#[derive(Clone, Copy, Debug)]
pub struct Smooth { pub y: f32, a: f32 }

impl Smooth {
  pub fn new(sr: f32, ms: f32) -> Self {
    Self { y: 0.0, a: Self::coef(sr, ms) }
  }
  #[inline]
  fn coef(sr: f32, ms: f32) -> f32 { (-1.0 / (ms.max(0.01) * 0.001 * sr)).exp() }
  #[inline]
  pub fn set_tau(&mut self, sr: f32, ms: f32) { self.a = Self::coef(sr, ms); }
  /// Jump straight to `v`, skipping the ramp.
  #[inline]
  pub fn snap(&mut self, v: f32) { self.y = v; }
  /// Lands exactly on `target` once settled.
  #[inline]
  pub fn next(&mut self, target: f32) -> f32 { self.y = target + self.a * (self.y - target); self.y }
}
