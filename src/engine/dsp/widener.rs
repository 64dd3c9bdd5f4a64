use super::{smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

const SMOOTH_MS: f32 = 10.0;

/// Mid/side width control. `0` folds to mono, `1` is unchanged, `2` doubles
/// the side signal. Anything other than a stereo block passes through.
pub struct StereoWidener {
  width: f32,
  s_width: Smooth,
}

impl StereoWidener {
  pub fn new() -> Self {
    let mut s_width = Smooth::new(44_100.0, SMOOTH_MS);
    s_width.snap(1.0);
    Self { width: 1.0, s_width }
  }
  pub fn set_width(&mut self, w: f32) { self.width = w.clamp(0.0, 2.0); }
}

impl Default for StereoWidener {
  fn default() -> Self { Self::new() }
}

impl Effect for StereoWidener {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.s_width.set_tau(spec.sample_rate, SMOOTH_MS);
    self.settle();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    let Some((left, right)) = block.stereo_mut() else { return };
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
      let w = self.s_width.next(self.width);
      let mid = 0.5 * (*l + *r);
      let side = 0.5 * (*l - *r) * w;
      *l = mid + side;
      *r = mid - side;
    }
  }

  fn reset(&mut self) { self.settle(); }

  fn settle(&mut self) { self.s_width.snap(self.width); }
}
