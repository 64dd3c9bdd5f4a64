//! Multichannel ring buffer.
//!
//! Each channel has its own write cursor. `pop_fractional` reads behind the
//! cursor without moving it, `push` writes at the cursor and advances it, so
//! a pop/push pair per channel per frame keeps all cursors in lockstep.
//! Storage is allocated in `prepare` only.

pub struct DelayLine {
  bufs: Vec<Vec<f32>>,
  cursors: Vec<usize>,
  cap: usize,
}

impl DelayLine {
  pub fn new() -> Self {
    Self { bufs: Vec::new(), cursors: Vec::new(), cap: 0 }
  }

  /// Allocates room for delays up to and including `max_delay_samples`.
  pub fn prepare(&mut self, max_delay_samples: usize, channels: usize) {
    // one extra slot for the interpolation neighbour
    self.cap = max_delay_samples + 2;
    self.bufs = vec![vec![0.0; self.cap]; channels];
    self.cursors = vec![0; channels];
  }

  #[inline] pub fn capacity(&self) -> usize { self.cap }
  #[inline] pub fn channels(&self) -> usize { self.bufs.len() }

  /// Longest delay that can be read with interpolation.
  #[inline] pub fn max_delay(&self) -> usize { self.cap.saturating_sub(2) }

  /// Clamps a requested offset to `[1, max_delay]`. The flag is set when the
  /// request was longer than the buffer.
  #[inline]
  pub fn clamp_delay(&self, samples: f32) -> (f32, bool) {
    let max = self.max_delay().max(1) as f32;
    (samples.clamp(1.0, max), samples > max)
  }

  #[inline]
  pub fn push(&mut self, ch: usize, x: f32) {
    let c = self.cursors[ch];
    self.bufs[ch][c] = x;
    self.cursors[ch] = if c + 1 >= self.cap { 0 } else { c + 1 };
  }

  /// Reads `delay` samples behind the cursor. Whole-sample offsets are
  /// exact; anything between is linearly interpolated.
  #[inline]
  pub fn pop_fractional(&self, ch: usize, delay: f32) -> f32 {
    let Some(buf) = self.bufs.get(ch) else { return 0.0 };
    let (d, _) = self.clamp_delay(delay);
    let di = d as usize;
    let frac = d - di as f32;
    let c = self.cursors[ch] + self.cap;
    let a = buf[(c - di) % self.cap];
    let b = buf[(c - di - 1) % self.cap];
    a + (b - a) * frac
  }

  pub fn reset(&mut self) {
    for b in self.bufs.iter_mut() { b.fill(0.0); }
    for c in self.cursors.iter_mut() { *c = 0; }
  }
}

impl Default for DelayLine {
  fn default() -> Self { Self::new() }
}
