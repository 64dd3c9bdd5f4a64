use super::{oscillator::Oscillator, smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

const STAGES: usize = 4;
const FC_LO: f32 = 200.0;
const FC_HI: f32 = 2000.0;
const SMOOTH_MS: f32 = 10.0;

#[derive(Clone, Copy)]
pub struct AP {
  zm1: f32,
}
impl AP {
  pub fn new() -> Self {
    Self { zm1: 0.0 }
  }
  /// First-order all-pass coefficient for corner frequency `fc`.
  #[inline]
  pub fn coef(fc: f32, sr: f32) -> f32 {
    let w = (core::f32::consts::PI * (fc / sr).min(0.49)).tan();
    (1.0 - w) / (1.0 + w)
  }
  #[inline]
  pub fn tick(&mut self, x: f32, a1: f32) -> f32 {
    let y = -a1 * x + self.zm1;
    self.zm1 = x + a1 * y;
    y
  }
}

/// Swept all-pass cascade with feedback and wet/dry mix.
///
/// Feedback takes the previous sample's cascade output, never the current one.
pub struct Phaser {
  ap: Vec<[AP; STAGES]>,
  last: Vec<f32>,
  lfo: Oscillator,
  sr: f32,
  depth: f32,
  feedback: f32,
  mix: f32,
  s_depth: Smooth,
  s_fb: Smooth,
  s_mix: Smooth,
}

impl Phaser {
  pub fn new() -> Self {
    let sr = 44_100.0;
    let mut lfo = Oscillator::new(sr);
    lfo.set_frequency(0.5);
    Self {
      ap: Vec::new(),
      last: Vec::new(),
      lfo,
      sr,
      depth: 0.5,
      feedback: 0.3,
      mix: 0.5,
      s_depth: Smooth::new(sr, SMOOTH_MS),
      s_fb: Smooth::new(sr, SMOOTH_MS),
      s_mix: Smooth::new(sr, SMOOTH_MS),
    }
  }
  pub fn set_rate(&mut self, hz: f32) { self.lfo.set_frequency(hz); }
  pub fn set_depth(&mut self, d: f32) { self.depth = d.clamp(0.0, 1.0); }
  pub fn set_feedback(&mut self, f: f32) { self.feedback = f.clamp(-0.9, 0.9); }
  pub fn set_mix(&mut self, m: f32) { self.mix = m.clamp(0.0, 1.0); }

  fn snap_controls(&mut self) {
    self.s_depth.snap(self.depth);
    self.s_fb.snap(self.feedback);
    self.s_mix.snap(self.mix);
  }
}

impl Default for Phaser {
  fn default() -> Self { Self::new() }
}

impl Effect for Phaser {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.sr = spec.sample_rate;
    self.ap = vec![[AP::new(); STAGES]; spec.channels];
    self.last = vec![0.0; spec.channels];
    self.lfo.set_sample_rate(self.sr);
    self.lfo.reset();
    for s in [&mut self.s_depth, &mut self.s_fb, &mut self.s_mix] { s.set_tau(spec.sample_rate, SMOOTH_MS); }
    self.snap_controls();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    let chans = block.channels().min(self.ap.len());
    for n in 0..block.frames() {
      let depth = self.s_depth.next(self.depth);
      let fb = self.s_fb.next(self.feedback);
      let mix = self.s_mix.next(self.mix);
      let modh = self.lfo.next_sample() * 0.5 + 0.5; // 0..1
      let fc = FC_LO + (FC_HI - FC_LO) * (0.1 + 0.9 * depth * modh);
      let a1 = AP::coef(fc, self.sr);
      for ch in 0..chans {
        let x = block.get(ch, n);
        let u = x + fb * self.last[ch];
        let y = self.ap[ch].iter_mut().fold(u, |s, ap| ap.tick(s, a1));
        self.last[ch] = y;
        block.set(ch, n, x * (1.0 - mix) + y * mix);
      }
    }
  }

  fn reset(&mut self) {
    for st in self.ap.iter_mut() { *st = [AP::new(); STAGES]; }
    self.last.fill(0.0);
    self.lfo.reset();
    self.snap_controls();
  }

  fn settle(&mut self) { self.snap_controls(); }

  fn tail_seconds(&self) -> f32 { 0.05 }
}
