use super::{delay_line::DelayLine, ms_to_samples, smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

/// Fastest read-head drift when the time changes, in samples per sample.
const MAX_SLEW: f32 = 0.5;
const GAIN_SMOOTH_MS: f32 = 8.0;
const MAX_TAIL_S: f32 = 30.0;

/// Feedback tape delay.
///
/// Time changes move the interpolated read head at a bounded rate, so turning
/// the time knob bends pitch instead of clicking. With a steady time the read
/// lands exactly on whole samples.
pub struct Delay {
  line: DelayLine,
  sr: f32,
  max_ms: f32,
  time_ms: f32,
  feedback: f32,
  mix: f32,
  time_samp: f32,
  fb: Smooth,
  wet: Smooth,
  overruns: u32,
}

impl Delay {
  pub fn new(max_ms: f32) -> Self {
    let sr = 44_100.0;
    Self {
      line: DelayLine::new(),
      sr,
      max_ms: max_ms.max(1.0),
      time_ms: 500.0,
      feedback: 0.3,
      mix: 0.5,
      time_samp: 0.0,
      fb: Smooth::new(sr, GAIN_SMOOTH_MS),
      wet: Smooth::new(sr, GAIN_SMOOTH_MS),
      overruns: 0,
    }
  }

  pub fn set_time_ms(&mut self, ms: f32) {
    self.time_ms = ms.max(0.0);
    if self.line.capacity() > 0 && self.line.clamp_delay(ms_to_samples(self.time_ms, self.sr)).1 {
      self.overruns = self.overruns.saturating_add(1);
    }
  }
  pub fn set_feedback(&mut self, f: f32) { self.feedback = f.clamp(0.0, 0.98); }
  pub fn set_mix(&mut self, m: f32) { self.mix = m.clamp(0.0, 1.0); }

  /// Delay-time requests clamped to the buffer since the last call.
  pub fn take_overruns(&mut self) -> u32 { std::mem::take(&mut self.overruns) }

  pub fn capacity_ms(&self) -> f32 { self.line.max_delay() as f32 * 1000.0 / self.sr }

  #[inline]
  fn target_samples(&self) -> f32 {
    self.line.clamp_delay(ms_to_samples(self.time_ms, self.sr)).0
  }
}

impl Effect for Delay {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.sr = spec.sample_rate;
    let max = ms_to_samples(self.max_ms, self.sr).ceil() as usize;
    self.line.prepare(max, spec.channels);
    self.fb.set_tau(self.sr, GAIN_SMOOTH_MS);
    self.wet.set_tau(self.sr, GAIN_SMOOTH_MS);
    self.settle();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    let chans = block.channels().min(self.line.channels());
    let target = self.target_samples();
    for n in 0..block.frames() {
      self.time_samp += (target - self.time_samp).clamp(-MAX_SLEW, MAX_SLEW);
      let d = self.time_samp;
      let fb = self.fb.next(self.feedback);
      let wet = self.wet.next(self.mix);
      let dry = 1.0 - wet;
      for ch in 0..chans {
        let x = block.get(ch, n);
        // read before writing; feedback reaches the output one delay later
        let delayed = self.line.pop_fractional(ch, d);
        self.line.push(ch, x + delayed * fb);
        block.set(ch, n, x * dry + delayed * wet);
      }
    }
  }

  fn reset(&mut self) {
    self.line.reset();
    self.settle();
  }

  fn settle(&mut self) {
    let target = self.target_samples();
    self.time_samp = target;
    self.fb.snap(self.feedback);
    self.wet.snap(self.mix);
  }

  fn tail_seconds(&self) -> f32 {
    let t = self.target_samples() / self.sr;
    if self.feedback < 1e-3 { return t; }
    // echoes until -60 dB
    let echoes = 0.001f32.ln() / self.feedback.ln();
    (t * (1.0 + echoes)).min(MAX_TAIL_S)
  }
}
