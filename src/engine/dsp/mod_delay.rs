//! LFO-swept short delay, the engine behind Flanger and Chorus.

use core::f32::consts::FRAC_PI_2;

use super::{delay_line::DelayLine, ms_to_samples, oscillator::Oscillator, smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

const SMOOTH_MS: f32 = 10.0;

pub struct ModDelay {
  line: DelayLine,
  lfos: Vec<Oscillator>,
  sr: f32,
  base_ms: f32,
  sweep_ms: f32,
  spread: f32, // LFO phase offset between adjacent channels, radians
  rate: f32,
  depth: f32,
  feedback: f32,
  mix: f32,
  s_depth: Smooth,
  s_fb: Smooth,
  s_mix: Smooth,
}

impl ModDelay {
  pub fn new(base_ms: f32, sweep_ms: f32, spread: f32) -> Self {
    let sr = 44_100.0;
    Self {
      line: DelayLine::new(),
      lfos: Vec::new(),
      sr,
      base_ms,
      sweep_ms,
      spread,
      rate: 1.0,
      depth: 0.5,
      feedback: 0.0,
      mix: 0.5,
      s_depth: Smooth::new(sr, SMOOTH_MS),
      s_fb: Smooth::new(sr, SMOOTH_MS),
      s_mix: Smooth::new(sr, SMOOTH_MS),
    }
  }

  pub fn set_rate(&mut self, hz: f32) {
    self.rate = hz.max(0.0);
    for lfo in self.lfos.iter_mut() { lfo.set_frequency(self.rate); }
  }
  pub fn set_depth(&mut self, d: f32) { self.depth = d.clamp(0.0, 1.0); }
  pub fn set_feedback(&mut self, f: f32) { self.feedback = f.clamp(-0.9, 0.9); }
  pub fn set_mix(&mut self, m: f32) { self.mix = m.clamp(0.0, 1.0); }

  fn snap_controls(&mut self) {
    self.s_depth.snap(self.depth);
    self.s_fb.snap(self.feedback);
    self.s_mix.snap(self.mix);
  }

  fn max_ms(&self) -> f32 { self.base_ms + self.sweep_ms }
}

impl Effect for ModDelay {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.sr = spec.sample_rate;
    let max = ms_to_samples(self.max_ms(), self.sr).ceil() as usize + 1;
    self.line.prepare(max, spec.channels);
    self.lfos = (0..spec.channels)
      .map(|ch| {
        let mut lfo = Oscillator::new(self.sr).with_phase(self.spread * ch as f32);
        lfo.set_frequency(self.rate);
        lfo
      })
      .collect();
    for s in [&mut self.s_depth, &mut self.s_fb, &mut self.s_mix] { s.set_tau(spec.sample_rate, SMOOTH_MS); }
    self.snap_controls();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    let chans = block.channels().min(self.line.channels());
    for n in 0..block.frames() {
      let depth = self.s_depth.next(self.depth);
      let fb = self.s_fb.next(self.feedback);
      let mix = self.s_mix.next(self.mix);
      for ch in 0..chans {
        let x = block.get(ch, n);
        let sweep = (self.lfos[ch].next_sample() * 0.5 + 0.5) * depth * self.sweep_ms;
        let d = ms_to_samples(self.base_ms + sweep, self.sr);
        let wet = self.line.pop_fractional(ch, d);
        // wet left the line on an earlier frame, so this is next-sample feedback
        self.line.push(ch, x + fb * wet);
        block.set(ch, n, x * (1.0 - mix) + wet * mix);
      }
    }
  }

  fn reset(&mut self) {
    self.line.reset();
    for lfo in self.lfos.iter_mut() { lfo.reset(); }
    self.snap_controls();
  }

  fn settle(&mut self) { self.snap_controls(); }

  fn tail_seconds(&self) -> f32 {
    let per_pass = self.max_ms() / 1000.0;
    let fb = self.feedback.abs();
    if fb < 1e-3 { per_pass } else { per_pass * (0.001f32.ln() / fb.ln()) }
  }
}

/// Short swept comb with feedback.
pub struct Flanger(ModDelay);

impl Flanger {
  pub fn new() -> Self {
    let mut md = ModDelay::new(1.0, 5.0, 0.0);
    md.set_rate(0.25);
    md.set_depth(0.5);
    md.set_feedback(0.5);
    Self(md)
  }
  pub fn set_rate(&mut self, hz: f32) { self.0.set_rate(hz); }
  pub fn set_depth(&mut self, d: f32) { self.0.set_depth(d); }
  pub fn set_feedback(&mut self, f: f32) { self.0.set_feedback(f); }
  pub fn set_mix(&mut self, m: f32) { self.0.set_mix(m); }
}

impl Default for Flanger {
  fn default() -> Self { Self::new() }
}

impl Effect for Flanger {
  fn prepare(&mut self, spec: &ProcessSpec) { self.0.prepare(spec); }
  fn process(&mut self, block: &mut AudioBuffer) { self.0.process(block); }
  fn reset(&mut self) { self.0.reset(); }
  fn settle(&mut self) { self.0.settle(); }
  fn tail_seconds(&self) -> f32 { self.0.tail_seconds() }
}

/// Longer modulated delay without feedback; channels are swept in quadrature.
pub struct Chorus(ModDelay);

impl Chorus {
  pub fn new() -> Self {
    let mut md = ModDelay::new(10.0, 8.0, FRAC_PI_2);
    md.set_rate(1.0);
    md.set_depth(0.25);
    Self(md)
  }
  pub fn set_rate(&mut self, hz: f32) { self.0.set_rate(hz); }
  pub fn set_depth(&mut self, d: f32) { self.0.set_depth(d); }
  pub fn set_mix(&mut self, m: f32) { self.0.set_mix(m); }
}

impl Default for Chorus {
  fn default() -> Self { Self::new() }
}

impl Effect for Chorus {
  fn prepare(&mut self, spec: &ProcessSpec) { self.0.prepare(spec); }
  fn process(&mut self, block: &mut AudioBuffer) { self.0.process(block); }
  fn reset(&mut self) { self.0.reset(); }
  fn settle(&mut self) { self.0.settle(); }
  fn tail_seconds(&self) -> f32 { self.0.tail_seconds() }
}
