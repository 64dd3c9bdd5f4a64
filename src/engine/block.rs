use crate::error::EngineError;

/// Upper bound on channels a chain can be prepared for.
pub const MAX_CHANNELS: usize = 8;

/// Sample rate, block size and channel layout established by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessSpec {
  pub sample_rate: f32,
  pub max_block_size: usize,
  pub channels: usize,
}

impl ProcessSpec {
  pub fn new(sample_rate: f32, max_block_size: usize, channels: usize) -> Self {
    Self { sample_rate, max_block_size, channels }
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if !self.sample_rate.is_finite() || self.sample_rate < 1000.0 {
      return Err(EngineError::InvalidSampleRate(self.sample_rate));
    }
    if self.max_block_size == 0 {
      return Err(EngineError::InvalidBlockSize(self.max_block_size));
    }
    if self.channels == 0 || self.channels > MAX_CHANNELS {
      return Err(EngineError::UnsupportedChannelCount(self.channels));
    }
    Ok(())
  }

  /// Time budget of one full block in seconds.
  pub fn block_seconds(&self) -> f32 { self.max_block_size as f32 / self.sample_rate }
}

/// Planar `channels x frames` sample buffer, processed in place.
///
/// Storage is allocated once; `set_frames` and `set_channels` only move the
/// visible shape within what was allocated.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
  data: Vec<Vec<f32>>,
  chans: usize,
  frames: usize,
}

impl AudioBuffer {
  pub fn new(channels: usize, capacity: usize) -> Self {
    Self { data: vec![vec![0.0; capacity]; channels], chans: channels, frames: capacity }
  }

  pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
    let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    Self { chans: channels.len(), data: channels, frames }
  }

  #[inline] pub fn channels(&self) -> usize { self.chans }
  #[inline] pub fn frames(&self) -> usize { self.frames }
  pub fn capacity(&self) -> usize { self.data.iter().map(|c| c.len()).min().unwrap_or(0) }
  pub fn capacity_channels(&self) -> usize { self.data.len() }

  /// Clamped to capacity, never reallocates.
  pub fn set_frames(&mut self, frames: usize) { self.frames = frames.min(self.capacity()); }
  pub fn set_channels(&mut self, channels: usize) { self.chans = channels.min(self.data.len()); }

  #[inline] pub fn get(&self, ch: usize, n: usize) -> f32 { self.data[ch][n] }
  #[inline] pub fn set(&mut self, ch: usize, n: usize, v: f32) { self.data[ch][n] = v; }

  pub fn channel(&self, ch: usize) -> &[f32] { &self.data[ch][..self.frames] }
  pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
    let frames = self.frames;
    &mut self.data[ch][..frames]
  }

  /// Left/right slices, or `None` unless the buffer has exactly two channels.
  pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
    if self.chans != 2 { return None; }
    let frames = self.frames;
    let (l, r) = self.data.split_at_mut(1);
    Some((&mut l[0][..frames], &mut r[0][..frames]))
  }

  pub fn clear(&mut self) {
    for c in self.data.iter_mut().take(self.chans) { c.fill(0.0); }
  }

  /// Copy `frames` interleaved frames in, starting at frame `offset` of `src`.
  pub fn read_interleaved(&mut self, src: &[f32], channels: usize, offset: usize, frames: usize) {
    self.set_frames(frames);
    let frames = self.frames;
    let used = channels.min(self.chans);
    for n in 0..frames {
      let base = (offset + n) * channels;
      for ch in 0..used { self.data[ch][n] = src[base + ch]; }
    }
  }

  pub fn write_interleaved(&self, dst: &mut [f32], channels: usize, offset: usize) {
    let used = channels.min(self.chans);
    for n in 0..self.frames {
      let base = (offset + n) * channels;
      for ch in 0..used { dst[base + ch] = self.data[ch][n]; }
    }
  }
}
