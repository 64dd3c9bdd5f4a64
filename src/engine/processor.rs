use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::config::EngineConfig;
use crate::error::EngineError;

use super::block::{AudioBuffer, ProcessSpec};
use super::chain::EffectChain;
use super::dsp::reverb::ReverbRecycler;
use super::messages::ChainMsg;
use super::params::{lookup, ChainParams, ModuleId, ParamId, ParamKey, ParamValue};
use super::preset::Preset;

/// Audio-side half of the engine.
///
/// Owned by whoever drives the real-time callback. Each cycle it drains a
/// bounded number of control messages, then runs the chain in place.
pub struct EffectProcessor {
  chain: EffectChain,
  rx: Receiver<ChainMsg>,
  scratch: AudioBuffer,
  max_messages: usize,
  settle_pending: bool,
}

impl EffectProcessor {
  /// Validates `spec`, prepares every module and returns the control handle
  /// that feeds this processor.
  pub fn new(spec: ProcessSpec, config: EngineConfig) -> Result<(Self, ControlHandle), EngineError> {
    let config = config.sanitized();
    let chain = EffectChain::new(&spec, &config)?;
    let (tx, rx) = bounded(config.queue_capacity);
    let reverb = chain.reverb_recycler();
    let processor = Self {
      scratch: AudioBuffer::new(spec.channels, spec.max_block_size),
      chain,
      rx,
      max_messages: config.max_messages_per_cycle,
      settle_pending: true,
    };
    let handle = ControlHandle { tx, params: ChainParams::default(), dirty: false, reverb };
    Ok((processor, handle))
  }

  /// Re-establish sample rate, block size or channel count. All state is
  /// cleared; on error the previous preparation stays in effect.
  pub fn prepare(&mut self, spec: ProcessSpec) -> Result<(), EngineError> {
    self.chain.prepare(&spec)?;
    self.scratch = AudioBuffer::new(spec.channels, spec.max_block_size);
    self.settle_pending = true;
    Ok(())
  }

  pub fn spec(&self) -> &ProcessSpec { self.chain.spec() }

  /// Parameters as last applied on the audio side.
  pub fn params(&self) -> &ChainParams { self.chain.params() }

  /// Processes `block` in place.
  ///
  /// Blocks longer than the prepared size are split into chunks; channels
  /// past the prepared count are left untouched.
  pub fn process(&mut self, block: &mut AudioBuffer) {
    self.drain();
    let used = block.channels().min(self.scratch.capacity_channels());
    let max = self.chain.spec().max_block_size;
    self.scratch.set_channels(used);
    let mut offset = 0;
    while offset < block.frames() {
      let len = (block.frames() - offset).min(max);
      self.scratch.set_frames(len);
      for ch in 0..used {
        self.scratch.channel_mut(ch).copy_from_slice(&block.channel(ch)[offset..offset + len]);
      }
      self.chain.process(&mut self.scratch);
      for ch in 0..used {
        block.channel_mut(ch)[offset..offset + len].copy_from_slice(self.scratch.channel(ch));
      }
      offset += len;
    }
  }

  /// Interleaved variant of [`process`](Self::process) for hosts that hand
  /// over a single frame-major slice.
  pub fn process_interleaved(&mut self, data: &mut [f32], channels: usize) {
    if channels == 0 { return; }
    self.drain();
    let used = channels.min(self.scratch.capacity_channels());
    let max = self.chain.spec().max_block_size;
    let frames = data.len() / channels;
    self.scratch.set_channels(used);
    let mut offset = 0;
    while offset < frames {
      let len = (frames - offset).min(max);
      self.scratch.read_interleaved(data, channels, offset, len);
      self.chain.process(&mut self.scratch);
      self.scratch.write_interleaved(data, channels, offset);
      offset += len;
    }
  }

  /// Clears all delay lines, oscillators and tails. Runs off the audio
  /// thread, so it may rebuild what an in-cycle reset cannot.
  pub fn reset(&mut self) {
    let spec = *self.chain.spec();
    if let Err(e) = self.chain.prepare(&spec) {
      log::error!("reset failed to re-prepare: {e}");
      self.chain.reset();
    }
    self.settle_pending = true;
    log::debug!("processor reset");
  }

  /// Longest tail among enabled modules, in seconds.
  pub fn latency_seconds(&self) -> f32 { self.chain.latency_seconds() }

  fn drain(&mut self) {
    for _ in 0..self.max_messages {
      let Ok(msg) = self.rx.try_recv() else { break };
      match msg {
        ChainMsg::SetParam { id, value } => self.chain.set_param(id, value),
        ChainMsg::SetEnabled { module, on } => self.chain.set_enabled(module, on),
        ChainMsg::Replace(params) => self.chain.apply_params(&params),
        ChainMsg::Reset => {
          self.chain.reset();
          self.settle_pending = true;
        }
      }
    }
    // first cycle after prepare or reset: no ramp from stale values
    if self.settle_pending {
      self.chain.settle();
      self.settle_pending = false;
    }
  }
}

/// Control-side half of the engine.
///
/// Keeps the authoritative copy of every parameter and forwards changes to
/// the processor without ever blocking. If the queue is full the handle
/// remembers it and sends a full snapshot on the next successful send.
///
/// Every call also frees reverb instances retired by an in-cycle reset and
/// sends clean ones back; call [`maintain`](Self::maintain) when idle.
pub struct ControlHandle {
  tx: Sender<ChainMsg>,
  params: ChainParams,
  dirty: bool,
  reverb: ReverbRecycler,
}

impl ControlHandle {
  /// Sets a parameter, clamped to its range. Returns the stored value.
  pub fn set(&mut self, id: ParamId, value: f32) -> f32 {
    let v = self.params.set(id, value);
    if v != value {
      log::debug!("{} = {value} clamped to {v}", id.key());
    }
    self.send(ChainMsg::SetParam { id, value: v });
    v
  }

  /// Sets a parameter from a `[0, 1]` knob position, honoring the
  /// parameter's skew and step.
  pub fn set_normalized(&mut self, id: ParamId, p: f32) -> f32 {
    let v = id.spec().from_normalized(p);
    self.set(id, v)
  }

  pub fn set_enabled(&mut self, module: ModuleId, on: bool) {
    self.params.set_enabled(module, on);
    self.send(ChainMsg::SetEnabled { module, on });
  }

  pub fn set_bypassed(&mut self, module: ModuleId, bypassed: bool) { self.set_enabled(module, !bypassed); }

  /// String-keyed setter, e.g. `("delay.mix", 0.4)` or `("reverb.enabled", true)`.
  pub fn set_path(&mut self, path: &str, value: ParamValue) -> Result<(), EngineError> {
    match (lookup(path), value) {
      (Some(ParamKey::Param(id)), ParamValue::F32(v)) => {
        self.set(id, v);
        Ok(())
      }
      (Some(ParamKey::Enabled(module)), ParamValue::Bool(on)) => {
        self.set_enabled(module, on);
        Ok(())
      }
      (Some(_), _) => Err(EngineError::PresetType { key: path.to_string() }),
      (None, _) => Err(EngineError::UnknownParam { key: path.to_string() }),
    }
  }

  /// Applies several changes as one atomic update.
  pub fn set_many(&mut self, changes: &[(ParamId, f32)]) {
    for &(id, value) in changes { self.params.set(id, value); }
    self.send(ChainMsg::Replace(self.params));
  }

  pub fn get(&self, id: ParamId) -> f32 { self.params.get(id) }
  pub fn is_enabled(&self, module: ModuleId) -> bool { self.params.is_enabled(module) }
  pub fn params(&self) -> &ChainParams { &self.params }

  pub fn snapshot(&self) -> Preset { self.params.snapshot() }

  /// Loads a preset and sends it as one update. Nothing changes if the
  /// preset holds a value of the wrong type.
  pub fn restore(&mut self, preset: &Preset) -> Result<(), EngineError> {
    let mut next = self.params;
    next.restore(preset)?;
    self.params = next;
    self.send(ChainMsg::Replace(self.params));
    Ok(())
  }

  /// Asks the processor to clear its state at the start of the next cycle.
  pub fn request_reset(&mut self) { self.send(ChainMsg::Reset); }

  /// Frees what the audio thread handed back and restocks its spares.
  pub fn maintain(&mut self) {
    let n = self.reverb.maintain();
    if n > 0 { log::debug!("rebuilt {n} reverb instance(s)"); }
  }

  /// True while a full snapshot is waiting for room in the queue.
  pub fn is_dirty(&self) -> bool { self.dirty }

  /// Retries a pending snapshot. Returns true once nothing is pending.
  pub fn flush(&mut self) -> bool {
    if self.dirty && self.push(ChainMsg::Replace(self.params)) {
      self.dirty = false;
    }
    !self.dirty
  }

  fn send(&mut self, msg: ChainMsg) {
    self.maintain();
    let is_reset = matches!(msg, ChainMsg::Reset);
    if self.dirty {
      // a snapshot already carries any parameter change
      if !self.flush() || !is_reset { return; }
    }
    if !self.push(msg) {
      if is_reset {
        log::debug!("control queue full, reset request dropped");
      } else {
        self.dirty = true;
      }
    }
  }

  fn push(&self, msg: ChainMsg) -> bool {
    match self.tx.try_send(msg) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => {
        log::debug!("control queue full");
        false
      }
      Err(TrySendError::Disconnected(_)) => {
        log::debug!("processor dropped, message discarded");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pair(queue: usize) -> (EffectProcessor, ControlHandle) {
    let cfg = EngineConfig { queue_capacity: queue, ..Default::default() };
    EffectProcessor::new(ProcessSpec::new(48_000.0, 64, 2), cfg).unwrap()
  }

  #[test]
  fn test_messages_reach_chain_on_next_cycle() {
    let (mut p, mut h) = pair(16);
    h.set(ParamId::DelayMix, 0.25);
    h.set_enabled(ModuleId::Delay, true);
    assert_eq!(p.params().get(ParamId::DelayMix), 0.5);
    let mut buf = AudioBuffer::new(2, 64);
    p.process(&mut buf);
    assert_eq!(p.params().get(ParamId::DelayMix), 0.25);
    assert!(p.params().is_enabled(ModuleId::Delay));
  }

  #[test]
  fn test_full_queue_falls_back_to_snapshot() {
    let (mut p, mut h) = pair(2);
    for i in 0..10 { h.set(ParamId::TremoloRate, 1.0 + i as f32); }
    assert!(h.is_dirty());
    h.set_enabled(ModuleId::Tremolo, true);
    let mut buf = AudioBuffer::new(2, 64);
    p.process(&mut buf);
    assert!(h.flush());
    p.process(&mut buf);
    assert_eq!(p.params(), h.params());
    assert_eq!(p.params().get(ParamId::TremoloRate), 10.0);
  }

  #[test]
  fn test_set_path() {
    let (mut p, mut h) = pair(16);
    h.set_path("reverb.enabled", ParamValue::Bool(true)).unwrap();
    h.set_path("reverb.wet", ParamValue::F32(0.8)).unwrap();
    assert!(matches!(h.set_path("reverb.wet", ParamValue::Bool(true)), Err(EngineError::PresetType { .. })));
    assert!(matches!(h.set_path("reverb.size", ParamValue::F32(0.1)), Err(EngineError::UnknownParam { .. })));
    let mut buf = AudioBuffer::new(2, 64);
    p.process(&mut buf);
    assert!(p.params().is_enabled(ModuleId::Reverb));
    assert_eq!(p.params().get(ParamId::ReverbWet), 0.8);
  }

  #[test]
  fn test_extra_channels_untouched() {
    let (mut p, mut h) = pair(16);
    h.set(ParamId::DistortionDrive, 5.0);
    h.set_enabled(ModuleId::Distortion, true);
    let mut buf = AudioBuffer::from_channels(vec![vec![0.2; 64], vec![0.2; 64], vec![0.2; 64]]);
    p.process(&mut buf);
    assert!(buf.channel(0)[0] > 0.2);
    assert!(buf.channel(2).iter().all(|&s| s == 0.2));
  }

  #[test]
  fn test_long_blocks_are_chunked() {
    let (mut p, mut h) = pair(16);
    h.set(ParamId::DelayTimeMs, 1.0);
    h.set(ParamId::DelayFeedback, 0.0);
    h.set(ParamId::DelayMix, 1.0);
    h.set_enabled(ModuleId::Delay, true);
    // 1 ms at 48 kHz = 48 frames; the impulse has to cross a 64-frame chunk edge
    let mut imp = vec![0.0; 200];
    imp[30] = 1.0;
    let mut buf = AudioBuffer::from_channels(vec![imp.clone(), imp]);
    p.process(&mut buf);
    assert!((buf.get(0, 78) - 1.0).abs() < 1e-6);
    assert!((buf.get(1, 78) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn test_prepare_rejects_and_keeps_old_spec() {
    let (mut p, _h) = pair(16);
    assert!(p.prepare(ProcessSpec::new(48_000.0, 64, 99)).is_err());
    assert_eq!(p.spec().channels, 2);
    p.prepare(ProcessSpec::new(96_000.0, 32, 1)).unwrap();
    assert_eq!(p.spec().sample_rate, 96_000.0);
  }
}
