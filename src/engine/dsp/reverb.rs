use crossbeam_channel::{bounded, Receiver, Sender};
use freeverb::Freeverb;

use super::{smooth::Smooth, Effect};
use crate::engine::block::{AudioBuffer, ProcessSpec};

const SMOOTH_MS: f32 = 10.0;
/// Longest Freeverb comb at its 44.1 kHz tuning, in seconds.
const LONGEST_COMB_S: f32 = 1617.0 / 44_100.0;
const MAX_TAIL_S: f32 = 30.0;
/// Instances in flight between the audio and control sides, per direction.
const TANK_QUEUE: usize = 4;

/// A Freeverb instance tagged with the sample rate it is meant for.
struct Tank {
  rv: Box<Freeverb>,
  sr: usize,
}

/// Control-side end of the reverb's instance exchange.
///
/// Freeverb has no way to clear its buffers, so an in-cycle reset swaps in a
/// spare and hands the used instance back here. [`maintain`](Self::maintain)
/// frees it and builds the next spare, keeping both off the audio thread.
#[derive(Clone)]
pub struct ReverbRecycler {
  used: Receiver<Tank>,
  fresh: Sender<Tank>,
}

impl ReverbRecycler {
  /// Frees returned instances and sends one fresh spare back for each.
  /// Returns how many were rebuilt.
  pub fn maintain(&self) -> usize {
    let mut rebuilt = 0;
    while let Ok(Tank { rv, sr }) = self.used.try_recv() {
      drop(rv);
      let fresh = Tank { rv: Box::new(Freeverb::new(sr)), sr };
      if self.fresh.try_send(fresh).is_err() {
        log::debug!("reverb spare queue full, spare dropped");
      }
      rebuilt += 1;
    }
    rebuilt
  }
}

/// Freeverb network run fully wet; wet and dry levels are applied here so
/// `wet = 0, dry = 1` passes the input through bit for bit.
///
/// `reset` never frees on the audio thread: the ringing instance is parked
/// in `retired` until the used queue takes it, and if no clean spare is on
/// hand the wet path stays muted until one arrives.
pub struct Reverb {
  live: Option<Box<Freeverb>>,
  spare: Option<Box<Freeverb>>,
  retired: Option<Box<Freeverb>>,
  stale: bool,
  to_control: Sender<Tank>,
  from_control: Receiver<Tank>,
  recycler: ReverbRecycler,
  sr: f32,
  room_size: f32,
  damping: f32,
  wet: f32,
  dry: f32,
  width: f32,
  s_wet: Smooth,
  s_dry: Smooth,
}

impl Reverb {
  pub fn new() -> Self {
    let sr = 44_100.0;
    let (to_control, used) = bounded(TANK_QUEUE);
    let (fresh, from_control) = bounded(TANK_QUEUE);
    Self {
      live: None,
      spare: None,
      retired: None,
      stale: false,
      to_control,
      from_control,
      recycler: ReverbRecycler { used, fresh },
      sr,
      room_size: 0.5,
      damping: 0.5,
      wet: 0.33,
      dry: 0.4,
      width: 1.0,
      s_wet: Smooth::new(sr, SMOOTH_MS),
      s_dry: Smooth::new(sr, SMOOTH_MS),
    }
  }

  pub fn set_room_size(&mut self, v: f32) {
    self.room_size = v.clamp(0.0, 1.0);
    self.configure_all();
  }
  pub fn set_damping(&mut self, v: f32) {
    self.damping = v.clamp(0.0, 1.0);
    self.configure_all();
  }
  pub fn set_width(&mut self, v: f32) {
    self.width = v.clamp(0.0, 1.0);
    self.configure_all();
  }
  pub fn set_wet(&mut self, v: f32) { self.wet = v.clamp(0.0, 1.0); }
  pub fn set_dry(&mut self, v: f32) { self.dry = v.clamp(0.0, 1.0); }

  /// Handle for the thread that frees used instances and builds spares.
  pub fn recycler(&self) -> ReverbRecycler { self.recycler.clone() }

  /// True while a reset is waiting for a clean instance.
  pub fn is_muted(&self) -> bool { self.stale }

  fn build(&self) -> Box<Freeverb> {
    let mut rv = Box::new(Freeverb::new(self.sr as usize));
    self.configure(&mut rv);
    rv
  }

  fn configure(&self, rv: &mut Freeverb) {
    rv.set_room_size(self.room_size as f64);
    rv.set_dampening(self.damping as f64);
    rv.set_width(self.width as f64);
    rv.set_wet(1.0);
    rv.set_dry(0.0);
  }

  fn configure_all(&mut self) {
    let (room, damp, width) = (self.room_size as f64, self.damping as f64, self.width as f64);
    for rv in [self.live.as_deref_mut(), self.spare.as_deref_mut()].into_iter().flatten() {
      rv.set_room_size(room);
      rv.set_dampening(damp);
      rv.set_width(width);
    }
  }

  /// Moves instances between the queues and the live slot. Never allocates
  /// or frees.
  fn exchange(&mut self) {
    if self.spare.is_none() && self.retired.is_none() {
      if let Ok(Tank { mut rv, sr }) = self.from_control.try_recv() {
        if sr == self.sr as usize {
          self.configure(&mut rv);
          self.spare = Some(rv);
        } else {
          // built for an earlier rate; send it back to be rebuilt
          self.retired = Some(rv);
        }
      }
    }
    if let Some(rv) = self.retired.take() {
      if let Err(e) = self.to_control.try_send(Tank { rv, sr: self.sr as usize }) {
        self.retired = Some(e.into_inner().rv);
      }
    }
    if self.stale && self.retired.is_none() {
      if let Some(fresh) = self.spare.take() {
        self.retired = self.live.replace(fresh);
        self.stale = false;
      }
    }
  }
}

impl Default for Reverb {
  fn default() -> Self { Self::new() }
}

impl Effect for Reverb {
  fn prepare(&mut self, spec: &ProcessSpec) {
    self.sr = spec.sample_rate;
    self.live = Some(self.build());
    self.spare = Some(self.build());
    self.retired = None;
    self.stale = false;
    self.s_wet.set_tau(self.sr, SMOOTH_MS);
    self.s_dry.set_tau(self.sr, SMOOTH_MS);
    self.settle();
  }

  fn process(&mut self, block: &mut AudioBuffer) {
    self.exchange();
    let frames = block.frames();
    let chans = block.channels().min(2);
    let rv = match self.live.as_deref_mut() {
      Some(rv) if !self.stale => rv,
      _ => {
        // the live tank still rings; only the dry path is heard
        for n in 0..frames {
          self.s_wet.next(self.wet);
          let dry = self.s_dry.next(self.dry);
          for ch in 0..chans { block.set(ch, n, block.get(ch, n) * dry); }
        }
        return;
      }
    };
    match block.channels() {
      0 => {}
      1 => {
        for n in 0..frames {
          let x = block.get(0, n);
          let (l, _) = rv.tick((x as f64, x as f64));
          let wet = self.s_wet.next(self.wet);
          let dry = self.s_dry.next(self.dry);
          block.set(0, n, x * dry + l as f32 * wet);
        }
      }
      _ => {
        for n in 0..frames {
          let (xl, xr) = (block.get(0, n), block.get(1, n));
          let (l, r) = rv.tick((xl as f64, xr as f64));
          let wet = self.s_wet.next(self.wet);
          let dry = self.s_dry.next(self.dry);
          block.set(0, n, xl * dry + l as f32 * wet);
          block.set(1, n, xr * dry + r as f32 * wet);
        }
      }
    }
  }

  fn reset(&mut self) {
    if self.live.is_some() {
      self.stale = true;
      self.exchange();
    }
    self.settle();
  }

  fn settle(&mut self) {
    self.s_wet.snap(self.wet);
    self.s_dry.snap(self.dry);
  }

  fn tail_seconds(&self) -> f32 {
    let fb = 0.7 + 0.28 * self.room_size;
    // T60 of the longest comb at this feedback
    (3.0 * LONGEST_COMB_S / -fb.log10()).min(MAX_TAIL_S)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reverb(channels: usize, wet: f32, dry: f32) -> Reverb {
    let mut r = Reverb::new();
    r.set_wet(wet);
    r.set_dry(dry);
    r.prepare(&ProcessSpec::new(48_000.0, 512, channels));
    r
  }

  fn impulse(len: usize) -> Vec<f32> {
    let mut v = vec![0.0; len];
    v[0] = 1.0;
    v
  }

  #[test]
  fn test_dry_only_is_identity() {
    let mut r = reverb(2, 0.0, 1.0);
    let input: Vec<f32> = (0..512).map(|n| ((n % 37) as f32 / 37.0) - 0.5).collect();
    let mut buf = AudioBuffer::from_channels(vec![input.clone(), input.clone()]);
    r.process(&mut buf);
    assert_eq!(buf.channel(0), &input[..]);
    assert_eq!(buf.channel(1), &input[..]);
  }

  #[test]
  fn test_impulse_leaves_decaying_tail() {
    let mut r = reverb(2, 1.0, 0.0);
    let mut buf = AudioBuffer::from_channels(vec![impulse(48_000), impulse(48_000)]);
    r.process(&mut buf);
    let energy = |s: &[f32]| s.iter().map(|x| x * x).sum::<f32>();
    let early = energy(&buf.channel(0)[..12_000]);
    let late = energy(&buf.channel(0)[36_000..]);
    assert!(early > 0.0);
    assert!(late < early);
    assert!(buf.channel(0).iter().all(|s| s.is_finite()));
  }

  #[test]
  fn test_mono_and_extra_channels() {
    let mut mono = reverb(1, 1.0, 0.0);
    let mut buf = AudioBuffer::from_channels(vec![impulse(4800)]);
    mono.process(&mut buf);
    assert!(buf.channel(0).iter().any(|&s| s != 0.0));

    let mut r = reverb(3, 1.0, 0.0);
    let mut buf = AudioBuffer::from_channels(vec![impulse(4800), impulse(4800), impulse(4800)]);
    r.process(&mut buf);
    assert_eq!(buf.channel(2), &impulse(4800)[..]);
  }

  #[test]
  fn test_reset_drops_tail() {
    let mut r = reverb(2, 1.0, 0.0);
    let mut buf = AudioBuffer::from_channels(vec![impulse(4800), impulse(4800)]);
    r.process(&mut buf);
    r.reset();
    let mut silent = AudioBuffer::new(2, 4800);
    r.process(&mut silent);
    assert!(silent.channel(0).iter().all(|&s| s == 0.0));
    assert!(silent.channel(1).iter().all(|&s| s == 0.0));
  }

  #[test]
  fn test_second_reset_mutes_until_restocked() {
    let mut r = reverb(2, 1.0, 0.0);
    let recycler = r.recycler();
    let excite = |r: &mut Reverb| {
      let mut buf = AudioBuffer::from_channels(vec![impulse(4800), impulse(4800)]);
      r.process(&mut buf);
      buf
    };
    let silent_after = |r: &mut Reverb| {
      let mut buf = AudioBuffer::new(2, 4800);
      r.process(&mut buf);
      buf.channel(0).iter().chain(buf.channel(1)).all(|&s| s == 0.0)
    };

    excite(&mut r);
    r.reset();
    assert!(!r.is_muted());
    assert!(silent_after(&mut r));

    // the spare is used up and nobody has restocked it yet
    excite(&mut r);
    r.reset();
    assert!(r.is_muted());
    assert!(silent_after(&mut r));

    assert_eq!(recycler.maintain(), 1);
    let out = excite(&mut r);
    assert!(!r.is_muted());
    assert!(out.channel(0).iter().any(|&s| s != 0.0));
  }

  #[test]
  fn test_muted_reverb_keeps_dry_path() {
    let mut r = reverb(2, 1.0, 0.5);
    r.reset();
    r.reset();
    assert!(r.is_muted());
    let input: Vec<f32> = (0..256).map(|n| (n as f32 * 0.1).sin()).collect();
    let mut buf = AudioBuffer::from_channels(vec![input.clone(), input.clone()]);
    r.process(&mut buf);
    for (y, x) in buf.channel(0).iter().zip(&input) { assert!((y - x * 0.5).abs() < 1e-6); }
  }

  #[test]
  fn test_spare_for_old_rate_is_rebuilt() {
    let mut r = reverb(2, 1.0, 0.0);
    let recycler = r.recycler();
    r.reset();
    r.process(&mut AudioBuffer::new(2, 64));
    // the rate changes while the used instance is on its way back
    r.prepare(&ProcessSpec::new(44_100.0, 512, 2));
    r.reset();
    r.process(&mut AudioBuffer::new(2, 64));
    r.reset();
    assert!(r.is_muted());
    // one instance at 48 kHz and one at 44.1 kHz come back; both get rebuilt
    assert_eq!(recycler.maintain(), 2);
    r.process(&mut AudioBuffer::new(2, 64));
    assert!(r.is_muted());
    assert_eq!(recycler.maintain(), 1);
    r.process(&mut AudioBuffer::new(2, 64));
    assert!(!r.is_muted());
  }

  fn late_tail(room: f32, damping: f32) -> Vec<f32> {
    let mut r = reverb(2, 1.0, 0.0);
    r.set_room_size(room);
    r.set_damping(damping);
    let burst: Vec<f32> = (0..48_000u32)
      .map(|n| if n < 480 { (n.wrapping_mul(2_654_435_761) >> 8) as f32 / (1u32 << 24) as f32 - 0.5 } else { 0.0 })
      .collect();
    let mut buf = AudioBuffer::from_channels(vec![burst.clone(), burst]);
    r.process(&mut buf);
    buf.channel(0)[24_000..].to_vec()
  }

  fn energy(s: &[f32]) -> f32 { s.iter().map(|x| x * x).sum() }
  fn hf_energy(s: &[f32]) -> f32 { s.windows(2).map(|w| (w[1] - w[0]) * (w[1] - w[0])).sum() }

  #[test]
  fn test_damping_darkens_tail() {
    let bright = late_tail(0.8, 0.0);
    let dark = late_tail(0.8, 1.0);
    assert!(energy(&dark) > 0.0);
    assert!(hf_energy(&dark) < hf_energy(&bright));
    assert!(hf_energy(&dark) / energy(&dark) < hf_energy(&bright) / energy(&bright));
  }

  #[test]
  fn test_bigger_room_rings_longer() {
    let small = late_tail(0.2, 0.5);
    let big = late_tail(0.9, 0.5);
    assert!(energy(&big) > energy(&small) * 10.0);
  }

  #[test]
  fn test_zero_width_collapses_wet_only() {
    let mut r = reverb(2, 1.0, 1.0);
    r.set_width(0.0);
    let left = impulse(9600);
    let right = vec![0.0; 9600];
    let mut buf = AudioBuffer::from_channels(vec![left.clone(), right.clone()]);
    r.process(&mut buf);
    let mut wet_seen = false;
    for n in 0..9600 {
      let wet_l = buf.get(0, n) - left[n];
      let wet_r = buf.get(1, n) - right[n];
      assert!((wet_l - wet_r).abs() < 1e-5, "frame {n}: {wet_l} vs {wet_r}");
      wet_seen |= wet_l != 0.0;
    }
    assert!(wet_seen);
    // the dry impulse is still on the left only
    assert!((buf.get(0, 0) - buf.get(1, 0) - 1.0).abs() < 1e-5);
  }

  #[test]
  fn test_tail_grows_with_room() {
    let mut r = Reverb::new();
    r.set_room_size(0.1);
    let small = r.tail_seconds();
    r.set_room_size(1.0);
    let big = r.tail_seconds();
    assert!(small > 0.0 && big > small);
    assert!(big <= MAX_TAIL_S);
  }
}
