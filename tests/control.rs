use anyhow::Result;
use fxchain::{AudioBuffer, EffectProcessor, EngineConfig, EngineError, ModuleId, ParamId, ParamValue, Preset, ProcessSpec};

fn spec() -> ProcessSpec { ProcessSpec::new(48_000.0, 256, 2) }

fn max_step(prev: f32, out: &[f32]) -> f32 {
  let mut last = prev;
  let mut worst = 0.0f32;
  for &s in out {
    worst = worst.max((s - last).abs());
    last = s;
  }
  worst
}

#[test]
fn preset_round_trip_through_json() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  ctl.set_many(&[(ParamId::ReverbRoomSize, 0.9), (ParamId::ChorusDepth, 0.7), (ParamId::BitcrusherBits, 4.0)]);
  ctl.set_enabled(ModuleId::Reverb, true);
  let json = ctl.snapshot().to_json()?;

  let (mut fx2, mut ctl2) = EffectProcessor::new(spec(), EngineConfig::default())?;
  ctl2.restore(&Preset::from_json(&json)?)?;
  let mut buf = AudioBuffer::new(2, 256);
  fx.process(&mut buf);
  fx2.process(&mut buf);
  assert_eq!(ctl2.params(), ctl.params());
  assert_eq!(fx2.params(), fx.params());
  assert!(fx2.params().is_enabled(ModuleId::Reverb));
  Ok(())
}

#[test]
fn bad_preset_is_rejected_atomically() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  let before = *ctl.params();
  let preset = Preset::from_json(r#"{ "tremolo.depth": 0.9, "tremolo.enabled": 1.0 }"#)?;
  assert!(matches!(ctl.restore(&preset), Err(EngineError::PresetType { .. })));
  assert_eq!(ctl.params(), &before);
  let mut buf = AudioBuffer::new(2, 256);
  fx.process(&mut buf);
  assert_eq!(fx.params(), &before);
  Ok(())
}

#[test]
fn normalized_setter_snaps_to_grid() -> Result<()> {
  let (_fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  assert_eq!(ctl.set_normalized(ParamId::BitcrusherDownsample, 1.0), 100.0);
  let v = ctl.set_normalized(ParamId::RingModRate, 0.5);
  assert!(v > 0.1 && v < 2500.0);
  assert_eq!(ctl.get(ParamId::RingModRate), v);
  Ok(())
}

fn assert_silent_for(fx: &mut EffectProcessor, blocks: usize) {
  for _ in 0..blocks {
    let mut silent = AudioBuffer::new(2, 256);
    fx.process(&mut silent);
    assert!(silent.channel(0).iter().chain(silent.channel(1)).all(|&s| s == 0.0));
  }
}

#[test]
fn reset_request_clears_tails() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  ctl.set(ParamId::DelayFeedback, 0.9);
  ctl.set(ParamId::ReverbDry, 0.0);
  ctl.set_enabled(ModuleId::Delay, true);
  ctl.set_enabled(ModuleId::Reverb, true);
  for _ in 0..3 {
    let mut loud = AudioBuffer::from_channels(vec![vec![0.5; 256], vec![-0.5; 256]]);
    fx.process(&mut loud);
    ctl.request_reset();
    assert_silent_for(&mut fx, 200);
  }
  Ok(())
}

#[test]
fn back_to_back_resets_mute_reverb_until_restocked() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  ctl.set(ParamId::ReverbDry, 0.0);
  ctl.set_enabled(ModuleId::Reverb, true);
  let mut loud = AudioBuffer::from_channels(vec![vec![0.5; 256], vec![-0.5; 256]]);
  fx.process(&mut loud);
  // both land in the same cycle, so the second finds no clean spare
  ctl.request_reset();
  ctl.request_reset();
  assert_silent_for(&mut fx, 50);

  ctl.maintain();
  let mut loud = AudioBuffer::from_channels(vec![vec![0.5; 256], vec![-0.5; 256]]);
  fx.process(&mut loud);
  let mut rang = false;
  for _ in 0..20 {
    let mut tail = AudioBuffer::new(2, 256);
    fx.process(&mut tail);
    rang |= tail.channel(0).iter().any(|&s| s != 0.0);
  }
  assert!(rang);
  Ok(())
}

#[test]
fn latency_reports_longest_enabled_tail() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  let mut buf = AudioBuffer::new(2, 256);
  fx.process(&mut buf);
  assert_eq!(fx.latency_seconds(), 0.0);
  ctl.set(ParamId::DelayTimeMs, 400.0);
  ctl.set(ParamId::DelayFeedback, 0.0);
  ctl.set_enabled(ModuleId::Delay, true);
  fx.process(&mut buf);
  assert!((fx.latency_seconds() - 0.4).abs() < 1e-3);
  ctl.set(ParamId::ReverbRoomSize, 1.0);
  ctl.set_enabled(ModuleId::Reverb, true);
  fx.process(&mut buf);
  assert!(fx.latency_seconds() > 1.0);
  Ok(())
}

#[test]
fn delay_time_sweep_with_feedback_is_click_free() -> Result<()> {
  let sr = 48_000.0;
  let (mut fx, mut ctl) = EffectProcessor::new(ProcessSpec::new(sr, 256, 1), EngineConfig::default())?;
  ctl.set(ParamId::DelayTimeMs, 120.0);
  ctl.set(ParamId::DelayFeedback, 0.5);
  ctl.set_enabled(ModuleId::Delay, true);
  let tone = |n: usize| (std::f32::consts::TAU * 330.0 * n as f32 / sr).sin() * 0.3;
  let mut prev = 0.0;
  let mut n0 = 0;
  for block in 0..400 {
    if block % 40 == 20 {
      // jump the knob back and forth between extremes
      ctl.set(ParamId::DelayTimeMs, if block % 80 == 20 { 900.0 } else { 15.0 });
    }
    let mut buf = AudioBuffer::from_channels(vec![(n0..n0 + 256).map(tone).collect()]);
    fx.process(&mut buf);
    let step = max_step(prev, buf.channel(0));
    assert!(step < 0.15, "block {block}: step {step}");
    prev = buf.get(0, 255);
    n0 += 256;
  }
  Ok(())
}

#[test]
fn tremolo_and_modulation_depth_jumps_are_ramped() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(ProcessSpec::new(48_000.0, 128, 1), EngineConfig::default())?;
  ctl.set(ParamId::TremoloDepth, 0.0);
  ctl.set(ParamId::ModulationDepth, 0.0);
  ctl.set_enabled(ModuleId::Tremolo, true);
  ctl.set_enabled(ModuleId::Modulation, true);
  let mut buf = AudioBuffer::from_channels(vec![vec![0.8; 128]]);
  fx.process(&mut buf);
  let mut prev = buf.get(0, 127);
  ctl.set(ParamId::TremoloDepth, 1.0);
  ctl.set(ParamId::ModulationDepth, 1.0);
  for _ in 0..50 {
    let mut buf = AudioBuffer::from_channels(vec![vec![0.8; 128]]);
    fx.process(&mut buf);
    assert!(max_step(prev, buf.channel(0)) < 0.05);
    prev = buf.get(0, 127);
  }
  Ok(())
}

#[test]
fn string_paths_reach_the_chain() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(spec(), EngineConfig::default())?;
  ctl.set_path("widener.width", ParamValue::F32(0.0))?;
  ctl.set_path("widener.enabled", ParamValue::Bool(true))?;
  let mut buf = AudioBuffer::from_channels(vec![vec![1.0; 256], vec![0.0; 256]]);
  fx.process(&mut buf);
  assert_eq!(buf.channel(0), buf.channel(1));
  assert!(matches!(ctl.set_path("nope", ParamValue::F32(1.0)), Err(EngineError::UnknownParam { .. })));
  Ok(())
}
