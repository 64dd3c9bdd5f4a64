//! Snapshot and restore of the full parameter set.
//!
//! A preset is a flat, key-sorted map from parameter paths to values, so its
//! JSON form is stable across saves:
//!
//! ```text
//! { "delay.enabled": true, "delay.mix": 0.5, "delay.time_ms": 500.0, ... }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

use super::params::{lookup, ChainParams, ModuleId, ParamId, ParamKey, ParamValue};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preset(BTreeMap<String, ParamValue>);

impl Preset {
  pub fn new() -> Self { Self::default() }

  pub fn from_json(text: &str) -> Result<Self, EngineError> { Ok(serde_json::from_str(text)?) }
  pub fn to_json(&self) -> Result<String, EngineError> { Ok(serde_json::to_string_pretty(self)?) }

  pub fn get(&self, key: &str) -> Option<ParamValue> { self.0.get(key).copied() }
  pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) { self.0.insert(key.into(), value); }
  pub fn len(&self) -> usize { self.0.len() }
  pub fn is_empty(&self) -> bool { self.0.is_empty() }
  pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> { self.0.iter().map(|(k, v)| (k.as_str(), *v)) }
}

impl ChainParams {
  /// Every parameter and enable flag, keyed by path.
  pub fn snapshot(&self) -> Preset {
    let mut preset = Preset::new();
    for id in ParamId::ALL { preset.insert(id.key(), ParamValue::F32(self.get(id))); }
    for module in ModuleId::ORDER { preset.insert(module.enabled_key(), ParamValue::Bool(self.is_enabled(module))); }
    preset
  }

  /// Overlays `preset` onto these parameters. Keys it lacks keep their
  /// current value and unknown keys are skipped. A value of the wrong type
  /// fails the whole restore and leaves `self` unchanged.
  pub fn restore(&mut self, preset: &Preset) -> Result<(), EngineError> {
    let mut next = *self;
    for (key, value) in preset.iter() {
      match (lookup(key), value) {
        (Some(ParamKey::Param(id)), ParamValue::F32(v)) => { next.set(id, v); }
        (Some(ParamKey::Enabled(module)), ParamValue::Bool(on)) => next.set_enabled(module, on),
        (Some(_), _) => return Err(EngineError::PresetType { key: key.to_string() }),
        (None, _) => log::warn!("skipping unknown preset key `{key}`"),
      }
    }
    *self = next;
    Ok(())
  }
}
