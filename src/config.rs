//! Engine-wide settings that are fixed for the lifetime of a processor.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! is a valid configuration:
//!
//! ```text
//! { "max_delay_ms": 4000.0 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Longest delay the Delay module can reach; sizes its ring buffer.
  pub max_delay_ms: f32,
  /// Capacity of the control -> audio message queue.
  pub queue_capacity: usize,
  /// Messages drained per processing cycle before the chain runs.
  pub max_messages_per_cycle: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { max_delay_ms: 2000.0, queue_capacity: 256, max_messages_per_cycle: 64 }
  }
}

impl EngineConfig {
  pub fn from_json(text: &str) -> Result<Self, EngineError> {
    Ok(serde_json::from_str(text)?)
  }

  pub(crate) fn sanitized(mut self) -> Self {
    if !self.max_delay_ms.is_finite() || self.max_delay_ms < 1.0 {
      log::warn!("max_delay_ms {} out of range, using 1 ms", self.max_delay_ms);
      self.max_delay_ms = 1.0;
    }
    self.queue_capacity = self.queue_capacity.max(1);
    self.max_messages_per_cycle = self.max_messages_per_cycle.max(1);
    self
  }
}
