use super::params::{ChainParams, ModuleId, ParamId};

/// Control -> audio commands. Every variant is `Copy`, so sending one never
/// hands the audio thread anything to free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChainMsg {
  SetParam { id: ParamId, value: f32 },
  SetEnabled { module: ModuleId, on: bool },
  /// Swap in a full parameter set at once.
  Replace(ChainParams),
  /// Clear delay lines, oscillators and tails at the start of the next cycle.
  Reset,
}
