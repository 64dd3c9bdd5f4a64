//! Real-time multi-effect chain.
//!
//! An [`EffectProcessor`] runs a fixed-order chain of toggleable modules on
//! the audio thread; its paired [`ControlHandle`] changes parameters from
//! anywhere else without blocking either side.
//!
//! ```no_run
//! use fxchain::{EffectProcessor, EngineConfig, ModuleId, ParamId, ProcessSpec};
//!
//! # fn main() -> Result<(), fxchain::EngineError> {
//! let (mut fx, mut ctl) = EffectProcessor::new(ProcessSpec::new(48_000.0, 512, 2), EngineConfig::default())?;
//! ctl.set(ParamId::DelayTimeMs, 250.0);
//! ctl.set_enabled(ModuleId::Delay, true);
//! let mut frames = vec![0.0f32; 512 * 2];
//! fx.process_interleaved(&mut frames, 2);
//! # Ok(())
//! # }
//! ```

pub mod engine {
  pub mod block;
  pub mod chain;
  pub mod dsp;
  pub mod messages;
  pub mod params;
  pub mod preset;
  pub mod processor;
}
pub mod config;
pub mod error;

pub use config::EngineConfig;
pub use engine::block::{AudioBuffer, ProcessSpec};
pub use engine::chain::EffectChain;
pub use engine::dsp::reverb::ReverbRecycler;
pub use engine::params::{ChainParams, ModuleId, ParamId, ParamSpec, ParamValue};
pub use engine::preset::Preset;
pub use engine::processor::{ControlHandle, EffectProcessor};
pub use error::EngineError;
