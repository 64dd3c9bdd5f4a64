use thiserror::Error;

/// Failures surfaced at the preparation and persistence boundary.
///
/// Nothing on the processing path returns these; real-time code clamps or
/// passes through instead.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("invalid sample rate {0} Hz")]
  InvalidSampleRate(f32),
  #[error("invalid maximum block size {0}")]
  InvalidBlockSize(usize),
  #[error("unsupported channel count {0}")]
  UnsupportedChannelCount(usize),
  #[error("unknown parameter `{key}`")]
  UnknownParam { key: String },
  #[error("preset value for `{key}` has the wrong type")]
  PresetType { key: String },
  #[error("malformed JSON: {0}")]
  Json(#[from] serde_json::Error),
}
