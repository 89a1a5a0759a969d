//! Error types
//!
//! Nothing here escapes the public [`crate::AudioDirector`] surface: device
//! failures degrade to silent no-ops and load failures abandon the pending
//! transition. The enums exist so the internal layers can propagate with
//! `?` and the director can log precisely what was absorbed.

use thiserror::Error;

/// Output device / stream errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no output device available")]
    NoDevice,

    #[error("audio backend error: {0}")]
    Backend(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("no supported output config for stereo f32")]
    ConfigError,
}

pub type AudioResult<T> = Result<T, AudioError>;

/// Clip fetch/decode errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed for '{url}': {reason}")]
    Fetch { url: String, reason: String },

    #[error("decode failed for '{url}': {reason}")]
    Decode { url: String, reason: String },

    #[error("'{url}' decoded to zero frames")]
    Empty { url: String },

    #[error("unknown track '{0}'")]
    UnknownTrack(String),
}
