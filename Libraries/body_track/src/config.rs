// config.rs

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::writer::EmissionPolicy;

/// Settings of a recording. Missing JSON fields take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub width: u16,
    pub height: u16,
    pub timescale: u32,   // Movie and track time units per second
    pub frame_rate: u32,  // Nominal capture rate, used to size the last frame
    pub video_codec: String,
    pub audio: Option<AudioConfig>,
    pub emission: EmissionPolicy,
    pub queue_depth: usize, // Samples in flight per track before new ones are dropped
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub codec: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub start_paused: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            width: 640,
            height: 480,
            timescale: 600,
            frame_rate: 30,
            video_codec: "avc1".to_string(),
            audio: None,
            emission: EmissionPolicy::Dense,
            queue_depth: 8,
            output_dir: std::env::temp_dir(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            sample_rate: 44_100,
            channels: 1,
            codec: "mp4a".to_string(),
        }
    }
}

impl RecorderConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Duration of one frame in the recording timescale, at least 1.
    pub fn frame_duration(&self) -> u64 {
        (self.timescale as u64 / self.frame_rate.max(1) as u64).max(1)
    }
}

/// Packs a codec name such as `avc1` into a four character code,
/// padding short names with spaces.
pub(crate) fn fourcc(name: &str) -> [u8; 4] {
    let mut code = *b"    ";
    for (slot, byte) in code.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RecorderConfig =
            serde_json::from_str(r#"{ "width": 1280, "emission": "transitions", "audio": {} }"#).unwrap();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 480);
        assert_eq!(config.emission, EmissionPolicy::Transitions);
        assert_eq!(config.audio, Some(AudioConfig::default()));
        assert_eq!(config.frame_duration(), 20);
    }

    #[test]
    fn codec_names_pad_to_four_bytes() {
        assert_eq!(&fourcc("avc1"), b"avc1");
        assert_eq!(&fourcc("ac3"), b"ac3 ");
        assert_eq!(&fourcc("hvc1x"), b"hvc1");
    }
}
