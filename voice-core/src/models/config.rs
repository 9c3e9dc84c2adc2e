use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::VoiceError;

/// Samples per codec frame (20 ms at 48 kHz).
pub const DEFAULT_FRAME_SIZE: usize = 960;
/// Largest encoded packet accepted from the encoder.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 32_768;
/// Capacity of the capture and per-stream ring buffers, in samples.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture device identifier, or None for the backend default.
    pub device_id: Option<String>,

    /// Capture sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Samples the backend delivers per capture callback (default: 420).
    pub frames_per_buffer: u32,

    /// Encoder bitrate in bits per second (default: 32000).
    pub bitrate: u32,

    /// Samples per encoded frame (default: 960).
    pub frame_size: usize,

    /// Packets larger than this are dropped (default: 32768).
    pub max_packet_size: usize,

    /// Capacity of the frame-accumulation ring buffer (default: 8192).
    pub buffer_capacity: usize,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.frame_size == 0 {
            return Err("frame size must be positive".into());
        }
        if self.bitrate == 0 {
            return Err("bitrate must be positive".into());
        }
        if self.max_packet_size == 0 {
            return Err("max packet size must be positive".into());
        }
        if self.buffer_capacity < self.frame_size {
            return Err(format!(
                "buffer capacity {} cannot hold a {}-sample frame",
                self.buffer_capacity, self.frame_size
            ));
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: 48_000,
            frames_per_buffer: 420,
            bitrate: 32_000,
            frame_size: DEFAULT_FRAME_SIZE,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Configuration for the playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output device identifier, or None for the backend default.
    pub device_id: Option<String>,

    /// Output and stream sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Control loop period in milliseconds (default: 16).
    pub tick_ms: u64,

    /// Maximum number of pending stream creation requests (default: 16).
    pub queue_capacity: usize,

    /// Capacity of each local stream's ring buffer (default: 8192).
    pub stream_buffer_capacity: usize,

    /// Initial device buffer length in milliseconds, if overriding the backend.
    pub buffering_ms: Option<u32>,
}

impl OutputConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.tick_ms == 0 {
            return Err("tick period must be positive".into());
        }
        if self.queue_capacity == 0 {
            return Err("request queue capacity must be positive".into());
        }
        if self.stream_buffer_capacity == 0 {
            return Err("stream buffer capacity must be positive".into());
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: 48_000,
            tick_ms: 16,
            queue_capacity: 16,
            stream_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            buffering_ms: None,
        }
    }
}

/// Capture and output settings persisted together by a host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub capture: CaptureConfig,
    pub output: OutputConfig,
}

impl VoiceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, VoiceError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VoiceError::Configuration(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, VoiceError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VoiceError::Configuration(format!("failed to serialize config: {}", e)))
    }

    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, VoiceError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            VoiceError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), VoiceError> {
        let json = self.to_json_string()?;
        std::fs::write(path, json).map_err(|e| {
            VoiceError::Configuration(format!("failed to write {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<(), VoiceError> {
        self.capture.validate().map_err(VoiceError::Configuration)?;
        self.output.validate().map_err(VoiceError::Configuration)
    }
}
