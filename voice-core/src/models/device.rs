use serde::{Deserialize, Serialize};

/// Kind of endpoint reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Microphone,
    Handset,
    Headset,
    Line,
    Digital,
    Speakers,
    Headphones,
    Network,
    Unknown,
}

impl DeviceKind {
    /// Whether this kind of endpoint can be used as a voice input.
    pub fn is_voice_input(&self) -> bool {
        matches!(
            self,
            Self::Microphone | Self::Handset | Self::Headset | Self::Line | Self::Digital
        )
    }
}

/// An audio device exposed by the backend.
///
/// `id` is the stable driver identifier used to select a device; `name` is
/// for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub kind: DeviceKind,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            kind,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
