//! Device listing and identifier resolution.
//!
//! Identifiers are the backend's stable driver ids. An absent or empty id
//! always means "backend default".

use crate::models::device::DeviceInfo;
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::playback_backend::PlaybackBackend;

/// Enabled voice-input devices (microphones, headsets, line-in, ...).
pub fn input_devices(backend: &dyn CaptureBackend) -> Vec<DeviceInfo> {
    backend
        .capture_devices()
        .into_iter()
        .filter(|d| d.enabled && d.kind.is_voice_input())
        .collect()
}

/// Enabled output devices.
pub fn output_devices(backend: &dyn PlaybackBackend) -> Vec<DeviceInfo> {
    backend
        .playback_devices()
        .into_iter()
        .filter(|d| d.enabled)
        .collect()
}

/// Backend index of the enabled voice-input device with identifier `id`.
pub fn find_capture_device(backend: &dyn CaptureBackend, id: &str) -> Option<usize> {
    backend
        .capture_devices()
        .iter()
        .position(|d| d.enabled && d.kind.is_voice_input() && d.id == id)
}

/// Backend index of the enabled output device with identifier `id`.
pub fn find_output_device(backend: &dyn PlaybackBackend, id: &str) -> Option<usize> {
    backend
        .playback_devices()
        .iter()
        .position(|d| d.enabled && d.id == id)
}

/// Normalizes "" to None.
pub(crate) fn requested_id(id: Option<&str>) -> Option<&str> {
    id.filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::DeviceKind;
    use crate::testing::{MockCaptureBackend, MockPlaybackBackend};

    fn capture_backend() -> MockCaptureBackend {
        MockCaptureBackend::with_devices(vec![
            DeviceInfo::new("loopback", "Stereo Mix", DeviceKind::Speakers),
            DeviceInfo::new("usb-mic", "USB Microphone", DeviceKind::Microphone),
            DeviceInfo::new("old-headset", "Headset", DeviceKind::Headset).disabled(),
            DeviceInfo::new("line-in", "Line In", DeviceKind::Line),
        ])
    }

    #[test]
    fn input_listing_keeps_enabled_voice_inputs() {
        let backend = capture_backend();
        let ids: Vec<_> = input_devices(&backend).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["usb-mic", "line-in"]);
    }

    #[test]
    fn capture_lookup_returns_backend_index() {
        let backend = capture_backend();
        assert_eq!(find_capture_device(&backend, "line-in"), Some(3));
        assert_eq!(find_capture_device(&backend, "loopback"), None);
        assert_eq!(find_capture_device(&backend, "old-headset"), None);
    }

    #[test]
    fn output_listing_skips_disabled() {
        let backend = MockPlaybackBackend::with_devices(vec![
            DeviceInfo::new("speakers", "Speakers", DeviceKind::Speakers),
            DeviceInfo::new("hdmi", "HDMI", DeviceKind::Digital).disabled(),
            DeviceInfo::new("phones", "Headphones", DeviceKind::Headphones),
        ]);

        let ids: Vec<_> = output_devices(&backend).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["speakers", "phones"]);
        assert_eq!(find_output_device(&backend, "phones"), Some(2));
        assert_eq!(find_output_device(&backend, "hdmi"), None);
    }

    #[test]
    fn empty_id_means_default() {
        assert_eq!(requested_id(Some("")), None);
        assert_eq!(requested_id(None), None);
        assert_eq!(requested_id(Some("mic")), Some("mic"));
    }
}
