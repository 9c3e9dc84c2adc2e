use serde::{Deserialize, Serialize};

/// A 3D vector in the backend's world coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Position and orientation of the local listener ("ears") for 3D mixing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerPose {
    pub position: Vector3,
    pub velocity: Vector3,
    pub front: Vector3,
    pub up: Vector3,
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            velocity: Vector3::ZERO,
            front: Vector3::new(0.0, 0.0, 1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

/// 3D processing mode of an output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode3d {
    /// Non-positional playback.
    Off,
    /// Positional playback relative to the listener.
    Normal,
}

/// Channel-level 3D parameters pushed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel3dAttributes {
    pub mode: Mode3d,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rolloff_factor: f32,
}

/// Spatial state of a playback stream.
///
/// Setters on `Stream` only touch this struct; nothing reaches the backend
/// until the stream re-applies it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialAttributes {
    pub position: Vector3,
    pub velocity: Vector3,
    pub direction: Vector3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rolloff_factor: f32,
    pub enabled: bool,
}

impl SpatialAttributes {
    /// Channel attributes matching the current state.
    pub fn channel_attributes(&self) -> Channel3dAttributes {
        if self.enabled {
            Channel3dAttributes {
                mode: Mode3d::Normal,
                min_distance: self.min_distance,
                max_distance: self.max_distance,
                rolloff_factor: self.rolloff_factor,
            }
        } else {
            Channel3dAttributes {
                mode: Mode3d::Off,
                min_distance: 0.0,
                max_distance: 0.0,
                rolloff_factor: self.rolloff_factor,
            }
        }
    }
}

impl Default for SpatialAttributes {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            velocity: Vector3::ZERO,
            direction: Vector3::ZERO,
            min_distance: 1.0,
            max_distance: 10_000.0,
            rolloff_factor: 1.0,
            enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_attributes_switch_mode_off() {
        let attrs = SpatialAttributes {
            min_distance: 5.0,
            max_distance: 50.0,
            ..Default::default()
        };

        let channel = attrs.channel_attributes();
        assert_eq!(channel.mode, Mode3d::Off);
        assert_eq!(channel.min_distance, 0.0);
    }

    #[test]
    fn enabled_attributes_carry_distances() {
        let attrs = SpatialAttributes {
            min_distance: 5.0,
            max_distance: 50.0,
            rolloff_factor: 2.0,
            enabled: true,
            ..Default::default()
        };

        let channel = attrs.channel_attributes();
        assert_eq!(channel.mode, Mode3d::Normal);
        assert_eq!(channel.min_distance, 5.0);
        assert_eq!(channel.max_distance, 50.0);
        assert_eq!(channel.rolloff_factor, 2.0);
    }

    #[test]
    fn default_pose_faces_forward() {
        let pose = ListenerPose::default();
        assert_eq!(pose.front, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(pose.up, Vector3::new(0.0, 1.0, 0.0));
    }
}
