//! Anchor transforms placing precomputed layouts in world space.

use bevy_math::{Quat, Vec3};
use serde::Deserialize;

/// Translation, rotation and scale applied to layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RawTransform")]
pub struct TransformInfo {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformInfo {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformInfo {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Layout space to world space.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawTransform {
    translation: [f32; 3],
    /// Quaternion as `[x, y, z, w]`.
    rotation: [f32; 4],
    scale: [f32; 3],
}

impl Default for RawTransform {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl From<RawTransform> for TransformInfo {
    fn from(raw: RawTransform) -> Self {
        Self {
            translation: Vec3::from_array(raw.translation),
            rotation: Quat::from_array(raw.rotation).normalize(),
            scale: Vec3::from_array(raw.scale),
        }
    }
}

/// Anchors for every layout variant.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutAnchors {
    pub spherical: TransformInfo,
    pub hairball: TransformInfo,
    pub spider: TransformInfo,
    pub cluster: TransformInfo,
    pub floor: TransformInfo,
    /// Whole-network placement, e.g. flattened onto a surface.
    pub world: TransformInfo,
}
