//! Per-context visual settings.

use bevy_color::Srgba;
use serde::Deserialize;

use crate::color::{self, GRAY};

/// Scales and colors shared by every entity of a context.
///
/// Encodings and edits are expressed relative to these values: a node size
/// of `1.0` means `node_scale`, a link alpha of `1.0` means `link_normal_alpha`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub node_scale: f32,
    pub link_width: f32,
    pub edge_bundling_strength: f32,
    pub link_minimum_alpha: f32,
    /// Alpha of links between unfocused nodes.
    pub link_normal_alpha: f32,
    /// Alpha of links between communities focused in different layouts.
    pub link_context_alpha: f32,
    /// Alpha of links from a focused community to the unfocused rest.
    pub link_context2focus_alpha: f32,
    #[serde(deserialize_with = "color::deserialize")]
    pub node_default_color: Srgba,
    #[serde(deserialize_with = "color::deserialize")]
    pub link_default_color: Srgba,
    #[serde(deserialize_with = "color::deserialize")]
    pub select_color: Srgba,
    #[serde(deserialize_with = "color::deserialize")]
    pub hover_color: Srgba,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            node_scale: 1.0,
            link_width: 0.0025,
            edge_bundling_strength: 0.8,
            link_minimum_alpha: 0.01,
            link_normal_alpha: 0.05,
            link_context_alpha: 0.5,
            link_context2focus_alpha: 0.8,
            node_default_color: GRAY,
            link_default_color: Srgba::WHITE,
            select_color: Srgba::rgb(1.0, 0.92, 0.016),
            hover_color: Srgba::rgb(0.0, 1.0, 1.0),
        }
    }
}
