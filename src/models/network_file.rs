//! Serde model of the per-layout JSON graph files.

use bevy_math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::PropBag;

/// External node ID as stored in the files.
pub type NodeId = i32;
/// External link ID as stored in the files.
pub type LinkId = i32;
/// Community ID assigned by the tagging pass.
pub type CommunityId = i32;

/// Ancestor index used by the files for "no ancestor".
pub const NO_ANCESTOR: NodeId = -1;

/// One layout variant of a graph: the full node and link records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkFileData {
    /// Whether domain props are coded (numeric categories) rather than raw.
    #[serde(default)]
    pub coded: bool,
    /// ID of the tree root.
    pub root_idx: NodeId,
    pub nodes: Vec<NodeFileData>,
    #[serde(default)]
    pub links: Vec<LinkFileData>,
}

/// A 3D position as written by the layout exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<FilePosition> for Vec3 {
    fn from(p: FilePosition) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

/// Node record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFileData {
    pub idx: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub community_idx: Option<i32>,
    /// Color string (`#rrggbb` or a color name).
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub virtual_node: bool,
    #[serde(default)]
    pub height: i32,
    #[serde(default = "default_ancestor")]
    pub anc_idx: NodeId,
    #[serde(default)]
    pub child_idx: Vec<NodeId>,
    #[serde(default, rename = "_position3D")]
    pub position_3d: Option<FilePosition>,
    #[serde(default, rename = "pos2D")]
    pub pos_2d: Option<[f32; 2]>,
    #[serde(default, rename = "pos3D")]
    pub pos_3d: Option<[f32; 3]>,
    #[serde(default)]
    pub props: PropBag,
}

fn default_ancestor() -> NodeId {
    NO_ANCESTOR
}

impl NodeFileData {
    /// Precomputed 3D position, preferring the exporter's `_position3D`.
    pub fn position(&self) -> Option<Vec3> {
        self.position_3d
            .map(Vec3::from)
            .or_else(|| self.pos_3d.map(Vec3::from_array))
    }

    /// Precomputed 2D position.
    pub fn position_2d(&self) -> Option<Vec2> {
        self.pos_2d.map(Vec2::from_array)
    }

    pub fn ancestor(&self) -> Option<NodeId> {
        (self.anc_idx != NO_ANCESTOR).then_some(self.anc_idx)
    }
}

/// Link record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFileData {
    pub link_idx: LinkId,
    pub source_idx: NodeId,
    pub target_idx: NodeId,
    #[serde(default)]
    pub spline: bool,
    #[serde(default)]
    pub props: PropBag,
}

/// Generates a new ULID string used as a per-instance GUID.
pub fn generate_guid() -> String {
    Ulid::new().to_string()
}
