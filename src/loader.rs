//! Loads the per-variant layout files of a dataset.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bevy_math::Vec3;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{NetworkFileData, NodeFileData, NodeId};

/// Named layout variants shipped with a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Spherical,
    Hairball,
    Flat,
    Cluster,
    Spider,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 5] = [
        LayoutKind::Spherical,
        LayoutKind::Hairball,
        LayoutKind::Flat,
        LayoutKind::Cluster,
        LayoutKind::Spider,
    ];

    /// File name suffix of the variant.
    pub fn suffix(self) -> &'static str {
        match self {
            LayoutKind::Spherical => "spherical",
            LayoutKind::Hairball => "hairball",
            LayoutKind::Flat => "flat",
            LayoutKind::Cluster => "cluster",
            LayoutKind::Spider => "spider",
        }
    }

    /// Whether a dataset must ship this variant.
    pub fn is_required(self) -> bool {
        !matches!(self, LayoutKind::Spider)
    }

    /// `{dataset}-layout.json-{suffix}.json`
    pub fn file_name(self, dataset: &str) -> String {
        format!("{}-layout.json-{}.json", dataset, self.suffix())
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One loaded layout file with an ID→index map.
#[derive(Debug, Clone)]
pub struct LayoutData {
    pub file: NetworkFileData,
    id_to_idx: HashMap<NodeId, usize>,
}

impl LayoutData {
    pub fn new(file: NetworkFileData) -> Self {
        let id_to_idx = file
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.idx, idx))
            .collect();
        Self { file, id_to_idx }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeFileData> {
        self.id_to_idx.get(&id).map(|&idx| &self.file.nodes[idx])
    }

    /// Precomputed 3D position of a node.
    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.node(id).and_then(NodeFileData::position)
    }

    /// Precomputed 2D position lifted onto the XZ plane, falling back to 3D.
    pub fn floor_position(&self, id: NodeId) -> Option<Vec3> {
        let node = self.node(id)?;
        node.position_2d()
            .map(|p| Vec3::new(p.x, 0.0, p.y))
            .or_else(|| node.position())
    }
}

/// All layout variants of one dataset.
#[derive(Debug, Clone)]
pub struct LayoutSet {
    layouts: HashMap<LayoutKind, LayoutData>,
}

impl LayoutSet {
    /// Reads every variant of `dataset` from `dir`.
    ///
    /// Missing required variants abort the load; a missing spider variant
    /// falls back to spherical positions.
    pub fn load(dir: &Path, dataset: &str) -> Result<Self, AppError> {
        let mut layouts = HashMap::new();

        for kind in LayoutKind::ALL {
            let path = dir.join(kind.file_name(dataset));
            if !path.exists() {
                if kind.is_required() {
                    return Err(AppError::MissingFile(path));
                }
                tracing::debug!(layout = %kind, "Optional layout not found, using spherical");
                continue;
            }

            let file = read_network_file(&path)?;
            tracing::info!(layout = %kind, nodes = file.nodes.len(), "Loaded layout");
            layouts.insert(kind, LayoutData::new(file));
        }

        Ok(Self { layouts })
    }

    /// Builds a set from already parsed files.
    pub fn from_files(files: impl IntoIterator<Item = (LayoutKind, NetworkFileData)>) -> Self {
        let layouts = files
            .into_iter()
            .map(|(kind, file)| (kind, LayoutData::new(file)))
            .collect();
        Self { layouts }
    }

    /// The variant, with spider falling back to spherical.
    pub fn get(&self, kind: LayoutKind) -> Option<&LayoutData> {
        self.layouts.get(&kind).or_else(|| match kind {
            LayoutKind::Spider => self.layouts.get(&LayoutKind::Spherical),
            _ => None,
        })
    }

    /// The spherical variant, which also defines the graph structure.
    pub fn base(&self) -> Option<&LayoutData> {
        self.layouts.get(&LayoutKind::Spherical)
    }

    pub fn position(&self, kind: LayoutKind, id: NodeId) -> Option<Vec3> {
        let layout = self.get(kind)?;
        match kind {
            LayoutKind::Flat => layout.floor_position(id),
            _ => layout.position(id),
        }
    }
}

/// Parses a single layout file.
pub fn read_network_file(path: &Path) -> Result<NetworkFileData, AppError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: PathBuf::from(path),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| AppError::Json {
        path: PathBuf::from(path),
        source,
    })
}
