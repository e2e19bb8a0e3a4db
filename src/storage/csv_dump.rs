//! Semicolon-separated dumps of render contexts.
//!
//! Four files per dump: subnetworks, communities, nodes and links. Rows of
//! every context go into the same files and are told apart by GUID.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use bevy_math::Vec3;
use csv::{Writer, WriterBuilder};

use crate::color;
use crate::contexts::NetworkContext;
use crate::error::AppError;
use crate::graph::NetworkGlobal;
use crate::models::{PropBag, PropValue};

pub const DELIMITER: u8 = b';';

const COMMUNITY_HEADERS: [&str; 8] = [
    "commId",
    "selected",
    "subnetworkId",
    "GUID",
    "mass",
    "massCenter",
    "size",
    "state",
];

const NODE_HEADERS: [&str; 9] = [
    "nodeId", "label", "degree", "selected", "commGUID", "GUID", "size", "pos", "color",
];

const LINK_HEADERS: [&str; 10] = [
    "linkId",
    "sourceGUID",
    "targetGUID",
    "selected",
    "GUID",
    "bundlingStrength",
    "width",
    "colorStart",
    "colorEnd",
    "alpha",
];

// ============================================================================
// Dump description
// ============================================================================

/// Paths of one dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFiles {
    pub subnetworks: PathBuf,
    pub communities: PathBuf,
    pub nodes: PathBuf,
    pub links: PathBuf,
}

impl DumpFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            subnetworks: dir.join("subnetwork.csv"),
            communities: dir.join("communities.csv"),
            nodes: dir.join("nodes.csv"),
            links: dir.join("links.csv"),
        }
    }

    /// Paths in load order.
    pub fn paths(&self) -> [&Path; 4] {
        [&self.subnetworks, &self.communities, &self.nodes, &self.links]
    }
}

/// How a property column is converted when loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Float,
    Boolean,
    Text,
}

/// A domain property written as an extra column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropColumn {
    pub name: String,
    pub kind: PropKind,
}

/// A written dump.
#[derive(Debug, Clone)]
pub struct Dump {
    pub files: DumpFiles,
    pub node_props: Vec<PropColumn>,
    pub link_props: Vec<PropColumn>,
    /// Rows written to the nodes, links and communities files.
    pub rows: DumpRows,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpRows {
    pub communities: usize,
    pub nodes: usize,
    pub links: usize,
}

// ============================================================================
// Dumper
// ============================================================================

/// Writes contexts over one Graph Model.
pub struct CsvDumper<'a> {
    global: &'a NetworkGlobal,
    only_dirty: bool,
    node_props: Vec<PropColumn>,
    link_props: Vec<PropColumn>,
}

impl<'a> CsvDumper<'a> {
    /// Every entity, with domain property columns.
    pub fn initial(global: &'a NetworkGlobal) -> Self {
        let node_props = prop_columns(
            global
                .nodes
                .iter()
                .filter(|n| !n.is_virtual)
                .map(|n| &n.props),
        );
        let link_props = prop_columns(global.links.iter().map(|l| &l.props));
        Self {
            global,
            only_dirty: false,
            node_props,
            link_props,
        }
    }

    /// Only entities dirty in the context or the Graph Model, without
    /// property columns.
    pub fn update(global: &'a NetworkGlobal) -> Self {
        Self {
            global,
            only_dirty: true,
            node_props: Vec::new(),
            link_props: Vec::new(),
        }
    }

    pub fn dump(&self, dir: &Path, contexts: &[&NetworkContext]) -> Result<Dump, AppError> {
        let files = DumpFiles::in_dir(dir);

        let mut subnetworks = writer(&files.subnetworks)?;
        let mut communities = writer(&files.communities)?;
        let mut nodes = writer(&files.nodes)?;
        let mut links = writer(&files.links)?;

        subnetworks.write_record(["subnetworkId"])?;
        communities.write_record(COMMUNITY_HEADERS)?;
        nodes.write_record(
            NODE_HEADERS
                .iter()
                .copied()
                .chain(self.node_props.iter().map(|p| p.name.as_str())),
        )?;
        links.write_record(
            LINK_HEADERS
                .iter()
                .copied()
                .chain(self.link_props.iter().map(|p| p.name.as_str())),
        )?;

        let mut rows = DumpRows::default();
        for context in contexts {
            subnetworks.write_record([context.subnetwork_id.to_string()])?;
            rows.communities += self.write_communities(&mut communities, context)?;
            rows.nodes += self.write_nodes(&mut nodes, context)?;
            rows.links += self.write_links(&mut links, context)?;
        }

        flush(subnetworks, &files.subnetworks)?;
        flush(communities, &files.communities)?;
        flush(nodes, &files.nodes)?;
        flush(links, &files.links)?;

        tracing::debug!(
            dir = %dir.display(),
            contexts = contexts.len(),
            communities = rows.communities,
            nodes = rows.nodes,
            links = rows.links,
            only_dirty = self.only_dirty,
            "Wrote CSV dump"
        );

        Ok(Dump {
            files,
            node_props: self.node_props.clone(),
            link_props: self.link_props.clone(),
            rows,
        })
    }

    fn write_communities(
        &self,
        out: &mut Writer<File>,
        context: &NetworkContext,
    ) -> Result<usize, AppError> {
        let subnetwork = context.subnetwork_id;
        let mut written = 0;
        for (&id, community) in &context.communities {
            let Some(global) = self.global.communities.get(id) else {
                continue;
            };
            if self.only_dirty && !community.dirty && !global.dirty {
                continue;
            }
            out.write_record([
                id.to_string(),
                global.selected_on.contains(&subnetwork).to_string(),
                subnetwork.to_string(),
                community.guid.clone(),
                community.mass.to_string(),
                format_vec(community.mass_center),
                community.size.to_string(),
                community.state.as_str().to_string(),
            ])?;
            written += 1;
        }
        Ok(written)
    }

    fn write_nodes(&self, out: &mut Writer<File>, context: &NetworkContext) -> Result<usize, AppError> {
        let subnetwork = context.subnetwork_id;
        let mut written = 0;
        for (&id, node) in &context.nodes {
            let Some(global) = self.global.nodes.get(id) else {
                continue;
            };
            if global.is_virtual || (self.only_dirty && !node.dirty && !global.dirty) {
                continue;
            }
            let community_guid = node
                .community_id
                .and_then(|c| context.communities.get(&c))
                .map(|c| c.guid.clone())
                .unwrap_or_default();

            let mut record = vec![
                id.to_string(),
                global.label.clone(),
                global.degree.to_string(),
                global.selected_on.contains(&subnetwork).to_string(),
                community_guid,
                node.guid.clone(),
                node.size.to_string(),
                format_vec(node.position),
                color::to_hex(node.color),
            ];
            record.extend(prop_values(&self.node_props, &global.props));
            out.write_record(&record)?;
            written += 1;
        }
        Ok(written)
    }

    fn write_links(&self, out: &mut Writer<File>, context: &NetworkContext) -> Result<usize, AppError> {
        let mut written = 0;
        for (&id, link) in &context.links {
            let Some(global) = self.global.links.get(id) else {
                continue;
            };
            if self.only_dirty && !link.dirty && !global.dirty {
                continue;
            }
            let (Some(source), Some(target)) = (
                context.nodes.get(&global.source_id),
                context.nodes.get(&global.target_id),
            ) else {
                continue;
            };

            let mut record = vec![
                id.to_string(),
                source.guid.clone(),
                target.guid.clone(),
                link.selected.to_string(),
                link.guid.clone(),
                link.bundling_strength.to_string(),
                link.width.to_string(),
                color::to_hex(link.color_start),
                color::to_hex(link.color_end),
                link.alpha.to_string(),
            ];
            record.extend(prop_values(&self.link_props, &global.props));
            out.write_record(&record)?;
            written += 1;
        }
        Ok(written)
    }
}

fn writer(path: &Path) -> Result<Writer<File>, AppError> {
    Ok(WriterBuilder::new().delimiter(DELIMITER).from_path(path)?)
}

fn flush(mut writer: Writer<File>, path: &Path) -> Result<(), AppError> {
    writer.flush().map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn format_vec(v: Vec3) -> String {
    format!("({}, {}, {})", v.x, v.y, v.z)
}

/// Union of property names, typed by the first non-null value seen.
fn prop_columns<'b>(bags: impl Iterator<Item = &'b PropBag>) -> Vec<PropColumn> {
    let mut kinds: BTreeMap<&str, Option<PropKind>> = BTreeMap::new();
    for bag in bags {
        for (name, value) in bag {
            let kind = kinds.entry(name.as_str()).or_default();
            if kind.is_none() {
                *kind = match value {
                    PropValue::Null => None,
                    PropValue::Bool(_) => Some(PropKind::Boolean),
                    PropValue::Number(_) => Some(PropKind::Float),
                    PropValue::Text(_) | PropValue::Other(_) => Some(PropKind::Text),
                };
            }
        }
    }
    kinds
        .into_iter()
        .map(|(name, kind)| PropColumn {
            name: name.to_string(),
            kind: kind.unwrap_or(PropKind::Text),
        })
        .collect()
}

fn prop_values<'b>(columns: &'b [PropColumn], props: &'b PropBag) -> impl Iterator<Item = String> + 'b {
    columns.iter().map(|column| match props.get(&column.name) {
        None | Some(PropValue::Null) => String::new(),
        Some(value) => value.to_string(),
    })
}
