//! Bulk loading of CSV dumps into Neo4j.

use std::path::Path;

use async_trait::async_trait;
use neo4rs::{query, Graph};

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::models::NodeId;

use super::csv_dump::{Dump, PropColumn, PropKind};
use super::NetworkStorage;

const CONSTRAINTS: [&str; 3] = [
    "CREATE CONSTRAINT node_guid IF NOT EXISTS FOR (n:Node) REQUIRE n.GUID IS UNIQUE",
    "CREATE CONSTRAINT community_guid IF NOT EXISTS FOR (c:Community) REQUIRE c.GUID IS UNIQUE",
    "CREATE CONSTRAINT points_to_guid IF NOT EXISTS FOR ()-[p:POINTS_TO]-() REQUIRE p.GUID IS UNIQUE",
];

const SUBNETWORK_LOAD: &str = "LOAD CSV WITH HEADERS FROM $filename AS row FIELDTERMINATOR ';' \
     CALL (row) { \
         MERGE (s:Subnetwork { subnetworkId: toInteger(row.subnetworkId) }) \
     } IN TRANSACTIONS OF 500 ROWS";

const COMMUNITY_LOAD: &str = "LOAD CSV WITH HEADERS FROM $filename AS row FIELDTERMINATOR ';' \
     CALL (row) { \
         MERGE (c:Community { GUID: row.GUID }) \
         SET c.commId = toInteger(row.commId), \
             c.selected = toBoolean(row.selected), \
             c.mass = toFloat(row.mass), \
             c.massCenter = row.massCenter, \
             c.size = toFloat(row.size), \
             c.state = row.state \
         WITH * \
         MATCH (s:Subnetwork { subnetworkId: toInteger(row.subnetworkId) }) \
         MERGE (c)-[:PART_OF]->(s) \
     } IN TRANSACTIONS OF 500 ROWS";

/// Stores dumps through `LOAD CSV`.
///
/// The database must be allowed to read the dump directory
/// (`server.directories.import` unset or pointing at it).
pub struct Neo4jStorage {
    graph: Graph,
}

impl Neo4jStorage {
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, AppError> {
        tracing::info!(uri = %config.uri, "Connecting to Neo4j");
        let graph = Graph::new(
            &config.uri,
            &config.user,
            config.password.as_deref().unwrap_or(""),
        )
        .await?;
        Ok(Self { graph })
    }

    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    async fn ensure_constraints(&self) -> Result<(), AppError> {
        for constraint in CONSTRAINTS {
            self.run(constraint.to_string(), None).await?;
        }
        Ok(())
    }

    async fn load(&self, dump: &Dump) -> Result<(), AppError> {
        let files = &dump.files;
        self.run(SUBNETWORK_LOAD.to_string(), Some(files.subnetworks.as_path()))
            .await?;
        self.run(COMMUNITY_LOAD.to_string(), Some(files.communities.as_path()))
            .await?;
        self.run(node_load(&dump.node_props), Some(files.nodes.as_path()))
            .await?;
        self.run(link_load(&dump.link_props), Some(files.links.as_path()))
            .await?;

        tracing::info!(
            communities = dump.rows.communities,
            nodes = dump.rows.nodes,
            links = dump.rows.links,
            "Loaded dump into Neo4j"
        );
        Ok(())
    }

    async fn run(&self, cypher: String, file: Option<&Path>) -> Result<(), AppError> {
        let mut q = query(&cypher);
        if let Some(path) = file {
            q = q.param("filename", file_uri(path)?);
        }
        self.graph.run(q).await.map_err(|e| {
            tracing::error!(error = %e, "Neo4j load failed");
            AppError::Query {
                message: e.to_string(),
                query: cypher.clone(),
            }
        })
    }

    /// Node IDs from a read query returning stored nodes as `n`.
    pub async fn query_node_ids(&self, cypher: &str) -> Result<Vec<NodeId>, AppError> {
        let mut result = self.graph.execute(query(cypher)).await?;
        let mut ids = Vec::new();
        while let Some(row) = result.next().await? {
            let node: neo4rs::Node = row.get("n").map_err(|e| AppError::Query {
                message: format!("Failed to read node column: {}", e),
                query: cypher.to_string(),
            })?;
            let id: i64 = node.get("nodeId").map_err(|e| AppError::Query {
                message: format!("Node without nodeId: {}", e),
                query: cypher.to_string(),
            })?;
            ids.push(id as NodeId);
        }
        Ok(ids)
    }
}

#[async_trait]
impl NetworkStorage for Neo4jStorage {
    async fn initial_store(&self, dump: &Dump) -> Result<(), AppError> {
        self.ensure_constraints().await?;
        self.load(dump).await
    }

    async fn update_store(&self, dump: &Dump) -> Result<(), AppError> {
        self.load(dump).await
    }
}

fn node_load(props: &[PropColumn]) -> String {
    format!(
        "LOAD CSV WITH HEADERS FROM $filename AS row FIELDTERMINATOR ';' \
         CALL (row) {{ \
             MERGE (n:Node {{ GUID: row.GUID }}) \
             SET n.nodeId = toInteger(row.nodeId), \
                 n.label = row.label, \
                 n.degree = toFloat(row.degree), \
                 n.selected = toBoolean(row.selected), \
                 n.size = toFloat(row.size), \
                 n.pos = row.pos, \
                 n.color = row.color \
             {} \
             WITH * \
             MATCH (c:Community {{ GUID: row.commGUID }}) \
             MERGE (n)-[:PART_OF]->(c) \
         }} IN TRANSACTIONS OF 500 ROWS",
        prop_sets("n", props)
    )
}

fn link_load(props: &[PropColumn]) -> String {
    format!(
        "LOAD CSV WITH HEADERS FROM $filename AS row FIELDTERMINATOR ';' \
         CALL (row) {{ \
             MATCH (from:Node {{ GUID: row.sourceGUID }}) \
             MATCH (to:Node {{ GUID: row.targetGUID }}) \
             MERGE (from)-[l:POINTS_TO {{ GUID: row.GUID }}]->(to) \
             SET l.linkId = toInteger(row.linkId), \
                 l.selected = toBoolean(row.selected), \
                 l.bundlingStrength = toFloat(row.bundlingStrength), \
                 l.width = toFloat(row.width), \
                 l.colorStart = row.colorStart, \
                 l.colorEnd = row.colorEnd, \
                 l.alpha = toFloat(row.alpha) \
             {} \
         }} IN TRANSACTIONS OF 500 ROWS",
        prop_sets("l", props)
    )
}

/// `SET` clauses for domain property columns.
fn prop_sets(var: &str, props: &[PropColumn]) -> String {
    props
        .iter()
        .map(|column| {
            let value = format!("row.`{}`", column.name);
            let converted = match column.kind {
                PropKind::Float => format!("toFloat({})", value),
                PropKind::Boolean => format!("toBoolean({})", value),
                PropKind::Text => value,
            };
            format!("SET {}.`{}` = {}", var, column.name, converted)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `file:///` URI for `LOAD CSV`, with forward slashes.
pub fn file_uri(path: &Path) -> Result<String, AppError> {
    let absolute = std::path::absolute(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let normalized = absolute.to_string_lossy().replace('\\', "/");
    Ok(format!("file:///{}", normalized.trim_start_matches('/')))
}
