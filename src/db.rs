use std::{fmt, str::FromStr, sync::Arc};

/// This wraps a simple sqlite database.
/// The database stores imported workflows, one row per workflow, with the graph kept in
/// wire format. Graphs are re-parsed on every load, so internal node ids are only stable for
/// as long as the caller holds on to a loaded record.
///
use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use crate::{
    config::ConfigModule,
    storage::WorkflowCleanup,
    workflow::{self, Graph, InputValue, UuidGenerator},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMethod {
    File,
    Clipboard,
    Url,
    Preset,
    ServerSync,
}

impl AddMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddMethod::File => "file",
            AddMethod::Clipboard => "clipboard",
            AddMethod::Url => "url",
            AddMethod::Preset => "preset",
            AddMethod::ServerSync => "server-sync",
        }
    }
}

impl fmt::Display for AddMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "file" => AddMethod::File,
            "clipboard" => AddMethod::Clipboard,
            "url" => AddMethod::Url,
            "preset" => AddMethod::Preset,
            "server-sync" => AddMethod::ServerSync,
            other => bail!("unknown add method: {}", other),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRecord {
    pub id: String,
    pub name: String,
    pub server_id: String,
    pub data: Graph,
    pub add_method: AddMethod,
    /// Seconds since the epoch.
    pub created_at: u64,
    pub last_used: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub name: String,
    pub server_id: String,
    pub data: Graph,
    pub add_method: AddMethod,
}

/// Fields left as None are not touched.
#[derive(Debug, Clone, Default)]
pub struct WorkflowUpdate {
    pub name: Option<String>,
    pub server_id: Option<String>,
    pub data: Option<Graph>,
}

struct Database {
    conn: Connection,
    cleanup: Arc<dyn WorkflowCleanup>,
}

#[derive(Clone)]
pub struct DatabaseModule(Arc<Mutex<Database>>);

const SELECT_WORKFLOW: &str =
    "SELECT id, name, server_id, data, add_method, created_at, last_used FROM workflows";

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// Columns as stored; the graph still needs parsing.
struct RawRecord {
    id: String,
    name: String,
    server_id: String,
    data: String,
    add_method: String,
    created_at: i64,
    last_used: Option<i64>,
}

impl RawRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            server_id: row.get(2)?,
            data: row.get(3)?,
            add_method: row.get(4)?,
            created_at: row.get(5)?,
            last_used: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<WorkflowRecord> {
        let parsed = workflow::parse(&self.data, &mut UuidGenerator)
            .with_context(|| format!("stored workflow {} is corrupt", self.id))?;
        Ok(WorkflowRecord {
            add_method: self.add_method.parse()?,
            id: self.id,
            name: self.name,
            server_id: self.server_id,
            data: parsed.graph,
            created_at: self.created_at as u64,
            last_used: self.last_used.map(|t| t as u64),
        })
    }
}

impl DatabaseModule {
    pub async fn new(config: ConfigModule, cleanup: Arc<dyn WorkflowCleanup>) -> Result<Self> {
        let conn = config
            .with_config(|c| Connection::open(&c.database.path))
            .await
            .context("failed to open database")?;
        Self::with_connection(conn, cleanup)
    }

    pub fn with_connection(conn: Connection, cleanup: Arc<dyn WorkflowCleanup>) -> Result<Self> {
        Self::maybe_init_db(&conn)?;
        info!("Database initialized");
        Ok(Self(Arc::new(Mutex::new(Database { conn, cleanup }))))
    }

    fn maybe_init_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../schema.sql"))
            .context("failed to initialize database")?;
        Ok(())
    }

    // Non-public functions do NOT lock the database mutex.

    fn load(conn: &Connection, id: &str) -> Result<Option<WorkflowRecord>> {
        let raw = conn
            .query_row(&format!("{} WHERE id = ?", SELECT_WORKFLOW), [id], RawRecord::from_row)
            .optional()
            .context("failed to query workflow")?;
        raw.map(RawRecord::into_record).transpose()
    }

    fn load_all(conn: &Connection, server_id: Option<&str>) -> Result<Vec<WorkflowRecord>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE ?1 IS NULL OR server_id = ?1 ORDER BY created_at, name",
            SELECT_WORKFLOW
        ))?;
        let rows = stmt
            .query_map([server_id], RawRecord::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list workflows")?;
        // One bad row shouldn't hide the rest.
        Ok(rows
            .into_iter()
            .filter_map(|raw| match raw.into_record() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping workflow: {:?}", e);
                    None
                }
            })
            .collect())
    }

    fn store_graph(conn: &Connection, id: &str, graph: &Graph) -> Result<()> {
        let data = graph.to_json().context("failed to serialize workflow")?;
        conn.execute("UPDATE workflows SET data = ? WHERE id = ?", params![data, id])
            .context("failed to update workflow data")?;
        Ok(())
    }

    fn notify_cleanup(cleanup: &dyn WorkflowCleanup, server_id: &str, workflow_id: &str) {
        if let Err(e) = cleanup.cleanup_workflow_data(server_id, workflow_id) {
            error!("Failed to clean up data for workflow {}: {:?}", workflow_id, e);
        }
    }

    fn insert(conn: &Connection, new: NewWorkflow) -> Result<WorkflowRecord> {
        let record = WorkflowRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            server_id: new.server_id,
            data: new.data,
            add_method: new.add_method,
            created_at: now(),
            last_used: None,
        };
        let data = record.data.to_json().context("failed to serialize workflow")?;
        conn.execute(
            "INSERT INTO workflows (id, name, server_id, data, add_method, created_at, last_used) VALUES (?, ?, ?, ?, ?, ?, NULL)",
            params![
                record.id,
                record.name,
                record.server_id,
                data,
                record.add_method.as_str(),
                record.created_at as i64,
            ],
        )
        .context("failed to insert workflow")?;
        info!("Added workflow {} ({}, {} nodes)", record.name, record.id, record.data.len());
        Ok(record)
    }

    // Public functions MUST lock the database mutex.

    pub async fn add_workflow(&self, new: NewWorkflow) -> Result<WorkflowRecord> {
        let db = self.0.lock().await;
        Self::insert(&db.conn, new)
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        let db = self.0.lock().await;
        Self::load(&db.conn, id)
    }

    pub async fn list_workflows(&self, server_id: Option<&str>) -> Result<Vec<WorkflowRecord>> {
        let db = self.0.lock().await;
        Self::load_all(&db.conn, server_id)
    }

    /// Looks a workflow up by id, then by name.
    pub async fn find_workflow(&self, name_or_id: &str) -> Result<WorkflowRecord> {
        let db = self.0.lock().await;
        if let Some(record) = Self::load(&db.conn, name_or_id)? {
            return Ok(record);
        }
        let all = Self::load_all(&db.conn, None)?;
        let mut named: Vec<WorkflowRecord> = all.iter().filter(|r| r.name == name_or_id).cloned().collect();
        match named.len() {
            1 => return Ok(named.remove(0)),
            0 => {}
            n => bail!("{} workflows are named {}; use the id instead", n, name_or_id),
        }
        // No such workflow, so... do a Levenshtein distance check.
        let best = all
            .iter()
            .map(|r| (strsim::levenshtein(name_or_id, &r.name), &r.name))
            .min_by_key(|(distance, _)| *distance);
        match best {
            Some((distance, best)) if distance <= 3 => {
                bail!("Unknown workflow: {}. Did you mean {}?", name_or_id, best)
            }
            _ => bail!("Unknown workflow: {}", name_or_id),
        }
    }

    /// Returns false if there is no such workflow.
    pub async fn update_workflow(&self, id: &str, update: WorkflowUpdate) -> Result<bool> {
        let db = self.0.lock().await;
        if Self::load(&db.conn, id)?.is_none() {
            return Ok(false);
        }
        if let Some(name) = update.name {
            db.conn
                .execute("UPDATE workflows SET name = ? WHERE id = ?", params![name, id])
                .context("failed to rename workflow")?;
        }
        if let Some(server_id) = update.server_id {
            db.conn
                .execute("UPDATE workflows SET server_id = ? WHERE id = ?", params![server_id, id])
                .context("failed to move workflow")?;
        }
        if let Some(data) = update.data {
            Self::store_graph(&db.conn, id, &data)?;
        }
        Ok(true)
    }

    pub async fn update_usage(&self, id: &str) -> Result<bool> {
        let db = self.0.lock().await;
        let changed = db
            .conn
            .execute("UPDATE workflows SET last_used = ? WHERE id = ?", params![now() as i64, id])
            .context("failed to update usage")?;
        Ok(changed > 0)
    }

    /// Sets a single node input. Returns false, and writes nothing, when the workflow or node
    /// doesn't exist or the input already has that value.
    pub async fn update_node_input(&self, id: &str, node_key: &str, input_key: &str, value: InputValue) -> Result<bool> {
        let db = self.0.lock().await;
        let Some(record) = Self::load(&db.conn, id)? else {
            return Ok(false);
        };
        if !record.data.contains(node_key) || record.data.input(node_key, input_key) == Some(&value) {
            return Ok(false);
        }
        let updated = record.data.set_input(node_key, input_key, value);
        Self::store_graph(&db.conn, id, &updated)?;
        Ok(true)
    }

    /// Deletes the workflow and tells the cleanup hook about it.
    pub async fn remove_workflow(&self, id: &str) -> Result<bool> {
        let db = self.0.lock().await;
        let server_id: Option<String> = db
            .conn
            .query_row("SELECT server_id FROM workflows WHERE id = ?", [id], |row| row.get(0))
            .optional()
            .context("failed to query workflow")?;
        let Some(server_id) = server_id else {
            return Ok(false);
        };
        db.conn
            .execute("DELETE FROM workflows WHERE id = ?", [id])
            .context("failed to delete workflow")?;
        info!("Removed workflow {}", id);
        Self::notify_cleanup(db.cleanup.as_ref(), &server_id, id);
        Ok(true)
    }

    /// Stores a workflow fetched from a server. A synced workflow with the same name on that
    /// server is overwritten in place, keeping its id and outputs. Returns true if it was new.
    pub async fn sync_workflow(&self, server_id: &str, name: &str, data: Graph) -> Result<bool> {
        let db = self.0.lock().await;
        let existing: Option<String> = db
            .conn
            .query_row(
                "SELECT id FROM workflows WHERE server_id = ? AND name = ? AND add_method = ?",
                [server_id, name, AddMethod::ServerSync.as_str()],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query workflow")?;
        match existing {
            Some(id) => {
                Self::store_graph(&db.conn, &id, &data)?;
                info!("Refreshed synced workflow {} ({})", name, id);
                Ok(false)
            }
            None => {
                Self::insert(
                    &db.conn,
                    NewWorkflow {
                        name: name.to_owned(),
                        server_id: server_id.to_owned(),
                        data,
                        add_method: AddMethod::ServerSync,
                    },
                )?;
                Ok(true)
            }
        }
    }

    /// Drops every workflow that was synced from the given server.
    pub async fn clear_server_synced_workflows(&self, server_id: &str) -> Result<usize> {
        let mut db = self.0.lock().await;
        let tx = db.conn.transaction()?;
        let ids = {
            let mut stmt = tx.prepare("SELECT id FROM workflows WHERE server_id = ? AND add_method = ?")?;
            let ids = stmt
                .query_map([server_id, AddMethod::ServerSync.as_str()], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        tx.execute(
            "DELETE FROM workflows WHERE server_id = ? AND add_method = ?",
            [server_id, AddMethod::ServerSync.as_str()],
        )?;
        tx.commit().context("failed to clear synced workflows")?;
        for id in &ids {
            Self::notify_cleanup(db.cleanup.as_ref(), server_id, id);
        }
        info!("Cleared {} synced workflows from {}", ids.len(), server_id);
        Ok(ids.len())
    }
}
