use chrono::Utc;
use tracing::instrument;

use tasktrack_core::ProjectId;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug)]
pub struct ProjectRow {
    pub id: ProjectId,
    pub name: String,
    pub created_at: String,
}

pub struct ProjectRepo {
    db: Database,
}

impl ProjectRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn create(&self, name: &str) -> Result<ProjectRow, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (name, created_at) VALUES (?1, ?2)",
                rusqlite::params![name, now],
            )?;
            Ok(ProjectRow {
                id: ProjectId::new(conn.last_insert_rowid()),
                name: name.to_string(),
                created_at: now.clone(),
            })
        })
    }

    #[instrument(skip(self), fields(project_id = %id))]
    pub fn get(&self, id: ProjectId) -> Result<ProjectRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, created_at FROM projects WHERE id = ?1")?;
            let mut rows = stmt.query([id.get()])?;
            match rows.next()? {
                Some(row) => row_to_project(row),
                None => Err(StoreError::NotFound(format!("project {id}"))),
            }
        })
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<ProjectRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, created_at FROM projects ORDER BY id")?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_project(row)?);
            }
            Ok(results)
        })
    }

    /// Delete a project. Its tasks go with it through `ON DELETE CASCADE`.
    /// Returns the number of tasks removed.
    #[instrument(skip(self), fields(project_id = %id))]
    pub fn delete(&self, id: ProjectId) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let task_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
                [id.get()],
                |row| row.get(0),
            )?;
            let deleted = tx.execute("DELETE FROM projects WHERE id = ?1", [id.get()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("project {id}")));
            }
            tx.commit()?;
            Ok(task_count as usize)
        })
    }
}

fn row_to_project(row: &rusqlite::Row<'_>) -> Result<ProjectRow, StoreError> {
    Ok(ProjectRow {
        id: ProjectId::new(row_helpers::get(row, 0, "projects", "id")?),
        name: row_helpers::get(row, 1, "projects", "name")?,
        created_at: row_helpers::get(row, 2, "projects", "created_at")?,
    })
}
