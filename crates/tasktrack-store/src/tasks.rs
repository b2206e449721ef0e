use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension;
use tracing::{debug, instrument};

use tasktrack_core::{ProjectId, TaskId, TaskInput, TaskStatus};

use crate::database::Database;
use crate::error::{is_foreign_key_violation, StoreError};
use crate::row_helpers;

/// A task row joined with the name of its owning project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: i32,
    pub due_date: Option<NaiveDate>,
}

/// Columns a task listing can be ordered by, named as in the transfer shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    TaskId,
    Title,
    Description,
    Status,
    Priority,
    #[default]
    DueDate,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            Self::TaskId => "t.id",
            Self::Title => "t.title",
            Self::Description => "t.description",
            Self::Status => "t.status",
            Self::Priority => "t.priority",
            Self::DueDate => "t.due_date",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taskId" | "id" => Ok(Self::TaskId),
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "dueDate" => Ok(Self::DueDate),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

/// Zero-indexed page of an ascending scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
}

impl PageRequest {
    /// Rows to skip, or `None` if `page * size` does not fit in an i64.
    pub fn offset(&self) -> Option<i64> {
        i64::from(self.page).checked_mul(i64::from(self.size))
    }
}

/// Parameterized task lookups and writes. Implementations hold no business
/// rules; an empty result is never an error.
pub trait TaskRepository: Send + Sync {
    /// Insert a task under `project_id`. Fails with `Conflict` if the
    /// project does not exist.
    fn insert(&self, project_id: ProjectId, input: &TaskInput) -> Result<TaskRecord, StoreError>;

    /// Overwrite the editable fields of an existing task, keeping its id and
    /// project. Fails with `NotFound` if no row has `id` and with `Immutable`
    /// if the stored task is already completed.
    fn replace(&self, id: TaskId, input: &TaskInput) -> Result<TaskRecord, StoreError>;

    /// Returns whether a row was removed.
    fn delete(&self, id: TaskId) -> Result<bool, StoreError>;

    fn find_by_id(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError>;

    fn find_page(&self, page: &PageRequest) -> Result<Vec<TaskRecord>, StoreError>;

    /// Tasks due strictly before `today` that are not completed.
    fn find_overdue(&self, today: NaiveDate) -> Result<Vec<TaskRecord>, StoreError>;

    fn find_by_project(&self, project_id: ProjectId) -> Result<Vec<TaskRecord>, StoreError>;

    fn find_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<TaskRecord>, StoreError>;

    /// Tasks of a project with `status` and a due date strictly after `after`.
    fn find_by_project_status_due_after(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
        after: NaiveDate,
    ) -> Result<Vec<TaskRecord>, StoreError>;

    /// Set `status` on every existing task in `ids` inside one transaction.
    /// Unknown ids are skipped. Returns the number of tasks updated.
    fn update_status_batch(&self, ids: &[TaskId], status: TaskStatus) -> Result<usize, StoreError>;
}

const SELECT_TASK: &str = "SELECT t.id, t.project_id, p.name, t.title, t.description, t.status,
        t.priority, t.due_date
 FROM tasks t JOIN projects p ON p.id = t.project_id";

/// SQLite-backed [`TaskRepository`].
pub struct SqliteTaskRepo {
    db: Database,
}

impl SqliteTaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn query_tasks(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::types::ToSql],
    ) -> Result<Vec<TaskRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(params)?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task(row)?);
            }
            Ok(results)
        })
    }
}

impl TaskRepository for SqliteTaskRepo {
    #[instrument(skip(self, input))]
    fn insert(&self, project_id: ProjectId, input: &TaskInput) -> Result<TaskRecord, StoreError> {
        let now = Utc::now().to_rfc3339();
        let id = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (project_id, title, description, status, priority, due_date,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    project_id.get(),
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority,
                    input.due_date.map(row_helpers::format_date),
                    now,
                    now,
                ],
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::Conflict(format!("project {project_id} does not exist"))
                } else {
                    StoreError::from(e)
                }
            })?;
            Ok(TaskId::new(conn.last_insert_rowid()))
        })?;

        debug!(task_id = %id, "task inserted");
        self.find_by_id(id)?
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
    }

    #[instrument(skip(self, input), fields(task_id = %id))]
    fn replace(&self, id: TaskId, input: &TaskInput) -> Result<TaskRecord, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4,
                                  due_date = ?5, updated_at = ?6
                 WHERE id = ?7 AND status <> ?8",
                rusqlite::params![
                    input.title,
                    input.description,
                    input.status.as_str(),
                    input.priority,
                    input.due_date.map(row_helpers::format_date),
                    now,
                    id.get(),
                    TaskStatus::Completed.as_str(),
                ],
            )?;
            if n > 0 {
                return Ok(());
            }
            let current: Option<String> = conn
                .query_row("SELECT status FROM tasks WHERE id = ?1", [id.get()], |row| row.get(0))
                .optional()?;
            match current {
                None => Err(StoreError::NotFound(format!("task {id}"))),
                Some(raw) => Err(StoreError::Immutable(row_helpers::parse_enum(
                    &raw, "tasks", "status",
                )?)),
            }
        })?;

        self.find_by_id(id)?
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
    }

    #[instrument(skip(self), fields(task_id = %id))]
    fn delete(&self, id: TaskId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM tasks WHERE id = ?1", [id.get()])?;
            Ok(n > 0)
        })
    }

    #[instrument(skip(self), fields(task_id = %id))]
    fn find_by_id(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
        let sql = format!("{SELECT_TASK} WHERE t.id = ?1");
        Ok(self.query_tasks(&sql, &[&id.get()])?.into_iter().next())
    }

    #[instrument(skip(self))]
    fn find_page(&self, page: &PageRequest) -> Result<Vec<TaskRecord>, StoreError> {
        let sql = format!(
            "{SELECT_TASK} ORDER BY {} ASC, t.id ASC LIMIT ?1 OFFSET ?2",
            page.sort.column()
        );
        let limit = i64::from(page.size);
        let offset = page.offset().ok_or_else(|| {
            StoreError::Database(format!("page {} of size {} overflows", page.page, page.size))
        })?;
        self.query_tasks(&sql, &[&limit, &offset])
    }

    #[instrument(skip(self))]
    fn find_overdue(&self, today: NaiveDate) -> Result<Vec<TaskRecord>, StoreError> {
        let sql = format!(
            "{SELECT_TASK} WHERE t.due_date IS NOT NULL AND t.due_date < ?1 AND t.status <> ?2
             ORDER BY t.due_date ASC, t.id ASC"
        );
        let today = row_helpers::format_date(today);
        self.query_tasks(&sql, &[&today, &TaskStatus::Completed.as_str()])
    }

    #[instrument(skip(self))]
    fn find_by_project(&self, project_id: ProjectId) -> Result<Vec<TaskRecord>, StoreError> {
        let sql = format!("{SELECT_TASK} WHERE t.project_id = ?1 ORDER BY t.id ASC");
        self.query_tasks(&sql, &[&project_id.get()])
    }

    #[instrument(skip(self))]
    fn find_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<TaskRecord>, StoreError> {
        let sql = format!("{SELECT_TASK} WHERE t.project_id = ?1 AND t.status = ?2 ORDER BY t.id ASC");
        self.query_tasks(&sql, &[&project_id.get(), &status.as_str()])
    }

    #[instrument(skip(self))]
    fn find_by_project_status_due_after(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
        after: NaiveDate,
    ) -> Result<Vec<TaskRecord>, StoreError> {
        let sql = format!(
            "{SELECT_TASK} WHERE t.project_id = ?1 AND t.status = ?2 AND t.due_date > ?3
             ORDER BY t.due_date ASC, t.id ASC"
        );
        let after = row_helpers::format_date(after);
        self.query_tasks(&sql, &[&project_id.get(), &status.as_str(), &after])
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    fn update_status_batch(&self, ids: &[TaskId], status: TaskStatus) -> Result<usize, StoreError> {
        let unique: BTreeSet<TaskId> = ids.iter().copied().collect();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut updated = 0;
            {
                let mut exists = tx.prepare("SELECT 1 FROM tasks WHERE id = ?1")?;
                let mut write =
                    tx.prepare("UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3")?;
                for id in &unique {
                    if !exists.exists([id.get()])? {
                        continue;
                    }
                    updated += write.execute(rusqlite::params![status.as_str(), now, id.get()])?;
                }
            }
            tx.commit()?;
            Ok(updated)
        })
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<TaskRecord, StoreError> {
    let status: String = row_helpers::get(row, 5, "tasks", "status")?;
    let due_date: Option<String> = row_helpers::get_opt(row, 7, "tasks", "due_date")?;
    Ok(TaskRecord {
        id: TaskId::new(row_helpers::get(row, 0, "tasks", "id")?),
        project_id: ProjectId::new(row_helpers::get(row, 1, "tasks", "project_id")?),
        project_name: row_helpers::get(row, 2, "projects", "name")?,
        title: row_helpers::get(row, 3, "tasks", "title")?,
        description: row_helpers::get_opt(row, 4, "tasks", "description")?,
        status: row_helpers::parse_enum(&status, "tasks", "status")?,
        priority: row_helpers::get(row, 6, "tasks", "priority")?,
        due_date: due_date
            .map(|raw| row_helpers::parse_date(&raw, "tasks", "due_date"))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::ProjectRepo;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(title: &str, status: TaskStatus, due: Option<NaiveDate>) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: None,
            status,
            priority: 1,
            due_date: due,
        }
    }

    fn setup() -> (SqliteTaskRepo, ProjectId, ProjectId) {
        let db = Database::in_memory().unwrap();
        let projects = ProjectRepo::new(db.clone());
        let a = projects.create("Alpha").unwrap().id;
        let b = projects.create("Beta").unwrap().id;
        (SqliteTaskRepo::new(db), a, b)
    }

    #[test]
    fn insert_joins_project_name() {
        let (repo, alpha, _) = setup();
        let record = repo
            .insert(alpha, &input("write docs", TaskStatus::Pending, Some(date(2030, 1, 1))))
            .unwrap();
        assert_eq!(record.project_id, alpha);
        assert_eq!(record.project_name, "Alpha");
        assert_eq!(record.title, "write docs");
        assert_eq!(record.due_date, Some(date(2030, 1, 1)));
    }

    #[test]
    fn insert_into_missing_project_is_conflict() {
        let (repo, _, _) = setup();
        let result = repo.insert(ProjectId::new(999), &input("x", TaskStatus::Pending, None));
        assert_matches!(result, Err(StoreError::Conflict(_)));
    }

    #[test]
    fn replace_keeps_identity_and_project() {
        let (repo, alpha, _) = setup();
        let original = repo.insert(alpha, &input("old", TaskStatus::Pending, None)).unwrap();

        let replaced = repo
            .replace(original.id, &input("new", TaskStatus::InProgress, Some(date(2031, 5, 5))))
            .unwrap();
        assert_eq!(replaced.id, original.id);
        assert_eq!(replaced.project_id, alpha);
        assert_eq!(replaced.title, "new");
        assert_eq!(replaced.status, TaskStatus::InProgress);

        assert_eq!(repo.find_by_project(alpha).unwrap().len(), 1);
    }

    #[test]
    fn replace_missing_is_not_found() {
        let (repo, _, _) = setup();
        let result = repo.replace(TaskId::new(1), &input("x", TaskStatus::Pending, None));
        assert_matches!(result, Err(StoreError::NotFound(_)));
    }

    #[test]
    fn replace_refuses_completed_row() {
        let (repo, alpha, _) = setup();
        let done = repo.insert(alpha, &input("done", TaskStatus::Completed, None)).unwrap();

        let result = repo.replace(done.id, &input("reopened", TaskStatus::Pending, None));
        assert_matches!(result, Err(StoreError::Immutable(TaskStatus::Completed)));

        let stored = repo.find_by_id(done.id).unwrap().unwrap();
        assert_eq!(stored.title, "done");
        assert_eq!(stored.status, TaskStatus::Completed);
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let (repo, alpha, _) = setup();
        let task = repo.insert(alpha, &input("x", TaskStatus::Pending, None)).unwrap();
        assert!(repo.delete(task.id).unwrap());
        assert!(!repo.delete(task.id).unwrap());
        assert!(repo.find_by_id(task.id).unwrap().is_none());
    }

    #[test]
    fn page_sorts_ascending_and_limits() {
        let (repo, alpha, _) = setup();
        repo.insert(alpha, &input("c", TaskStatus::Pending, Some(date(2030, 3, 1)))).unwrap();
        repo.insert(alpha, &input("a", TaskStatus::Pending, Some(date(2030, 1, 1)))).unwrap();
        repo.insert(alpha, &input("b", TaskStatus::Pending, Some(date(2030, 2, 1)))).unwrap();

        let first = repo
            .find_page(&PageRequest { page: 0, size: 2, sort: SortField::DueDate })
            .unwrap();
        let titles: Vec<&str> = first.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);

        let second = repo
            .find_page(&PageRequest { page: 1, size: 2, sort: SortField::DueDate })
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "c");

        let by_title = repo
            .find_page(&PageRequest { page: 0, size: 10, sort: SortField::Title })
            .unwrap();
        let titles: Vec<&str> = by_title.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn page_offset_overflow_is_an_error() {
        let (repo, alpha, _) = setup();
        repo.insert(alpha, &input("a", TaskStatus::Pending, None)).unwrap();

        let huge = PageRequest { page: u32::MAX, size: u32::MAX, sort: SortField::DueDate };
        assert_eq!(huge.offset(), None);
        assert_matches!(repo.find_page(&huge), Err(StoreError::Database(_)));

        let far = PageRequest { page: 1 << 20, size: 1 << 20, sort: SortField::DueDate };
        assert_eq!(far.offset(), Some(1 << 40));
        assert!(repo.find_page(&far).unwrap().is_empty());
    }

    #[test]
    fn overdue_excludes_completed_and_today() {
        let (repo, alpha, _) = setup();
        let today = date(2030, 6, 15);
        let late = repo
            .insert(alpha, &input("late", TaskStatus::Pending, Some(date(2030, 6, 14))))
            .unwrap();
        repo.insert(alpha, &input("done", TaskStatus::Completed, Some(date(2030, 1, 1))))
            .unwrap();
        repo.insert(alpha, &input("today", TaskStatus::InProgress, Some(today))).unwrap();
        repo.insert(alpha, &input("undated", TaskStatus::Pending, None)).unwrap();

        let overdue = repo.find_overdue(today).unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
    }

    #[test]
    fn project_filters() {
        let (repo, alpha, beta) = setup();
        repo.insert(alpha, &input("a1", TaskStatus::Pending, None)).unwrap();
        repo.insert(alpha, &input("a2", TaskStatus::Completed, Some(date(2030, 5, 1)))).unwrap();
        repo.insert(alpha, &input("a3", TaskStatus::Completed, Some(date(2030, 7, 1)))).unwrap();
        repo.insert(beta, &input("b1", TaskStatus::Completed, Some(date(2030, 9, 1)))).unwrap();

        assert_eq!(repo.find_by_project(alpha).unwrap().len(), 3);
        assert_eq!(
            repo.find_by_project_and_status(alpha, TaskStatus::Completed).unwrap().len(),
            2
        );
        assert!(repo
            .find_by_project_and_status(beta, TaskStatus::Pending)
            .unwrap()
            .is_empty());

        let after = repo
            .find_by_project_status_due_after(alpha, TaskStatus::Completed, date(2030, 5, 1))
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].title, "a3");
    }

    #[test]
    fn batch_update_skips_unknown_and_duplicate_ids() {
        let (repo, alpha, _) = setup();
        let a = repo.insert(alpha, &input("a", TaskStatus::Pending, None)).unwrap();
        let b = repo.insert(alpha, &input("b", TaskStatus::InProgress, None)).unwrap();

        let updated = repo
            .update_status_batch(&[a.id, b.id, a.id, TaskId::new(9999)], TaskStatus::Completed)
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(
            repo.find_by_project_and_status(alpha, TaskStatus::Completed).unwrap().len(),
            2
        );
    }

    #[test]
    fn batch_update_is_never_observed_half_applied() {
        let (repo, alpha, _) = setup();
        let a = repo.insert(alpha, &input("a", TaskStatus::Pending, None)).unwrap();
        let b = repo.insert(alpha, &input("b", TaskStatus::Pending, None)).unwrap();
        let repo = Arc::new(repo);
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let repo = Arc::clone(&repo);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let completed = repo
                        .find_by_project_and_status(alpha, TaskStatus::Completed)
                        .unwrap()
                        .len();
                    assert!(completed == 0 || completed == 2, "saw {completed} updated");
                }
            })
        };

        for round in 0..200 {
            let status = if round % 2 == 0 { TaskStatus::Completed } else { TaskStatus::Pending };
            repo.update_status_batch(&[a.id, b.id], status).unwrap();
        }
        done.store(true, Ordering::SeqCst);
        reader.join().unwrap();
    }

    #[test]
    fn corrupt_status_is_reported() {
        let db = Database::in_memory().unwrap();
        let project = ProjectRepo::new(db.clone()).create("p").unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (project_id, title, status, priority, created_at, updated_at)
                 VALUES (?1, 'x', 'Archived', 1, '', '')",
                [project.id.get()],
            )?;
            Ok(())
        })
        .unwrap();

        let repo = SqliteTaskRepo::new(db);
        assert_matches!(
            repo.find_by_project(project.id),
            Err(StoreError::CorruptRow { column: "status", .. })
        );
    }

    #[test]
    fn sort_field_names_follow_transfer_shape() {
        assert_eq!("dueDate".parse::<SortField>().unwrap(), SortField::DueDate);
        assert_eq!("taskId".parse::<SortField>().unwrap(), SortField::TaskId);
        assert!("due_date".parse::<SortField>().is_err());
    }
}
