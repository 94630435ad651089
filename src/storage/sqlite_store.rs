use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::{
    format_reference_code, format_timestamp, parse_reference_number, parse_timestamp, FollowUp,
    Inquiry, InquiryDraft, InquiryStatus, User,
};
use crate::error::{CrmError, Result};

const LAST_REFERENCE_KEY: &str = "last_reference_number";

const INQUIRY_COLUMNS: &str = "id, reference_code, name, phone, email, service_type, message, status, created_at, updated_at";
const FOLLOW_UP_COLUMNS: &str = "id, inquiry_id, note, next_follow_up_date, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, created_at";

/// Filters for inquiry listing. All present filters must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InquiryFilter {
    /// Exact status match
    pub status: Option<InquiryStatus>,
    /// Substring of the phone number, ASCII case-insensitive
    pub phone: Option<String>,
    /// Substring of the reference code, ASCII case-insensitive
    pub reference_code: Option<String>,
}

impl InquiryFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = self.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        // SQLite's lower() folds ASCII only, so the needle is folded the same way.
        if let Some(phone) = &self.phone {
            clauses.push("instr(lower(phone), ?) > 0");
            values.push(Value::Text(phone.to_ascii_lowercase()));
        }
        if let Some(code) = &self.reference_code {
            clauses.push("instr(lower(reference_code), ?) > 0");
            values.push(Value::Text(code.to_ascii_lowercase()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

/// Row counts, reported after setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub users: u64,
    pub inquiries: u64,
    pub follow_ups: u64,
}

/// SQLite-backed store for inquiries, follow-ups and staff identities
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS inquiries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                reference_code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT,
                service_type TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_inquiries_created ON inquiries(created_at);
            CREATE INDEX IF NOT EXISTS idx_inquiries_status ON inquiries(status);

            CREATE TABLE IF NOT EXISTS follow_ups (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                inquiry_id TEXT NOT NULL REFERENCES inquiries(id),
                note TEXT NOT NULL,
                next_follow_up_date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_follow_ups_inquiry ON follow_ups(inquiry_id);

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inquiries
    // ------------------------------------------------------------------

    /// Persist a new inquiry, issuing its reference code if the draft has none.
    ///
    /// Issued codes are `INQ` followed by `max(now_ms, last_issued + 1)`, read
    /// and written inside one immediate transaction, so two creations can never
    /// share a code. A pre-assigned code is upper-cased; if it already exists
    /// the call fails with [`CrmError::Conflict`].
    pub fn create_inquiry(&mut self, draft: InquiryDraft, now: DateTime<Utc>) -> Result<Inquiry> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let last_issued: i64 = tx
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                [LAST_REFERENCE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let reference_code = match draft.reference_code {
            Some(code) => code.trim().to_uppercase(),
            None => {
                let next = last_issued.checked_add(1).ok_or_else(|| {
                    CrmError::Conflict("Reference code sequence is exhausted".to_string())
                })?;
                format_reference_code(now.timestamp_millis().max(next))
            }
        };
        if reference_code.is_empty() {
            return Err(CrmError::validation(
                "referenceCode",
                "referenceCode must not be empty",
            ));
        }

        if let Some(number) = parse_reference_number(&reference_code) {
            if number > last_issued {
                tx.execute(
                    "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                    params![LAST_REFERENCE_KEY, number.to_string()],
                )?;
            }
        }

        let inquiry = Inquiry {
            id: Uuid::new_v4(),
            reference_code,
            name: draft.name,
            phone: draft.phone,
            email: draft.email,
            service_type: draft.service_type,
            message: draft.message,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };

        let inserted = tx.execute(
            "INSERT INTO inquiries
             (id, reference_code, name, phone, email, service_type, message, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                inquiry.id.to_string(),
                inquiry.reference_code,
                inquiry.name,
                inquiry.phone,
                inquiry.email,
                inquiry.service_type.as_str(),
                inquiry.message,
                inquiry.status.as_str(),
                format_timestamp(&inquiry.created_at),
                format_timestamp(&inquiry.updated_at),
            ],
        );
        match inserted {
            Err(e) if is_constraint_violation(&e) => {
                return Err(CrmError::Conflict(format!(
                    "Reference code {} already exists",
                    inquiry.reference_code
                )));
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        tx.commit()?;
        debug!(reference_code = %inquiry.reference_code, "inquiry stored");
        Ok(inquiry)
    }

    /// Get an inquiry by id
    pub fn get_inquiry(&self, id: &Uuid) -> Result<Option<Inquiry>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM inquiries WHERE id = ?1", INQUIRY_COLUMNS),
                [id.to_string()],
                InquiryRow::from_row,
            )
            .optional()?;
        row.map(InquiryRow::into_inquiry).transpose()
    }

    /// Exact lookup by (already normalized) reference code
    pub fn find_by_reference_code(&self, code: &str) -> Result<Option<Inquiry>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM inquiries WHERE reference_code = ?1",
                    INQUIRY_COLUMNS
                ),
                [code],
                InquiryRow::from_row,
            )
            .optional()?;
        row.map(InquiryRow::into_inquiry).transpose()
    }

    /// Set the status and bump `updated_at`. Returns `None` if the inquiry does not exist.
    pub fn update_status(
        &self,
        id: &Uuid,
        status: InquiryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Inquiry>> {
        let changed = self.conn.execute(
            "UPDATE inquiries SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), format_timestamp(&now), id.to_string()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_inquiry(id)
    }

    /// One page of inquiries, newest first; equal timestamps keep insertion order.
    pub fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Inquiry>> {
        let (where_sql, mut values) = filter.where_clause();
        let sql = format!(
            "SELECT {} FROM inquiries{} ORDER BY created_at DESC, seq ASC LIMIT ? OFFSET ?",
            INQUIRY_COLUMNS, where_sql
        );
        values.push(Value::Integer(to_sql_int(limit)));
        values.push(Value::Integer(to_sql_int(offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), InquiryRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(InquiryRow::into_inquiry).collect()
    }

    /// Number of inquiries matching the filter, ignoring pagination
    pub fn count_inquiries(&self, filter: &InquiryFilter) -> Result<u64> {
        let (where_sql, values) = filter.where_clause();
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM inquiries{}", where_sql),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    // ------------------------------------------------------------------
    // Follow-ups
    // ------------------------------------------------------------------

    pub fn insert_follow_up(&self, follow_up: &FollowUp) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO follow_ups
             (id, inquiry_id, note, next_follow_up_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                follow_up.id.to_string(),
                follow_up.inquiry_id.to_string(),
                follow_up.note,
                format_timestamp(&follow_up.next_follow_up_date),
                format_timestamp(&follow_up.created_at),
                format_timestamp(&follow_up.updated_at),
            ],
        );
        match inserted {
            // The only foreign key is the owning inquiry.
            Err(e) if is_constraint_violation(&e) => Err(CrmError::inquiry_not_found()),
            Err(e) => Err(e.into()),
            Ok(_) => Ok(()),
        }
    }

    /// All follow-ups for an inquiry, newest first
    pub fn follow_ups_for(&self, inquiry_id: &Uuid) -> Result<Vec<FollowUp>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM follow_ups WHERE inquiry_id = ?1 ORDER BY created_at DESC, seq DESC",
            FOLLOW_UP_COLUMNS
        ))?;
        let rows = stmt
            .query_map([inquiry_id.to_string()], FollowUpRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(FollowUpRow::into_follow_up).collect()
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn create_user(&self, user: &User) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                format_timestamp(&user.created_at),
            ],
        );
        match inserted {
            Err(e) if is_constraint_violation(&e) => Err(CrmError::Conflict(format!(
                "A user with email {} already exists",
                user.email
            ))),
            Err(e) => Err(e.into()),
            Ok(_) => Ok(()),
        }
    }

    pub fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                [id.to_string()],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                [email.trim().to_lowercase()],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY created_at ASC",
            USER_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], UserRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Remove a user by email. Returns whether a row was deleted.
    pub fn remove_user(&self, email: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM users WHERE email = ?1",
            [email.trim().to_lowercase()],
        )?;
        Ok(removed > 0)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let count = |table: &str| -> Result<u64> {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table),
                [],
                |row| row.get(0),
            )?;
            Ok(n.max(0) as u64)
        };
        Ok(StoreStats {
            users: count("users")?,
            inquiries: count("inquiries")?,
            follow_ups: count("follow_ups")?,
        })
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| CrmError::Storage(format!("Invalid stored id '{}': {}", raw, e)))
}

fn parse_stored<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T> {
    raw.parse().map_err(CrmError::Storage)
}

struct InquiryRow {
    id: String,
    reference_code: String,
    name: String,
    phone: String,
    email: Option<String>,
    service_type: String,
    message: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl InquiryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            reference_code: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            service_type: row.get(5)?,
            message: row.get(6)?,
            status: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_inquiry(self) -> Result<Inquiry> {
        Ok(Inquiry {
            id: parse_uuid(&self.id)?,
            reference_code: self.reference_code,
            name: self.name,
            phone: self.phone,
            email: self.email,
            service_type: parse_stored(&self.service_type)?,
            message: self.message,
            status: parse_stored(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct FollowUpRow {
    id: String,
    inquiry_id: String,
    note: String,
    next_follow_up_date: String,
    created_at: String,
    updated_at: String,
}

impl FollowUpRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            inquiry_id: row.get(1)?,
            note: row.get(2)?,
            next_follow_up_date: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_follow_up(self) -> Result<FollowUp> {
        Ok(FollowUp {
            id: parse_uuid(&self.id)?,
            inquiry_id: parse_uuid(&self.inquiry_id)?,
            note: self.note,
            next_follow_up_date: parse_timestamp(&self.next_follow_up_date)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
