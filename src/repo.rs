use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("storage error: {0}")]
    Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

use async_trait::async_trait;

#[async_trait]
pub trait ReportRepo: Send + Sync {
    async fn insert_report(&self, new: NewReport) -> RepoResult<Report>;
    /// Non-deleted reports only, oldest first.
    async fn list_reports(&self) -> RepoResult<Vec<Report>>;
    async fn get_report_by_uid(&self, uid: &str) -> RepoResult<Report>;
    /// Errors with `NotFound` when no live row matches the uid.
    async fn soft_delete_report(&self, uid: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait InquiryRepo: Send + Sync {
    async fn insert_inquiry(&self, new: NewInquiry) -> RepoResult<ContactInquiry>;
    async fn list_inquiries(&self) -> RepoResult<Vec<ContactInquiry>>;
    async fn soft_delete_inquiry(&self, uid: &str) -> RepoResult<()>;
}

pub trait Repo: ReportRepo + InquiryRepo {}

impl<T> Repo for T where T: ReportRepo + InquiryRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};
    use uuid::Uuid;

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        reports: HashMap<Id, Report>,
        inquiries: HashMap<Id, ContactInquiry>,
        next_id: Id,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn snapshot_path() -> PathBuf {
            match std::env::var("GLITCHDESK_DATA_DIR") {
                Ok(dir) => {
                    let mut p = PathBuf::from(dir);
                    p.push("state.json");
                    p
                }
                Err(_) => PathBuf::from(SNAPSHOT_PATH),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        eprintln!("[inmem] Loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        eprintln!(
                            "[inmem] Failed to parse snapshot '{}': {e}. Starting empty.",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(_) => State::default(),
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    eprintln!("[inmem] Failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ReportRepo for InMemRepo {
        async fn insert_report(&self, new: NewReport) -> RepoResult<Report> {
            let mut s = self.state.write().unwrap();
            let id = Self::next_id(&mut s);
            let now = Utc::now();
            let report = Report {
                id,
                uid: Uuid::new_v4().to_string(),
                email: new.email,
                username: new.username,
                device_type: new.device_type,
                browser_info: new.browser_info,
                glitch_type: new.glitch_type,
                glitch_location: new.glitch_location,
                glitch_description: new.glitch_description,
                steps_to_reproduce: new.steps_to_reproduce,
                urgency: new.urgency,
                attachment_url: new.attachment_url,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            s.reports.insert(id, report.clone());
            drop(s); // release lock before persisting
            self.persist();
            Ok(report)
        }

        async fn list_reports(&self) -> RepoResult<Vec<Report>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .reports
                .values()
                .filter(|r| r.deleted_at.is_none())
                .cloned()
                .collect();
            v.sort_by_key(|r| r.id);
            Ok(v)
        }

        async fn get_report_by_uid(&self, uid: &str) -> RepoResult<Report> {
            let s = self.state.read().unwrap();
            s.reports
                .values()
                .find(|r| r.uid == uid && r.deleted_at.is_none())
                .cloned()
                .ok_or(RepoError::NotFound)
        }

        async fn soft_delete_report(&self, uid: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let report = s
                .reports
                .values_mut()
                .find(|r| r.uid == uid && r.deleted_at.is_none())
                .ok_or(RepoError::NotFound)?;
            report.deleted_at = Some(now);
            report.updated_at = now;
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl InquiryRepo for InMemRepo {
        async fn insert_inquiry(&self, new: NewInquiry) -> RepoResult<ContactInquiry> {
            let mut s = self.state.write().unwrap();
            let id = Self::next_id(&mut s);
            let now = Utc::now();
            let inquiry = ContactInquiry {
                id,
                uid: Uuid::new_v4().to_string(),
                name: new.name,
                email: new.email,
                contact: new.contact,
                inquiry_type: new.inquiry_type,
                subject: new.subject,
                message: new.message,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            s.inquiries.insert(id, inquiry.clone());
            drop(s);
            self.persist();
            Ok(inquiry)
        }

        async fn list_inquiries(&self) -> RepoResult<Vec<ContactInquiry>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s
                .inquiries
                .values()
                .filter(|i| i.deleted_at.is_none())
                .cloned()
                .collect();
            v.sort_by_key(|i| i.id);
            Ok(v)
        }

        async fn soft_delete_inquiry(&self, uid: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            let now = Utc::now();
            let inquiry = s
                .inquiries
                .values_mut()
                .find(|i| i.uid == uid && i.deleted_at.is_none())
                .ok_or(RepoError::NotFound)?;
            inquiry.deleted_at = Some(now);
            inquiry.updated_at = now;
            drop(s);
            self.persist();
            Ok(())
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};
    use uuid::Uuid;

    const REPORT_COLUMNS: &str = "id, uid, email, username, device_type, browser_info, \
         glitch_type, glitch_location, glitch_description, steps_to_reproduce, urgency, \
         attachment_url, created_at, updated_at, deleted_at";

    const INQUIRY_COLUMNS: &str =
        "id, uid, name, email, contact, inquiry_type, subject, message, \
         created_at, updated_at, deleted_at";

    /// Tables are created from this in-process definition at startup; there
    /// are no versioned migrations.
    pub async fn ensure_schema(pool: &Pool<Postgres>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id BIGSERIAL PRIMARY KEY,
                uid TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                username TEXT NOT NULL,
                device_type TEXT NOT NULL,
                browser_info TEXT NOT NULL,
                glitch_type TEXT NOT NULL,
                glitch_location TEXT NOT NULL,
                glitch_description TEXT NOT NULL,
                steps_to_reproduce TEXT NOT NULL,
                urgency TEXT NOT NULL,
                attachment_url TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                deleted_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inquiries (
                id BIGSERIAL PRIMARY KEY,
                uid TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                contact TEXT NOT NULL,
                inquiry_type TEXT NOT NULL,
                subject TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                deleted_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }
    }

    fn internal(e: sqlx::Error) -> RepoError {
        RepoError::Internal(e.to_string())
    }

    #[async_trait]
    impl ReportRepo for PgRepo {
        async fn insert_report(&self, new: NewReport) -> RepoResult<Report> {
            let sql = format!(
                "INSERT INTO reports (uid, email, username, device_type, browser_info, \
                 glitch_type, glitch_location, glitch_description, steps_to_reproduce, \
                 urgency, attachment_url) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11) RETURNING {REPORT_COLUMNS}"
            );
            let rec = sqlx::query_as::<_, Report>(&sql)
                .bind(Uuid::new_v4().to_string())
                .bind(&new.email)
                .bind(&new.username)
                .bind(&new.device_type)
                .bind(&new.browser_info)
                .bind(&new.glitch_type)
                .bind(&new.glitch_location)
                .bind(&new.glitch_description)
                .bind(&new.steps_to_reproduce)
                .bind(&new.urgency)
                .bind(&new.attachment_url)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)?;
            Ok(rec)
        }

        async fn list_reports(&self) -> RepoResult<Vec<Report>> {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE deleted_at IS NULL ORDER BY id"
            );
            sqlx::query_as::<_, Report>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }

        async fn get_report_by_uid(&self, uid: &str) -> RepoResult<Report> {
            let sql = format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE uid = $1 AND deleted_at IS NULL"
            );
            sqlx::query_as::<_, Report>(&sql)
                .bind(uid)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?
                .ok_or(RepoError::NotFound)
        }

        async fn soft_delete_report(&self, uid: &str) -> RepoResult<()> {
            let res = sqlx::query(
                "UPDATE reports SET deleted_at = now(), updated_at = now() \
                 WHERE uid = $1 AND deleted_at IS NULL",
            )
            .bind(uid)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl InquiryRepo for PgRepo {
        async fn insert_inquiry(&self, new: NewInquiry) -> RepoResult<ContactInquiry> {
            let sql = format!(
                "INSERT INTO inquiries (uid, name, email, contact, inquiry_type, subject, message) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7) RETURNING {INQUIRY_COLUMNS}"
            );
            let rec = sqlx::query_as::<_, ContactInquiry>(&sql)
                .bind(Uuid::new_v4().to_string())
                .bind(&new.name)
                .bind(&new.email)
                .bind(&new.contact)
                .bind(&new.inquiry_type)
                .bind(&new.subject)
                .bind(&new.message)
                .fetch_one(&self.pool)
                .await
                .map_err(internal)?;
            Ok(rec)
        }

        async fn list_inquiries(&self) -> RepoResult<Vec<ContactInquiry>> {
            let sql = format!(
                "SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE deleted_at IS NULL ORDER BY id"
            );
            sqlx::query_as::<_, ContactInquiry>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }

        async fn soft_delete_inquiry(&self, uid: &str) -> RepoResult<()> {
            let res = sqlx::query(
                "UPDATE inquiries SET deleted_at = now(), updated_at = now() \
                 WHERE uid = $1 AND deleted_at IS NULL",
            )
            .bind(uid)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }
}
