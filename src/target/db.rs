//! DuckDB target database

use super::schema::{CREATE_SCHEMA, SEQUENCES};
use crate::config::SeedConfig;
use crate::error::Result;
use crate::model::{
    ClassroomRecord, FeedbackRecord, PersonaRecord, PostRecord, SectionRecord, StudyRecord,
    TopicRecord, UserRecord, DEFAULT_MAX_POSTS_PER_USER, DEFAULT_TOPIC_COLOR,
};
use duckdb::{params, Connection, OptionalExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Target database connection
pub struct TargetDb {
    conn: Connection,
    path: Option<PathBuf>,
}

impl TargetDb {
    /// Open (or create) a database file, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened target database {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Database file, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw connection, for ad-hoc queries
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Tables currently present in the main schema
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'main'
             ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<Vec<String>>>()?;
        Ok(tables)
    }

    /// Whether the target already holds any tables
    pub fn has_tables(&self) -> Result<bool> {
        Ok(!self.list_tables()?.is_empty())
    }

    /// Drop every table and sequence, then create the schema
    pub fn reset_schema(&self) -> Result<()> {
        let tables = self.list_tables()?;
        for table in &tables {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\" CASCADE;"))?;
        }
        for sequence in SEQUENCES {
            self.conn
                .execute_batch(&format!("DROP SEQUENCE IF EXISTS {sequence};"))?;
        }
        info!("Dropped {} existing table(s)", tables.len());

        self.conn.execute_batch(CREATE_SCHEMA)?;
        info!("Created target schema");
        Ok(())
    }

    /// Insert the seed sections, users and topics
    pub fn provision(&mut self, seeds: &SeedConfig) -> Result<()> {
        let tx = self.conn.transaction()?;
        for section in &seeds.sections {
            tx.execute(
                "INSERT INTO sections (abbreviation, name) VALUES (?, ?)",
                params![section.abbreviation, section.name],
            )?;
        }
        for user in &seeds.users {
            tx.execute(
                "INSERT INTO users (uid, name, role) VALUES (?, ?, ?)",
                params![user.uid, user.name, user.role],
            )?;
        }
        for topic in &seeds.topics {
            tx.execute(
                "INSERT INTO topics (page_path, display_name, color, max_posts_per_user)
                 VALUES (?, ?, ?, ?)",
                params![
                    topic.page_path,
                    topic.display_name,
                    DEFAULT_TOPIC_COLOR,
                    DEFAULT_MAX_POSTS_PER_USER
                ],
            )?;
        }
        tx.commit()?;

        info!(
            "Provisioned {} sections, {} users, {} topics",
            seeds.sections.len(),
            seeds.users.len(),
            seeds.topics.len()
        );
        Ok(())
    }

    /// Flush the write-ahead log into the database file
    pub fn checkpoint(&self) -> Result<()> {
        self.conn.execute_batch("CHECKPOINT;")?;
        Ok(())
    }

    // ========================================================================
    // Natural-key lookups
    // ========================================================================

    fn lookup_id(&self, sql: &str, key: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(sql, params![key], |row| row.get(0))
            .optional()?)
    }

    pub fn section_id(&self, abbreviation: &str) -> Result<Option<i64>> {
        self.lookup_id("SELECT id FROM sections WHERE abbreviation = ?", abbreviation)
    }

    pub fn user_id(&self, uid: &str) -> Result<Option<i64>> {
        self.lookup_id("SELECT id FROM users WHERE uid = ?", uid)
    }

    /// First user with the given display name
    pub fn user_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        self.lookup_id(
            "SELECT id FROM users WHERE name = ? ORDER BY id LIMIT 1",
            name,
        )
    }

    pub fn topic_id(&self, page_path: &str) -> Result<Option<i64>> {
        self.lookup_id("SELECT id FROM topics WHERE page_path = ?", page_path)
    }

    /// Persona id and category
    pub fn persona(&self, alias: &str) -> Result<Option<(i64, Option<String>)>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, category FROM personas WHERE alias = ?",
                params![alias],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?)
    }

    pub fn user_persona_exists(&self, user_id: i64, persona_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM user_personas WHERE user_id = ? AND persona_id = ?",
            params![user_id, persona_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ========================================================================
    // Inserts
    // ========================================================================

    pub fn insert_section(&mut self, section: &SectionRecord) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO sections (abbreviation, name) VALUES (?, ?) RETURNING id",
            params![section.abbreviation, section.name],
            |row| row.get(0),
        )?)
    }

    /// Insert a user together with its section memberships
    pub fn insert_user(&mut self, user: &UserRecord, section_ids: &[i64]) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let id: i64 = tx.query_row(
            "INSERT INTO users (uid, name, email, password, sid, role, pfp,
                 kasm_server_needed, grade_data, ap_exam, school, classes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            params![
                user.uid,
                user.name,
                user.email,
                user.password,
                user.sid,
                user.role,
                user.pfp,
                user.kasm_server_needed,
                user.grade_data,
                user.ap_exam,
                user.school,
                user.classes
            ],
            |row| row.get(0),
        )?;
        for section_id in section_ids {
            tx.execute(
                "INSERT INTO user_sections (user_id, section_id) VALUES (?, ?)
                 ON CONFLICT DO NOTHING",
                params![id, section_id],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    pub fn insert_topic(&mut self, topic: &TopicRecord) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO topics (page_path, page_title, page_description, display_name,
                 color, icon, allow_anonymous, moderated, max_posts_per_user, settings)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            params![
                topic.page_path,
                topic.page_title,
                topic.page_description,
                topic.display_name,
                topic.color,
                topic.icon,
                topic.allow_anonymous,
                topic.moderated,
                topic.max_posts_per_user,
                topic.settings
            ],
            |row| row.get(0),
        )?)
    }

    pub fn insert_microblog(
        &mut self,
        user_id: i64,
        topic_id: Option<i64>,
        content: &str,
        data: &str,
    ) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO microblogs (user_id, topic_id, content, data)
             VALUES (?, ?, ?, ?) RETURNING id",
            params![user_id, topic_id, content, data],
            |row| row.get(0),
        )?)
    }

    /// Insert a post; `parent_id` is already a target id
    pub fn insert_post(
        &mut self,
        post: &PostRecord,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO posts (user_id, parent_id, content, grade_received, page_url, page_title)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
            params![
                user_id,
                parent_id,
                post.content,
                post.grade_received,
                post.page_url,
                post.page_title
            ],
            |row| row.get(0),
        )?)
    }

    pub fn insert_persona(&mut self, persona: &PersonaRecord) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO personas (alias, category, bio_map, empathy_map)
             VALUES (?, ?, ?, ?) RETURNING id",
            params![
                persona.alias,
                persona.category,
                persona.bio_map,
                persona.empathy_map
            ],
            |row| row.get(0),
        )?)
    }

    pub fn insert_user_persona(
        &mut self,
        user_id: i64,
        persona_id: i64,
        weight: i64,
        selected_at: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_personas (user_id, persona_id, weight, selected_at)
             VALUES (?, ?, ?, ?)",
            params![user_id, persona_id, weight, selected_at],
        )?;
        Ok(())
    }

    /// Insert a classroom together with its student memberships
    pub fn insert_classroom(
        &mut self,
        classroom: &ClassroomRecord,
        owner_id: i64,
        student_ids: &[i64],
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let id: i64 = tx.query_row(
            "INSERT INTO classrooms (name, school_name, owner_id, status)
             VALUES (?, ?, ?, ?) RETURNING id",
            params![
                classroom.name,
                classroom.school_name,
                owner_id,
                classroom.status
            ],
            |row| row.get(0),
        )?;
        for student_id in student_ids {
            tx.execute(
                "INSERT INTO classroom_students (classroom_id, user_id) VALUES (?, ?)
                 ON CONFLICT DO NOTHING",
                params![id, student_id],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    pub fn insert_feedback(&mut self, feedback: &FeedbackRecord) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO feedback (title, body, feedback_type, github_username, github_issue_url)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
            params![
                feedback.title,
                feedback.body,
                feedback.kind,
                feedback.github_username,
                feedback.github_issue_url
            ],
            |row| row.get(0),
        )?)
    }

    pub fn insert_study(&mut self, study: &StudyRecord, user_id: Option<i64>) -> Result<i64> {
        Ok(self.conn.query_row(
            "INSERT INTO study (user_id, topic, subtopic, studied, recorded_at)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
            params![
                user_id,
                study.topic,
                study.subtopic,
                study.studied,
                study.timestamp
            ],
            |row| row.get(0),
        )?)
    }

    // ========================================================================
    // Counts
    // ========================================================================

    /// Row count of one table
    pub fn count(&self, table: &str) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT count(*) FROM \"{table}\""), [], |row| {
                    row.get(0)
                })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Row counts of every table present
    pub fn table_counts(&self) -> Result<BTreeMap<String, usize>> {
        self.list_tables()?
            .into_iter()
            .map(|table| {
                let count = self.count(&table)?;
                Ok((table, count))
            })
            .collect()
    }
}

impl std::fmt::Debug for TargetDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetDb")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Copy an existing database file to `<file>.bak`
///
/// Returns the backup path, or `None` when there was nothing to copy.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    let backup = PathBuf::from(name);
    std::fs::copy(path, &backup)?;
    info!("Backed up {} to {}", path.display(), backup.display());
    Ok(Some(backup))
}
