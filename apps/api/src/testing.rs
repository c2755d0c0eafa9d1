//! Test fakes for the completion source and the persistence traits.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::certifications::files::{FileStore, FileStoreError};
use crate::certifications::pipeline::PipelinePolicy;
use crate::certifications::store::CertificationStore;
use crate::config::Config;
use crate::db::StoreError;
use crate::llm_client::{CompletionSource, LlmError, PromptPart};
use crate::models::certification::{CertificationRow, NewCertification, STATUS_PENDING};
use crate::skills::store::{AttachOutcome, DetachOutcome, NewSkill, SkillStore};
use crate::skills::SkillRecord;

/// A small solid-colour PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 90, 160, 255]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode test png");
    out.into_inner()
}

enum Script {
    Replies(Vec<String>),
    Always(String),
    Failing,
}

/// Replays canned completions and records every prompt it receives.
pub struct ScriptedCompletion {
    script: Script,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Vec<PromptPart>>>,
}

impl ScriptedCompletion {
    /// Replies in order; the last reply repeats once the list is exhausted.
    pub fn new(replies: Vec<String>) -> Self {
        Self::with_script(Script::Replies(replies))
    }

    pub fn always(reply: &str) -> Self {
        Self::with_script(Script::Always(reply.to_string()))
    }

    /// Every call fails with an API error.
    pub fn failing() -> Self {
        Self::with_script(Script::Failing)
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Vec<PromptPart>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionSource for ScriptedCompletion {
    async fn generate_content(&self, parts: &[PromptPart]) -> Result<String, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(parts.to_vec());
        match &self.script {
            Script::Replies(replies) => replies
                .get(call)
                .or_else(|| replies.last())
                .cloned()
                .ok_or(LlmError::EmptyContent),
            Script::Always(reply) => Ok(reply.clone()),
            Script::Failing => Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct SkillTables {
    users: HashSet<Uuid>,
    skills: HashMap<Uuid, SkillRecord>,
    fail_on: HashSet<String>,
}

/// In-memory `SkillStore`. One mutex makes every operation atomic, like the SQL transactions.
#[derive(Default)]
pub struct MemorySkillStore {
    tables: Mutex<SkillTables>,
}

impl MemorySkillStore {
    pub fn add_user(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().users.insert(id);
        id
    }

    /// Makes `attach_holder` fail for this normalized name.
    pub fn fail_on(&self, name: &str) {
        self.tables.lock().unwrap().fail_on.insert(name.to_string());
    }

    /// All catalog records, sorted by name.
    pub fn snapshot(&self) -> Vec<SkillRecord> {
        let mut records: Vec<_> = self.tables.lock().unwrap().skills.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

#[async_trait]
impl SkillStore for MemorySkillStore {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.lock().unwrap().users.contains(&user_id))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SkillRecord>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.skills.values().find(|r| r.name == name).cloned())
    }

    async fn attach_holder(
        &self,
        skill: NewSkill<'_>,
        user_id: Uuid,
    ) -> Result<AttachOutcome, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.fail_on.contains(skill.name) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }

        if let Some(record) = tables
            .skills
            .values_mut()
            .find(|record| record.name == skill.name)
        {
            let newly_held = record.users_holding.insert(user_id);
            return Ok(AttachOutcome {
                record: record.clone(),
                newly_held,
            });
        }

        let record = SkillRecord {
            id: Uuid::new_v4(),
            name: skill.name.to_string(),
            category: skill.category.to_string(),
            level: skill.level,
            users_holding: BTreeSet::from([user_id]),
        };
        tables.skills.insert(record.id, record.clone());
        Ok(AttachOutcome {
            record,
            newly_held: true,
        })
    }

    async fn detach_holder(
        &self,
        skill_id: Uuid,
        user_id: Uuid,
    ) -> Result<DetachOutcome, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(record) = tables.skills.get_mut(&skill_id) else {
            return Ok(DetachOutcome::NotHeld);
        };
        if !record.users_holding.remove(&user_id) {
            return Ok(DetachOutcome::NotHeld);
        }
        if record.users_holding.is_empty() {
            tables.skills.remove(&skill_id);
            return Ok(DetachOutcome::Deleted);
        }
        Ok(DetachOutcome::Detached(record.clone()))
    }

    async fn skills_for_user(&self, user_id: Uuid) -> Result<Vec<SkillRecord>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let mut records: Vec<_> = tables
            .skills
            .values()
            .filter(|record| record.users_holding.contains(&user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryCertificationStore {
    rows: Mutex<Vec<CertificationRow>>,
}

impl MemoryCertificationStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl CertificationStore for MemoryCertificationStore {
    async fn create(&self, new: NewCertification) -> Result<CertificationRow, StoreError> {
        let row = CertificationRow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            issuer: new.issuer,
            issue_date: new.issue_date,
            credential_id: new.credential_id,
            description: new.description,
            certificate_key: new.certificate_key,
            status: STATUS_PENDING.to_string(),
            ai_analysis: Json(new.ai_analysis),
            authenticity: Json(new.authenticity),
            skill_ids: new.skill_ids,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CertificationRow>, StoreError> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<CertificationRow>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryFileStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryFileStore {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<(), FileStoreError> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Config with default policy and placeholder credentials.
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/certtrack_test".to_string(),
        s3_bucket: "certtrack-test".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        llm_timeout_secs: 30,
        max_upload_bytes: 5 * 1024 * 1024,
        policy: PipelinePolicy::default(),
    }
}
