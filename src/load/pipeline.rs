//! Load pipeline implementation

use super::types::{LoadReport, Outcome, RecordLoadError, SkipReason, StageTally};
use crate::config::SeedConfig;
use crate::error::Result;
use crate::model::{
    category_weight, raw_label, AuthorRef, ClassroomRecord, FeedbackRecord, FromRecord,
    MicroblogRecord, PersonaRecord, PostRecord, SectionRecord, SourceUserIndex, StudyRecord,
    TopicRecord, UserPersonaRecord, UserRecord,
};
use crate::target::TargetDb;
use crate::types::{EntityType, Payload, Record};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

type RecordResult = std::result::Result<Outcome, RecordLoadError>;

/// Drop and recreate the target schema, then provision the seed records
///
/// Destroys every row in the target.
pub fn reinitialize(db: &mut TargetDb, seeds: &SeedConfig) -> Result<()> {
    db.reset_schema()?;
    db.provision(seeds)
}

/// Loads payload collections into the target in dependency order
pub struct LoadPipeline<'a> {
    db: &'a mut TargetDb,
    user_index: SourceUserIndex,
}

impl<'a> LoadPipeline<'a> {
    pub fn new(db: &'a mut TargetDb) -> Self {
        Self {
            db,
            user_index: SourceUserIndex::default(),
        }
    }

    /// Use a prebuilt source user index instead of the payload's users
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_user_index(mut self, index: SourceUserIndex) -> Self {
        self.user_index = index;
        self
    }

    /// Run every stage whose collection is present in the payload
    pub fn load(&mut self, payload: &Payload) -> LoadReport {
        if self.user_index.is_empty() {
            self.user_index = SourceUserIndex::from_users(payload.records(EntityType::Users));
            debug!("Indexed {} source user ids", self.user_index.len());
        }

        let start = Instant::now();
        let mut report = LoadReport::default();
        for entity in EntityType::LOAD_ORDER {
            if payload.contains(entity) {
                let tally = self.load_stage(entity, payload.records(entity));
                report.push(entity, tally);
            }
        }

        let totals = report.totals();
        info!(
            "Load finished in {:.1}s: {} created, {} skipped, {} failed",
            start.elapsed().as_secs_f64(),
            totals.created,
            totals.skipped,
            totals.failed
        );
        report
    }

    /// Run a single stage
    pub fn load_stage(&mut self, entity: EntityType, records: &[Record]) -> StageTally {
        let tally = match entity {
            EntityType::Sections => self.run(entity, records, Self::load_section),
            EntityType::Users => self.run(entity, records, Self::load_user),
            EntityType::Topics => self.run(entity, records, Self::load_topic),
            EntityType::Microblogs => self.run(entity, records, Self::load_microblog),
            EntityType::Posts => self.load_posts(records),
            EntityType::Personas => self.run(entity, records, Self::load_persona),
            EntityType::UserPersonas => self.run(entity, records, Self::load_user_persona),
            EntityType::Classrooms => self.run(entity, records, Self::load_classroom),
            EntityType::Feedback => self.run(entity, records, Self::load_feedback),
            EntityType::Study => self.run(entity, records, Self::load_study),
        };

        info!(
            "Loaded {entity}: {} created, {} skipped, {} failed",
            tally.created, tally.skipped, tally.failed
        );
        tally
    }

    fn run<T: FromRecord>(
        &mut self,
        entity: EntityType,
        records: &[Record],
        create: fn(&mut Self, &T) -> RecordResult,
    ) -> StageTally {
        let mut tally = StageTally::default();
        for raw in records {
            match T::from_record(raw) {
                Ok(record) => {
                    let result = create(self, &record);
                    tally.record(entity, &record.label(), result);
                }
                Err(e) => tally.fail(entity, &raw_label(raw), &e.into()),
            }
        }
        tally
    }

    /// Target id of a record's author
    fn resolve_author(&self, author: &AuthorRef) -> std::result::Result<i64, RecordLoadError> {
        if author.is_empty() {
            return Err(RecordLoadError::NoAuthor);
        }
        let uid = author.resolve_uid(&self.user_index);
        if let Some(uid) = &uid {
            if let Some(id) = self.db.user_id(uid)? {
                return Ok(id);
            }
        }
        if let Some(name) = &author.name {
            if let Some(id) = self.db.user_id_by_name(name)? {
                return Ok(id);
            }
        }
        match (uid, &author.name, author.source_user_id) {
            (Some(uid), _, _) => Err(RecordLoadError::missing("user", uid)),
            (None, Some(name), _) => Err(RecordLoadError::missing("user", name.clone())),
            (None, None, Some(id)) => Err(RecordLoadError::missing("source user", id.to_string())),
            (None, None, None) => Err(RecordLoadError::NoAuthor),
        }
    }

    // ========================================================================
    // Natural-key stages
    // ========================================================================

    fn load_section(&mut self, section: &SectionRecord) -> RecordResult {
        if self.db.section_id(&section.abbreviation)?.is_some() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }
        Ok(Outcome::Created(self.db.insert_section(section)?))
    }

    fn load_user(&mut self, user: &UserRecord) -> RecordResult {
        if self.db.user_id(&user.uid)?.is_some() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }

        let mut section_ids = Vec::with_capacity(user.sections.len());
        for abbreviation in &user.sections {
            match self.db.section_id(abbreviation)? {
                Some(id) => section_ids.push(id),
                None => debug!("User {}: unknown section '{abbreviation}' ignored", user.uid),
            }
        }

        Ok(Outcome::Created(self.db.insert_user(user, &section_ids)?))
    }

    fn load_topic(&mut self, topic: &TopicRecord) -> RecordResult {
        if self.db.topic_id(&topic.page_path)?.is_some() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }
        Ok(Outcome::Created(self.db.insert_topic(topic)?))
    }

    fn load_persona(&mut self, persona: &PersonaRecord) -> RecordResult {
        if self.db.persona(&persona.alias)?.is_some() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }
        Ok(Outcome::Created(self.db.insert_persona(persona)?))
    }

    // ========================================================================
    // Dependent stages
    // ========================================================================

    fn load_microblog(&mut self, microblog: &MicroblogRecord) -> RecordResult {
        let user_id = match self.resolve_author(&microblog.author) {
            Ok(id) => id,
            Err(RecordLoadError::MissingDependency { kind, key }) => {
                return Ok(Outcome::Skipped(SkipReason::UnresolvedReference(format!(
                    "{kind} '{key}'"
                ))));
            }
            Err(RecordLoadError::NoAuthor) => {
                return Ok(Outcome::Skipped(SkipReason::UnresolvedReference(
                    "author".to_string(),
                )));
            }
            Err(e) => return Err(e),
        };

        let topic_id = match &microblog.topic_path {
            Some(path) => {
                let id = self.db.topic_id(path)?;
                if id.is_none() {
                    debug!("Microblog {}: unknown topic '{path}'", microblog.label());
                }
                id
            }
            None => None,
        };

        let Some(content) = microblog.content.as_deref() else {
            return Ok(Outcome::Skipped(SkipReason::Empty("content")));
        };

        Ok(Outcome::Created(self.db.insert_microblog(
            user_id,
            topic_id,
            content,
            &microblog.data,
        )?))
    }

    /// Top-level posts first, then replies through the old → new id remap
    fn load_posts(&mut self, records: &[Record]) -> StageTally {
        let entity = EntityType::Posts;
        let mut tally = StageTally::default();
        let mut remap: HashMap<i64, i64> = HashMap::new();
        let mut top_level = Vec::new();
        let mut replies = Vec::new();

        for raw in records {
            match PostRecord::from_record(raw) {
                Ok(post) => match post.parent_id {
                    Some(parent_id) => replies.push((parent_id, post)),
                    None => top_level.push(post),
                },
                Err(e) => tally.fail(entity, &raw_label(raw), &e.into()),
            }
        }

        for post in &top_level {
            let result = self.create_post(post, None, &mut remap);
            tally.record(entity, &post.label(), result);
        }

        // Replies may point at other replies; retry until a pass makes no progress
        let mut pending = replies;
        let mut pass = 0;
        while !pending.is_empty() {
            pass += 1;
            let before = pending.len();
            let mut unresolved = Vec::new();

            for (parent_id, reply) in pending {
                match remap.get(&parent_id).copied() {
                    Some(new_parent) => {
                        let result = self.create_post(&reply, Some(new_parent), &mut remap);
                        tally.record(entity, &reply.label(), result);
                    }
                    None => unresolved.push((parent_id, reply)),
                }
            }

            debug!("Reply pass {pass}: {} of {before} unresolved", unresolved.len());
            if unresolved.len() == before {
                for (parent_id, reply) in &unresolved {
                    tally.fail(
                        entity,
                        &reply.label(),
                        &RecordLoadError::OrphanReply {
                            parent_id: *parent_id,
                        },
                    );
                }
                break;
            }
            pending = unresolved;
        }

        tally
    }

    fn create_post(
        &mut self,
        post: &PostRecord,
        parent_id: Option<i64>,
        remap: &mut HashMap<i64, i64>,
    ) -> RecordResult {
        let user_id = self.resolve_author(&post.author)?;
        let id = self.db.insert_post(post, user_id, parent_id)?;
        if let Some(old_id) = post.source_id {
            remap.insert(old_id, id);
        }
        Ok(Outcome::Created(id))
    }

    fn load_user_persona(&mut self, link: &UserPersonaRecord) -> RecordResult {
        let user_id = match &link.user_uid {
            Some(uid) => self.db.user_id(uid)?,
            None => None,
        };
        let Some(user_id) = user_id else {
            return Ok(Outcome::Skipped(SkipReason::UnresolvedReference(format!(
                "user '{}'",
                link.user_uid.as_deref().unwrap_or_default()
            ))));
        };

        let persona = match &link.persona_alias {
            Some(alias) => self.db.persona(alias)?,
            None => None,
        };
        let Some((persona_id, category)) = persona else {
            return Ok(Outcome::Skipped(SkipReason::UnresolvedReference(format!(
                "persona '{}'",
                link.persona_alias.as_deref().unwrap_or_default()
            ))));
        };

        if self.db.user_persona_exists(user_id, persona_id)? {
            return Ok(Outcome::Skipped(SkipReason::AlreadyExists));
        }

        let weight = link
            .weight
            .unwrap_or_else(|| category_weight(category.as_deref()));
        self.db
            .insert_user_persona(user_id, persona_id, weight, link.selected_at.as_deref())?;
        Ok(Outcome::Created(0))
    }

    fn load_classroom(&mut self, classroom: &ClassroomRecord) -> RecordResult {
        let owner_id = match &classroom.owner_uid {
            Some(uid) => self.db.user_id(uid)?,
            None => None,
        };
        let Some(owner_id) = owner_id else {
            return Ok(Outcome::Skipped(SkipReason::UnresolvedReference(format!(
                "owner '{}'",
                classroom.owner_uid.as_deref().unwrap_or_default()
            ))));
        };

        let mut student_ids = Vec::with_capacity(classroom.student_uids.len());
        for uid in &classroom.student_uids {
            match self.db.user_id(uid)? {
                Some(id) => student_ids.push(id),
                None => debug!("Classroom {}: unknown student '{uid}' ignored", classroom.label()),
            }
        }

        Ok(Outcome::Created(self.db.insert_classroom(
            classroom,
            owner_id,
            &student_ids,
        )?))
    }

    fn load_feedback(&mut self, feedback: &FeedbackRecord) -> RecordResult {
        Ok(Outcome::Created(self.db.insert_feedback(feedback)?))
    }

    fn load_study(&mut self, study: &StudyRecord) -> RecordResult {
        let user_id = match &study.user_uid {
            Some(uid) => self.db.user_id(uid)?,
            None => None,
        };
        Ok(Outcome::Created(self.db.insert_study(study, user_id)?))
    }
}
