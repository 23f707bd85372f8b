use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        JournalEntry, JournalEntryCreate, JournalEntryUpdate, JournalListQuery,
        JournalListResponse,
    },
    repositories::JournalRepository,
    utils::validation::{
        sanitize_text, validate_journal_content, validate_journal_title, validate_limit,
        validate_tags,
    },
};

pub const MAX_JOURNAL_PAGE: i64 = 100;
const MAX_LABEL_LEN: usize = 50;

/// Mood and energy are short free-text labels; blank clears them.
fn clean_label(field: &str, value: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let cleaned = sanitize_text(raw);
    if cleaned.is_empty() {
        return Ok(None);
    }
    if cleaned.chars().count() > MAX_LABEL_LEN {
        return Err(ApiError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_LABEL_LEN
        )));
    }
    Ok(Some(cleaned))
}

pub struct JournalService {
    journal_repo: Arc<dyn JournalRepository>,
}

impl JournalService {
    pub fn new(journal_repo: Arc<dyn JournalRepository>) -> Self {
        Self { journal_repo }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        payload: JournalEntryCreate,
    ) -> Result<JournalEntry, ApiError> {
        let now = Utc::now();
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            user_id,
            title: validate_journal_title(&payload.title)?,
            content: validate_journal_content(&payload.content)?,
            mood: clean_label("Mood", payload.mood.as_deref())?,
            energy_level: clean_label("Energy level", payload.energy_level.as_deref())?,
            tags: validate_tags(&payload.tags)?,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.journal_repo.create(&entry).await?;
        tracing::info!(user_id = %user_id, entry_id = %created.id, "Journal entry created");
        Ok(created)
    }

    /// Newest first, trashed entries excluded.
    pub async fn list(
        &self,
        user_id: Uuid,
        query: &JournalListQuery,
    ) -> Result<JournalListResponse, ApiError> {
        let limit = validate_limit(query.limit, MAX_JOURNAL_PAGE)?;
        if query.offset < 0 {
            return Err(ApiError::validation("offset must not be negative"));
        }
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let (entries, total_count) = self
            .journal_repo
            .list(user_id, search, limit, query.offset)
            .await?;

        Ok(JournalListResponse {
            entries,
            total_count,
            limit,
            offset: query.offset,
        })
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<JournalEntry, ApiError> {
        self.journal_repo
            .get_by_id(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Journal entry not found"))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        payload: JournalEntryUpdate,
    ) -> Result<JournalEntry, ApiError> {
        let mut entry = self.get(user_id, id).await?;

        if let Some(title) = payload.title.as_deref() {
            entry.title = validate_journal_title(title)?;
        }
        if let Some(content) = payload.content.as_deref() {
            entry.content = validate_journal_content(content)?;
        }
        if payload.mood.is_some() {
            entry.mood = clean_label("Mood", payload.mood.as_deref())?;
        }
        if payload.energy_level.is_some() {
            entry.energy_level = clean_label("Energy level", payload.energy_level.as_deref())?;
        }
        if let Some(tags) = payload.tags.as_deref() {
            entry.tags = validate_tags(tags)?;
        }
        entry.updated_at = Utc::now();

        self.journal_repo.update(&entry).await
    }

    /// Moves the entry to the trash.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.journal_repo.soft_delete(user_id, id).await? {
            return Err(ApiError::not_found("Journal entry not found"));
        }
        tracing::info!(user_id = %user_id, entry_id = %id, "Journal entry moved to trash");
        Ok(())
    }

    pub async fn trash(&self, user_id: Uuid) -> Result<Vec<JournalEntry>, ApiError> {
        self.journal_repo.list_trash(user_id).await
    }

    pub async fn restore(&self, user_id: Uuid, id: Uuid) -> Result<JournalEntry, ApiError> {
        self.journal_repo
            .restore(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Journal entry not found in trash"))
    }

    /// Only entries already in the trash can be removed for good.
    pub async fn delete_permanently(&self, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
        if !self.journal_repo.delete_permanently(user_id, id).await? {
            return Err(ApiError::not_found("Journal entry not found in trash"));
        }
        tracing::info!(user_id = %user_id, entry_id = %id, "Journal entry permanently deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryJournalRepository;

    fn service() -> JournalService {
        JournalService::new(Arc::new(InMemoryJournalRepository::default()))
    }

    fn entry(title: &str, content: &str) -> JournalEntryCreate {
        JournalEntryCreate {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_sanitizes() {
        let service = service();
        let created = service
            .create(
                Uuid::new_v4(),
                JournalEntryCreate {
                    title: "<i>Morning</i> pages".into(),
                    content: "line one\nline <b>two</b>".into(),
                    mood: Some("  ".into()),
                    energy_level: Some("high".into()),
                    tags: vec!["calm".into(), "calm".into(), "".into()],
                },
            )
            .await
            .unwrap();

        assert_eq!(created.title, "Morning pages");
        assert_eq!(created.content, "line one\nline two");
        assert_eq!(created.mood, None);
        assert_eq!(created.energy_level.as_deref(), Some("high"));
        assert_eq!(created.tags, vec!["calm".to_string()]);
    }

    #[tokio::test]
    async fn test_title_required() {
        let err = service()
            .create(Uuid::new_v4(), entry("", "body"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_search_and_paging() {
        let service = service();
        let user = Uuid::new_v4();
        service.create(user, entry("Gratitude", "sunny walk")).await.unwrap();
        service.create(user, entry("Work", "long meeting")).await.unwrap();
        service.create(user, entry("Evening", "another WALK")).await.unwrap();

        let found = service
            .list(
                user,
                &JournalListQuery {
                    search: Some("walk".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(found.total_count, 2);

        let page = service
            .list(
                user,
                &JournalListQuery {
                    search: None,
                    limit: 1,
                    offset: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.total_count, 3);

        let bad = JournalListQuery {
            search: None,
            limit: 0,
            offset: 0,
        };
        assert!(service.list(user, &bad).await.is_err());
    }

    #[tokio::test]
    async fn test_trash_lifecycle() {
        let service = service();
        let user = Uuid::new_v4();
        let created = service.create(user, entry("Draft", "")).await.unwrap();

        // Permanent delete only works from the trash
        assert!(service.delete_permanently(user, created.id).await.is_err());

        service.delete(user, created.id).await.unwrap();
        assert!(matches!(
            service.get(user, created.id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert_eq!(service.trash(user).await.unwrap().len(), 1);

        let restored = service.restore(user, created.id).await.unwrap();
        assert!(restored.deleted_at.is_none());
        assert!(service.trash(user).await.unwrap().is_empty());

        service.delete(user, created.id).await.unwrap();
        service.delete_permanently(user, created.id).await.unwrap();
        assert!(service.restore(user, created.id).await.is_err());
    }
}
