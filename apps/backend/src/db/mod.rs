//! PostgreSQL database operations
//!
//! Every diary-scoped query is filtered by the owning user, so rows that
//! belong to someone else behave exactly like missing rows.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::QueryAs;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use dayflow_core::{
    plan_calendar_bridge, CalendarEventInput, DiarySettings, GeneratedDiary, TimelineEntryDraft,
};

use crate::error::{ApiError, Result};
use crate::models::*;

const DIARY_COLUMNS: &str = "id, user_id, date, diary_text, spending_insight, \
     tomorrow_suggestion, total_spending, thumb_event_id, diary_preview, primary_emoji, \
     photo_url, created_at, updated_at";

const TIMELINE_COLUMNS: &str = "id, diary_id, time, emoji, title, description, location, \
     spending, category, source, source_id, is_deleted, photo_url, ai_analysis, sort_order, \
     created_at, updated_at";

const PHOTO_COLUMNS: &str = "id, diary_id, url, thumbnail_url, ai_analysis, extracted_time, \
     extracted_location, time_source, created_at";

const CALENDAR_COLUMNS: &str = "id, user_id, date, diary_id, title, description, start_time, \
     end_time, location, all_day, calendar_id, emoji, created_at";

const USER_COLUMNS: &str = "user_id, name, age, gender, calendar_url, profile_image, \
     google_token, created_at, last_seen_at";

/// Map a unique-constraint violation to a 409, anything else to a database error.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict(message.to_string())
        }
        _ => ApiError::Database(err),
    }
}

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === User Repository ===

    /// Create the user row on first sight and bump `last_seen_at`.
    pub async fn touch_user(&self, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET last_seen_at = NOW()
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<DbUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let user = sqlx::query_as::<_, DbUser>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update profile fields; absent fields keep their stored value
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        update: &UpdateUserRequest,
    ) -> Result<DbUser> {
        let sql = format!(
            r#"
            INSERT INTO users (user_id, name, age, gender, calendar_url, profile_image)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, users.name),
                age = COALESCE(EXCLUDED.age, users.age),
                gender = COALESCE(EXCLUDED.gender, users.gender),
                calendar_url = COALESCE(EXCLUDED.calendar_url, users.calendar_url),
                profile_image = COALESCE(EXCLUDED.profile_image, users.profile_image),
                last_seen_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, DbUser>(&sql)
            .bind(user_id)
            .bind(&update.name)
            .bind(update.age)
            .bind(&update.gender)
            .bind(&update.calendar_url)
            .bind(&update.profile_image)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    /// Store (or clear, with `None`) the serialized OAuth token
    pub async fn set_google_token(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, google_token)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET google_token = EXCLUDED.google_token
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_google_token(&self, user_id: &str) -> Result<Option<String>> {
        let token = sqlx::query_scalar::<_, Option<String>>(
            "SELECT google_token FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token.flatten())
    }

    /// Stored diary settings; unreadable values count as unset
    pub async fn get_diary_settings(&self, user_id: &str) -> Result<Option<DiarySettings>> {
        let stored = sqlx::query_scalar::<_, Option<serde_json::Value>>(
            "SELECT diary_settings FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        Ok(stored.and_then(|value| match serde_json::from_value(value) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Ignoring unreadable diary settings");
                None
            }
        }))
    }

    pub async fn set_diary_settings(&self, user_id: &str, settings: &DiarySettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, diary_settings)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET diary_settings = EXCLUDED.diary_settings
            "#,
        )
        .bind(user_id)
        .bind(Json(settings))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === Diary Repository ===

    /// Return the diary for (user, date), creating an empty draft if needed.
    ///
    /// A single statement, so concurrent callers converge on one row.
    pub async fn get_or_create_diary(&self, user_id: &str, date: NaiveDate) -> Result<DbDiary> {
        let sql = format!(
            r#"
            INSERT INTO diaries (user_id, date)
            VALUES ($1, $2)
            ON CONFLICT (user_id, date) DO UPDATE SET date = EXCLUDED.date
            RETURNING {DIARY_COLUMNS}
            "#
        );
        let diary = sqlx::query_as::<_, DbDiary>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_one(&self.pool)
            .await?;

        Ok(diary)
    }

    /// Write a diary for (user, date) together with new timeline entries.
    ///
    /// One transaction: if any entry fails, or `thumb_event_id` is not an
    /// entry of the diary, the stored diary is left untouched.
    pub async fn save_diary_with_timeline(
        &self,
        user_id: &str,
        date: NaiveDate,
        id: Option<Uuid>,
        fields: &DiaryWrite,
        entries: &[TimelineEntryDraft],
    ) -> Result<(DbDiary, Vec<DbTimelineEvent>)> {
        let mut tx = self.pool.begin().await?;

        let diary = upsert_diary(&mut tx, user_id, date, id, fields).await?;
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            rows.push(insert_timeline_entry(&mut tx, diary.id, entry).await?);
        }

        if let Some(thumb_event_id) = fields.thumb_event_id {
            let known = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM timeline_events WHERE id = $1 AND diary_id = $2)",
            )
            .bind(thumb_event_id)
            .bind(diary.id)
            .fetch_one(&mut *tx)
            .await?;
            if !known {
                return Err(ApiError::BadRequest(format!(
                    "thumb_event_id {thumb_event_id} is not an entry of this diary"
                )));
            }
        }

        tx.commit().await?;

        tracing::info!(diary_id = %diary.id, entries = rows.len(), "Saved diary");
        Ok((diary, rows))
    }

    /// Store the model-written fields of a diary
    pub async fn save_generated_diary(
        &self,
        user_id: &str,
        diary_id: Uuid,
        generated: &GeneratedDiary,
        preview: &str,
        primary_emoji: Option<&str>,
    ) -> Result<Option<DbDiary>> {
        let sql = format!(
            r#"
            UPDATE diaries SET
                diary_text = $3,
                spending_insight = $4,
                tomorrow_suggestion = $5,
                total_spending = $6,
                diary_preview = $7,
                primary_emoji = COALESCE($8, primary_emoji),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {DIARY_COLUMNS}
            "#
        );
        let diary = sqlx::query_as::<_, DbDiary>(&sql)
            .bind(diary_id)
            .bind(user_id)
            .bind(&generated.diary_text)
            .bind(&generated.spending_insight)
            .bind(&generated.tomorrow_suggestion)
            .bind(generated.total_spending)
            .bind(preview)
            .bind(primary_emoji)
            .fetch_optional(&self.pool)
            .await?;

        Ok(diary)
    }

    pub async fn get_diary(&self, user_id: &str, diary_id: Uuid) -> Result<Option<DbDiary>> {
        let sql = format!("SELECT {DIARY_COLUMNS} FROM diaries WHERE id = $1 AND user_id = $2");
        let diary = sqlx::query_as::<_, DbDiary>(&sql)
            .bind(diary_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(diary)
    }

    /// Most recent diaries first, each with its active timeline
    pub async fn get_diary_history(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<DiaryHistoryItem>> {
        let sql = format!(
            r#"
            SELECT {DIARY_COLUMNS}
            FROM diaries
            WHERE user_id = $1
            ORDER BY date DESC
            LIMIT $2
            "#
        );
        let diaries = sqlx::query_as::<_, DbDiary>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        if diaries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = diaries.iter().map(|d| d.id).collect();
        let sql = format!(
            r#"
            SELECT {TIMELINE_COLUMNS}
            FROM timeline_events
            WHERE diary_id = ANY($1) AND NOT is_deleted
            ORDER BY time, sort_order, created_at
            "#
        );
        let events = sqlx::query_as::<_, DbTimelineEvent>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_diary: HashMap<Uuid, Vec<DbTimelineEvent>> = HashMap::new();
        for event in events {
            by_diary.entry(event.diary_id).or_default().push(event);
        }

        Ok(diaries
            .into_iter()
            .map(|diary| DiaryHistoryItem {
                timeline_events: by_diary.remove(&diary.id).unwrap_or_default(),
                diary,
            })
            .collect())
    }

    /// Mark a timeline entry of the diary as the user's favourite
    pub async fn set_thumb_event(
        &self,
        user_id: &str,
        diary_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<DbDiary>> {
        let sql = format!(
            r#"
            UPDATE diaries
            SET thumb_event_id = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
              AND EXISTS (SELECT 1 FROM timeline_events WHERE id = $3 AND diary_id = $1)
            RETURNING {DIARY_COLUMNS}
            "#
        );
        let diary = sqlx::query_as::<_, DbDiary>(&sql)
            .bind(diary_id)
            .bind(user_id)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(diary)
    }

    /// Delete a diary; timeline entries and photos cascade
    pub async fn delete_diary(&self, user_id: &str, diary_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM diaries WHERE id = $1 AND user_id = $2")
            .bind(diary_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // === Timeline Repository ===

    /// Insert entries in order within one transaction
    pub async fn insert_timeline_entries(
        &self,
        diary_id: Uuid,
        entries: &[TimelineEntryDraft],
    ) -> Result<Vec<DbTimelineEvent>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            rows.push(insert_timeline_entry(&mut tx, diary_id, entry).await?);
        }
        tx.commit().await?;

        Ok(rows)
    }

    /// Non-deleted entries of a diary in display order
    pub async fn get_active_timeline(
        &self,
        user_id: &str,
        diary_id: Uuid,
    ) -> Result<Vec<DbTimelineEvent>> {
        let sql = format!(
            r#"
            SELECT {TIMELINE_COLUMNS}
            FROM timeline_events
            WHERE diary_id = $1 AND NOT is_deleted
              AND diary_id IN (SELECT id FROM diaries WHERE user_id = $2)
            ORDER BY time, sort_order, created_at
            "#
        );
        let events = sqlx::query_as::<_, DbTimelineEvent>(&sql)
            .bind(diary_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Fetch one entry by id, soft-deleted or not
    pub async fn get_timeline_event(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> Result<Option<DbTimelineEvent>> {
        let sql = format!(
            r#"
            SELECT {TIMELINE_COLUMNS}
            FROM timeline_events
            WHERE id = $1 AND diary_id IN (SELECT id FROM diaries WHERE user_id = $2)
            "#
        );
        let event = sqlx::query_as::<_, DbTimelineEvent>(&sql)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    pub async fn update_spending(
        &self,
        user_id: &str,
        event_id: Uuid,
        amount: i64,
    ) -> Result<Option<DbTimelineEvent>> {
        self.update_event(user_id, event_id, "spending = $3", Some(amount))
            .await
    }

    /// Hide an entry from the active timeline, keeping the row
    pub async fn soft_delete_event(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> Result<Option<DbTimelineEvent>> {
        self.update_event(user_id, event_id, "is_deleted = TRUE", None)
            .await
    }

    pub async fn restore_event(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> Result<Option<DbTimelineEvent>> {
        self.update_event(user_id, event_id, "is_deleted = FALSE", None)
            .await
    }

    async fn update_event(
        &self,
        user_id: &str,
        event_id: Uuid,
        assignment: &str,
        value: Option<i64>,
    ) -> Result<Option<DbTimelineEvent>> {
        let sql = format!(
            r#"
            UPDATE timeline_events
            SET {assignment}, updated_at = NOW()
            WHERE id = $1 AND diary_id IN (SELECT id FROM diaries WHERE user_id = $2)
            RETURNING {TIMELINE_COLUMNS}
            "#
        );
        let mut query = sqlx::query_as::<_, DbTimelineEvent>(&sql)
            .bind(event_id)
            .bind(user_id);
        if let Some(value) = value {
            query = query.bind(value);
        }

        // Restoring can collide with a newer active copy of a calendar event
        let event = query.fetch_optional(&self.pool).await.map_err(|e| {
            conflict_on_unique(e, "An active entry for this calendar event already exists")
        })?;
        Ok(event)
    }

    // === Photo Repository ===

    pub async fn insert_photos(&self, diary_id: Uuid, photos: &[NewPhoto]) -> Result<Vec<DbPhoto>> {
        if photos.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::with_capacity(photos.len());
        for photo in photos {
            rows.push(insert_photo(&mut tx, diary_id, photo).await?);
        }
        tx.commit().await?;

        Ok(rows)
    }

    pub async fn get_photos(&self, user_id: &str, diary_id: Uuid) -> Result<Vec<DbPhoto>> {
        let sql = format!(
            r#"
            SELECT {PHOTO_COLUMNS}
            FROM photos
            WHERE diary_id = $1 AND diary_id IN (SELECT id FROM diaries WHERE user_id = $2)
            ORDER BY extracted_time NULLS LAST, created_at
            "#
        );
        let photos = sqlx::query_as::<_, DbPhoto>(&sql)
            .bind(diary_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(photos)
    }

    /// Store a photo and its timeline entry together
    pub async fn save_photo_event(
        &self,
        diary_id: Uuid,
        photo: &NewPhoto,
        entry: &TimelineEntryDraft,
    ) -> Result<(DbPhoto, DbTimelineEvent)> {
        let mut tx = self.pool.begin().await?;
        let photo_row = insert_photo(&mut tx, diary_id, photo).await?;
        let event_row = insert_timeline_entry(&mut tx, diary_id, entry).await?;
        tx.commit().await?;

        Ok((photo_row, event_row))
    }

    // === Calendar Repository ===

    /// Store a day's calendar events and bridge new ones into the diary.
    ///
    /// Calendar rows of (user, date) are replaced; timeline entries are only
    /// added for provider ids the diary does not already show. Imports into
    /// the same diary are serialized on its row lock, and the partial unique
    /// index on calendar source ids backs up the dedup.
    pub async fn import_calendar_events(
        &self,
        user_id: &str,
        date: NaiveDate,
        diary_id: Uuid,
        events: &[CalendarEventInput],
    ) -> Result<(Vec<DbCalendarEvent>, Vec<DbTimelineEvent>)> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM diaries WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(diary_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::NotFound("Diary not found".to_string()))?;

        sqlx::query("DELETE FROM calendar_events WHERE user_id = $1 AND date = $2")
            .bind(user_id)
            .bind(date)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            r#"
            INSERT INTO calendar_events (user_id, date, diary_id, title, description, start_time,
                                         end_time, location, all_day, calendar_id, emoji)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {CALENDAR_COLUMNS}
            "#
        );
        let mut saved = Vec::with_capacity(events.len());
        for event in events {
            let row = sqlx::query_as::<_, DbCalendarEvent>(&sql)
                .bind(user_id)
                .bind(date)
                .bind(diary_id)
                .bind(&event.title)
                .bind(&event.description)
                .bind(&event.start_time)
                .bind(&event.end_time)
                .bind(&event.location)
                .bind(event.all_day)
                .bind(event.provider_id())
                .bind(&event.emoji)
                .fetch_one(&mut *tx)
                .await?;
            saved.push(row);
        }

        let existing = active_calendar_source_ids(&mut tx, diary_id).await?;
        let drafts = plan_calendar_bridge(events, &existing);
        let mut inserted = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            if let Some(row) = insert_calendar_entry(&mut tx, diary_id, draft).await? {
                inserted.push(row);
            }
        }

        tx.commit().await?;
        Ok((saved, inserted))
    }

    pub async fn get_calendar_events(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<DbCalendarEvent>> {
        let sql = format!(
            r#"
            SELECT {CALENDAR_COLUMNS}
            FROM calendar_events
            WHERE user_id = $1 AND date = $2
            ORDER BY start_time
            "#
        );
        let events = sqlx::query_as::<_, DbCalendarEvent>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    pub async fn delete_calendar_events(&self, user_id: &str, date: NaiveDate) -> Result<u64> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE user_id = $1 AND date = $2")
            .bind(user_id)
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

const TIMELINE_INSERT: &str = r#"
    INSERT INTO timeline_events (diary_id, time, emoji, title, description, location,
                                 spending, category, source, source_id, photo_url,
                                 ai_analysis, sort_order)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

fn bind_entry<'q>(
    query: QueryAs<'q, Postgres, DbTimelineEvent, PgArguments>,
    diary_id: Uuid,
    entry: &'q TimelineEntryDraft,
) -> QueryAs<'q, Postgres, DbTimelineEvent, PgArguments> {
    query
        .bind(diary_id)
        .bind(&entry.time)
        .bind(&entry.emoji)
        .bind(&entry.title)
        .bind(&entry.description)
        .bind(&entry.location)
        .bind(entry.spending)
        .bind(&entry.category)
        .bind(entry.source.as_str())
        .bind(&entry.source_id)
        .bind(&entry.photo_url)
        .bind(&entry.ai_analysis)
        .bind(entry.sort_order)
}

async fn insert_timeline_entry(
    tx: &mut Transaction<'_, Postgres>,
    diary_id: Uuid,
    entry: &TimelineEntryDraft,
) -> Result<DbTimelineEvent> {
    let sql = format!("{TIMELINE_INSERT} RETURNING {TIMELINE_COLUMNS}");
    let row = bind_entry(sqlx::query_as::<_, DbTimelineEvent>(&sql), diary_id, entry)
        .fetch_one(&mut **tx)
        .await?;

    Ok(row)
}

/// Insert a bridged calendar entry unless the diary already shows it.
async fn insert_calendar_entry(
    tx: &mut Transaction<'_, Postgres>,
    diary_id: Uuid,
    entry: &TimelineEntryDraft,
) -> Result<Option<DbTimelineEvent>> {
    let sql = format!(
        r#"{TIMELINE_INSERT}
        ON CONFLICT (diary_id, source_id)
            WHERE source = 'calendar' AND source_id IS NOT NULL AND NOT is_deleted
            DO NOTHING
        RETURNING {TIMELINE_COLUMNS}"#
    );
    let row = bind_entry(sqlx::query_as::<_, DbTimelineEvent>(&sql), diary_id, entry)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(row)
}

/// Provider ids already represented by active calendar entries of a diary
async fn active_calendar_source_ids(
    tx: &mut Transaction<'_, Postgres>,
    diary_id: Uuid,
) -> Result<HashSet<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT source_id
        FROM timeline_events
        WHERE diary_id = $1 AND source = 'calendar'
          AND source_id IS NOT NULL AND NOT is_deleted
        "#,
    )
    .bind(diary_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(ids.into_iter().collect())
}

async fn insert_photo(
    tx: &mut Transaction<'_, Postgres>,
    diary_id: Uuid,
    photo: &NewPhoto,
) -> Result<DbPhoto> {
    let sql = format!(
        r#"
        INSERT INTO photos (diary_id, url, thumbnail_url, ai_analysis, extracted_time,
                            extracted_location, time_source)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {PHOTO_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, DbPhoto>(&sql)
        .bind(diary_id)
        .bind(&photo.url)
        .bind(&photo.thumbnail_url)
        .bind(&photo.ai_analysis)
        .bind(&photo.extracted_time)
        .bind(&photo.extracted_location)
        .bind(photo.time_source.map(|s| s.as_str()))
        .fetch_one(&mut **tx)
        .await?;

    Ok(row)
}

/// Write the diary row for (user, date).
///
/// With an explicit id the row is keyed by id (and must belong to the
/// user); otherwise by the (user, date) unique constraint.
async fn upsert_diary(
    tx: &mut Transaction<'_, Postgres>,
    user_id: &str,
    date: NaiveDate,
    id: Option<Uuid>,
    fields: &DiaryWrite,
) -> Result<DbDiary> {
    let (sql, target) = match id {
        Some(_) => (
            format!(
                r#"
                INSERT INTO diaries (id, user_id, date, diary_text, spending_insight,
                                     tomorrow_suggestion, total_spending, thumb_event_id,
                                     diary_preview, primary_emoji, photo_url)
                VALUES ($11, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE SET
                    date = EXCLUDED.date,
                    diary_text = EXCLUDED.diary_text,
                    spending_insight = EXCLUDED.spending_insight,
                    tomorrow_suggestion = EXCLUDED.tomorrow_suggestion,
                    total_spending = EXCLUDED.total_spending,
                    thumb_event_id = EXCLUDED.thumb_event_id,
                    diary_preview = EXCLUDED.diary_preview,
                    primary_emoji = EXCLUDED.primary_emoji,
                    photo_url = EXCLUDED.photo_url,
                    updated_at = NOW()
                WHERE diaries.user_id = EXCLUDED.user_id
                RETURNING {DIARY_COLUMNS}
                "#
            ),
            "id",
        ),
        None => (
            format!(
                r#"
                INSERT INTO diaries (user_id, date, diary_text, spending_insight,
                                     tomorrow_suggestion, total_spending, thumb_event_id,
                                     diary_preview, primary_emoji, photo_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (user_id, date) DO UPDATE SET
                    diary_text = EXCLUDED.diary_text,
                    spending_insight = EXCLUDED.spending_insight,
                    tomorrow_suggestion = EXCLUDED.tomorrow_suggestion,
                    total_spending = EXCLUDED.total_spending,
                    thumb_event_id = EXCLUDED.thumb_event_id,
                    diary_preview = EXCLUDED.diary_preview,
                    primary_emoji = EXCLUDED.primary_emoji,
                    photo_url = EXCLUDED.photo_url,
                    updated_at = NOW()
                RETURNING {DIARY_COLUMNS}
                "#
            ),
            "date",
        ),
    };

    let mut query = sqlx::query_as::<_, DbDiary>(&sql)
        .bind(user_id)
        .bind(date)
        .bind(&fields.diary_text)
        .bind(&fields.spending_insight)
        .bind(&fields.tomorrow_suggestion)
        .bind(fields.total_spending)
        .bind(fields.thumb_event_id)
        .bind(&fields.diary_preview)
        .bind(&fields.primary_emoji)
        .bind(&fields.photo_url);
    if let Some(id) = id {
        query = query.bind(id);
    }

    let diary = query
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Another diary already exists for this date"))?
        .ok_or_else(|| ApiError::NotFound("Diary not found".to_string()))?;

    tracing::debug!(diary_id = %diary.id, keyed_by = target, "Upserted diary row");
    Ok(diary)
}
