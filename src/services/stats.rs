// Generation statistics for the admin dashboard.
// Every generation attempt is recorded; the dashboard reads aggregates and recent rows.

use async_trait::async_trait;
use chrono::{Duration, Local, Utc};
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

use crate::models::generation::{
    GenerationRecord, GenerationStatistics, NewGeneration, GENERATION_TYPE_IMAGE,
    GENERATION_TYPE_VIDEO, STATUS_SUCCESS,
};

pub const DEFAULT_RECENT_LIMIT: i64 = 20;
pub const MAX_RECENT_LIMIT: i64 = 200;
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
/// About a century; larger cutoffs fall outside the timestamp range.
pub const MAX_RETENTION_DAYS: i64 = 36_500;
/// Oldest in-memory records are dropped past this count.
pub const MAX_MEMORY_RECORDS: usize = 10_000;

pub fn clamp_recent_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT)
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn record_generation(&self, generation: NewGeneration) -> Result<i64, sqlx::Error>;

    async fn get_statistics(&self) -> Result<GenerationStatistics, sqlx::Error>;

    /// Newest first.
    async fn recent_generations(&self, limit: i64) -> Result<Vec<GenerationRecord>, sqlx::Error>;

    /// Deletes records older than `days` and returns how many went.
    async fn cleanup_old_records(&self, days: i64) -> Result<u64, sqlx::Error>;

    async fn reset(&self) -> Result<u64, sqlx::Error>;
}

/// Records a generation, logging instead of failing the caller.
pub async fn record_quietly(store: &Arc<dyn StatsStore>, generation: NewGeneration) {
    let kind = generation.generation_type.clone();
    match store.record_generation(generation).await {
        Ok(id) => tracing::debug!("📊 Recorded {} generation #{}", kind, id),
        Err(e) => tracing::warn!("⚠️ Failed to record {} generation: {}", kind, e),
    }
}

#[derive(Debug, Clone)]
pub struct PgStatsStore {
    pool: PgPool,
}

impl PgStatsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsStore for PgStatsStore {
    async fn record_generation(&self, generation: NewGeneration) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO generations (
                generation_type, prompt, status, model_name, generation_time, file_count
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&generation.generation_type)
        .bind(&generation.prompt)
        .bind(&generation.status)
        .bind(&generation.model_name)
        .bind(generation.generation_time)
        .bind(generation.file_count)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn get_statistics(&self) -> Result<GenerationStatistics, sqlx::Error> {
        let (total, today, images, videos, success): (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE created_at::date = CURRENT_DATE),
                COUNT(*) FILTER (WHERE generation_type = $1),
                COUNT(*) FILTER (WHERE generation_type = $2),
                COUNT(*) FILTER (WHERE status = $3)
            FROM generations
            "#,
        )
        .bind(GENERATION_TYPE_IMAGE)
        .bind(GENERATION_TYPE_VIDEO)
        .bind(STATUS_SUCCESS)
        .fetch_one(&self.pool)
        .await?;

        Ok(GenerationStatistics {
            total_generations: total,
            today_generations: today,
            image_generations: images,
            video_generations: videos,
            success_rate: GenerationStatistics::success_rate(success, total),
        })
    }

    async fn recent_generations(&self, limit: i64) -> Result<Vec<GenerationRecord>, sqlx::Error> {
        sqlx::query_as::<_, GenerationRecord>(
            r#"
            SELECT id, generation_type, prompt, status, created_at,
                   model_name, generation_time, file_count
            FROM generations
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn cleanup_old_records(&self, days: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM generations WHERE created_at < NOW() - make_interval(days => $1::int)",
        )
        .bind(days.clamp(1, MAX_RETENTION_DAYS) as i32)
        .execute(&self.pool)
        .await?;

        tracing::info!("🧹 Removed {} generation records older than {} days", result.rows_affected(), days);
        Ok(result.rows_affected())
    }

    async fn reset(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generations")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Process-local store used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    records: Mutex<Vec<GenerationRecord>>,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GenerationRecord>> {
        // a poisoned lock still holds valid records
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StatsStore for MemoryStatsStore {
    async fn record_generation(&self, generation: NewGeneration) -> Result<i64, sqlx::Error> {
        let mut records = self.lock();
        let id = records.last().map(|r| r.id + 1).unwrap_or(1);
        records.push(GenerationRecord {
            id,
            generation_type: generation.generation_type,
            prompt: generation.prompt,
            status: generation.status,
            created_at: Utc::now(),
            model_name: generation.model_name,
            generation_time: generation.generation_time,
            file_count: generation.file_count,
        });
        if records.len() > MAX_MEMORY_RECORDS {
            let excess = records.len() - MAX_MEMORY_RECORDS;
            records.drain(..excess);
        }
        Ok(id)
    }

    async fn get_statistics(&self) -> Result<GenerationStatistics, sqlx::Error> {
        let records = self.lock();
        let today = Local::now().date_naive();
        let count = |pred: &dyn Fn(&GenerationRecord) -> bool| {
            records.iter().filter(|r| pred(r)).count() as i64
        };

        let total = records.len() as i64;
        let success = count(&|r| r.status == STATUS_SUCCESS);

        Ok(GenerationStatistics {
            total_generations: total,
            today_generations: count(&|r| r.created_at.with_timezone(&Local).date_naive() == today),
            image_generations: count(&|r| r.generation_type == GENERATION_TYPE_IMAGE),
            video_generations: count(&|r| r.generation_type == GENERATION_TYPE_VIDEO),
            success_rate: GenerationStatistics::success_rate(success, total),
        })
    }

    async fn recent_generations(&self, limit: i64) -> Result<Vec<GenerationRecord>, sqlx::Error> {
        let records = self.lock();
        Ok(records
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn cleanup_old_records(&self, days: i64) -> Result<u64, sqlx::Error> {
        // a cutoff before the earliest representable time matches nothing
        let Some(cutoff) = Duration::try_days(days).and_then(|d| Utc::now().checked_sub_signed(d))
        else {
            return Ok(0);
        };
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }

    async fn reset(&self) -> Result<u64, sqlx::Error> {
        let mut records = self.lock();
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }
}
