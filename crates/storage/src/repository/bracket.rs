use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Bracket, BracketFormat, GroupingKey, Participant};

/// Repository for Bracket and BracketParticipant rows
pub struct BracketRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> BracketRepository<'c> {
    /// Create a new BracketRepository on a connection or open transaction
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Get the bracket for `key`, creating it if absent, and lock its row.
    ///
    /// A concurrent insert of the same key loses the race silently and reads the
    /// winner's row instead.
    pub async fn get_or_create(&mut self, key: &GroupingKey, format: BracketFormat) -> Result<Bracket> {
        sqlx::query(
            r#"
            INSERT INTO brackets (bracket_id, event_id, category_code, class_code, sex, belt_group, format)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT ON CONSTRAINT brackets_grouping_key DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.event_id)
        .bind(&key.category_code)
        .bind(&key.class_code)
        .bind(&key.sex)
        .bind(key.belt_group)
        .bind(format)
        .execute(&mut *self.conn)
        .await?;

        let bracket = sqlx::query_as::<_, Bracket>(
            r#"
            SELECT bracket_id, event_id, category_code, class_code, sex, belt_group,
                   format, is_generated, created_at
            FROM brackets
            WHERE event_id = $1
              AND category_code = $2
              AND class_code = $3
              AND sex = $4
              AND belt_group IS NOT DISTINCT FROM $5
            FOR UPDATE
            "#,
        )
        .bind(key.event_id)
        .bind(&key.category_code)
        .bind(&key.class_code)
        .bind(&key.sex)
        .bind(key.belt_group)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(bracket)
    }

    /// Get a bracket by ID
    pub async fn find_by_id(&mut self, bracket_id: Uuid) -> Result<Bracket> {
        sqlx::query_as::<_, Bracket>(
            r#"
            SELECT bracket_id, event_id, category_code, class_code, sex, belt_group,
                   format, is_generated, created_at
            FROM brackets
            WHERE bracket_id = $1
            "#,
        )
        .bind(bracket_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("bracket {}", bracket_id)))
    }

    /// Get a bracket by ID, holding its row lock until the transaction ends
    pub async fn lock(&mut self, bracket_id: Uuid) -> Result<Bracket> {
        sqlx::query_as::<_, Bracket>(
            r#"
            SELECT bracket_id, event_id, category_code, class_code, sex, belt_group,
                   format, is_generated, created_at
            FROM brackets
            WHERE bracket_id = $1
            FOR UPDATE
            "#,
        )
        .bind(bracket_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("bracket {}", bracket_id)))
    }

    /// List the brackets of an event
    pub async fn list_by_event(&mut self, event_id: Uuid) -> Result<Vec<Bracket>> {
        let brackets = sqlx::query_as::<_, Bracket>(
            r#"
            SELECT bracket_id, event_id, category_code, class_code, sex, belt_group,
                   format, is_generated, created_at
            FROM brackets
            WHERE event_id = $1
            ORDER BY category_code, class_code, sex, belt_group NULLS FIRST
            "#,
        )
        .bind(event_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(brackets)
    }

    pub async fn mark_generated(&mut self, bracket_id: Uuid, format: BracketFormat) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE brackets
            SET format = $2, is_generated = TRUE
            WHERE bracket_id = $1
            "#,
        )
        .bind(bracket_id)
        .bind(format)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    pub async fn reset(&mut self, bracket_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE brackets SET is_generated = FALSE WHERE bracket_id = $1")
            .bind(bracket_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    /// List a bracket's participants in seed order
    pub async fn list_participants(&mut self, bracket_id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT athlete_id, organization_id, seed
            FROM bracket_participants
            WHERE bracket_id = $1
            ORDER BY seed, athlete_id
            "#,
        )
        .bind(bracket_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(participants)
    }

    pub async fn insert_participants(&mut self, bracket_id: Uuid, participants: &[Participant]) -> Result<()> {
        for participant in participants {
            sqlx::query(
                r#"
                INSERT INTO bracket_participants (bracket_id, athlete_id, organization_id, seed)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(bracket_id)
            .bind(participant.athlete_id)
            .bind(participant.organization_id)
            .bind(participant.seed)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| {
                let err = StorageError::from(e);
                if err.is_unique_violation() {
                    StorageError::conflict(format!(
                        "athlete {} entered twice in bracket {}",
                        participant.athlete_id, bracket_id
                    ))
                } else {
                    err
                }
            })?;
        }

        Ok(())
    }

    pub async fn delete_participants(&mut self, bracket_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM bracket_participants WHERE bracket_id = $1")
            .bind(bracket_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }
}
