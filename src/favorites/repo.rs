use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Favorite-city record. City name is an opaque exact-match string; it is
/// stored exactly as the client supplied it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub city_name: String,
    pub country: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Favorite {
    /// All favorites owned by the user, most recently added first.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Favorite>> {
        let rows = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, user_id, city_name, country, created_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Advisory existence check before insert; the unique constraint is the
    /// actual race guarantee.
    pub async fn find_by_city(
        db: &PgPool,
        user_id: Uuid,
        city_name: &str,
    ) -> anyhow::Result<Option<Favorite>> {
        let row = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, user_id, city_name, country, created_at
            FROM favorites
            WHERE user_id = $1 AND city_name = $2
            "#,
        )
        .bind(user_id)
        .bind(city_name)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        city_name: &str,
        country: &str,
    ) -> anyhow::Result<Favorite> {
        let row = sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, city_name, country)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, city_name, country, created_at
            "#,
        )
        .bind(user_id)
        .bind(city_name)
        .bind(country)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Delete by id, guarded by ownership. Returns false when no row matched,
    /// which covers both "absent" and "owned by someone else".
    pub async fn delete_by_id(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM favorites
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete by exact city name, guarded by ownership.
    pub async fn delete_by_city(
        db: &PgPool,
        user_id: Uuid,
        city_name: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM favorites
            WHERE city_name = $1 AND user_id = $2
            "#,
        )
        .bind(city_name)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorite_serializes_camel_case() {
        let favorite = Favorite {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            city_name: "Paris".into(),
            country: "FR".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&favorite).unwrap();
        assert_eq!(json["cityName"], "Paris");
        assert_eq!(json["country"], "FR");
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("city_name").is_none());
    }
}
