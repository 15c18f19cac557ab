//! User Repository

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::shared::canon::Role;
use crate::shared::db::{format_datetime, parse_datetime};
use crate::shared::error::{Result, TrackingError};
use crate::user::entity::{NewUser, User};

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, user: &NewUser) -> Result<User> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, role, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .map(|db_err| db_err.is_unique_violation())
                .unwrap_or(false);
            if unique {
                TrackingError::duplicate("User", "email", user.email.clone())
            } else {
                TrackingError::from(e)
            }
        })?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted user not found"))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let role_code: String = row.get("role");
        let role = Role::from_input(&role_code)
            .ok_or_else(|| TrackingError::internal(format!("Corrupt role in store: {}", role_code)))?;

        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::db::memory_pool;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Maria Silva".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::Espectador,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = memory_pool().await.unwrap();
        let repo = UserRepository::new(pool);

        let user = repo.insert(&new_user("maria@example.com")).await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.role, Role::Espectador);

        let by_email = repo.find_by_email("maria@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let pool = memory_pool().await.unwrap();
        let repo = UserRepository::new(pool);

        repo.insert(&new_user("maria@example.com")).await.unwrap();
        let err = repo.insert(&new_user("maria@example.com")).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }
}
