use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use transpak_core::domain::user::{User, UserId};

use super::{decode_error, decode_timestamp, encode_timestamp, RepositoryError, UserRepository};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, email, company_name, contact_name, phone, password_hash,
        is_active, is_admin, api_key_digest, created_at, last_login
     FROM users";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE {column} = ?"))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let last_login: Option<String> = row.try_get("last_login").map_err(decode_error)?;

    Ok(User {
        id: UserId(row.try_get("id").map_err(decode_error)?),
        email: row.try_get("email").map_err(decode_error)?,
        company_name: row.try_get("company_name").map_err(decode_error)?,
        contact_name: row.try_get("contact_name").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        is_admin: row.try_get("is_admin").map_err(decode_error)?,
        api_key_digest: row.try_get("api_key_digest").map_err(decode_error)?,
        created_at: decode_timestamp(&created_at)?,
        last_login: last_login.as_deref().map(decode_timestamp).transpose()?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, email, company_name, contact_name, phone, password_hash,
                                is_active, is_admin, api_key_digest, created_at, last_login)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id.0)
        .bind(&user.email)
        .bind(&user.company_name)
        .bind(&user.contact_name)
        .bind(user.phone.as_deref())
        .bind(user.password_hash.as_deref())
        .bind(user.is_active)
        .bind(user.is_admin)
        .bind(user.api_key_digest.as_deref())
        .bind(encode_timestamp(user.created_at))
        .bind(user.last_login.map(encode_timestamp))
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::from_write(error, "user"))?;

        self.find_by_id(&user.id)
            .await?
            .ok_or_else(|| RepositoryError::Decode(format!("user `{}` vanished", user.id)))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.find_where("id", &id.0).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find_where("email", &email.trim().to_ascii_lowercase()).await
    }

    async fn find_by_api_key_digest(&self, digest: &str) -> Result<Option<User>, RepositoryError> {
        self.find_where("api_key_digest", digest).await
    }

    async fn touch_last_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(encode_timestamp(at))
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
