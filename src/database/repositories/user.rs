use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use crate::database::models::{User, UserInput};

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account without a password; such users log in via
    /// autologin links until they set one.
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        input: UserInput,
    ) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, is_staff, is_active, date_joined)
            VALUES (?, ?, 0, 1, ?)
            RETURNING id, name, email, password_hash, is_staff, is_active, last_login, date_joined
            "#,
        )
        .bind(input.name)
        .bind(input.email)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        Ok(user)
    }

    pub async fn create_with_password(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, is_staff, is_active, date_joined)
            VALUES (?, ?, ?, ?, 1, ?)
            RETURNING id, name, email, password_hash, is_staff, is_active, last_login, date_joined
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(is_staff)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_staff, is_active, last_login, date_joined
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, is_staff, is_active, last_login, date_joined
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_last_login(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn activate(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET is_active = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All active members of a named role group.
    pub async fn in_group(&self, group_name: &str) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.is_staff, u.is_active,
                   u.last_login, u.date_joined
            FROM users u
            INNER JOIN user_groups g ON g.user_id = u.id
            WHERE g.name = ? AND u.is_active = 1
            "#,
        )
        .bind(group_name)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn add_to_group(&self, user_id: i64, group_name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, name) VALUES (?, ?)")
            .bind(user_id)
            .bind(group_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, email, password_hash, is_staff, is_active, last_login, date_joined \
             FROM users WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        builder.build_query_as::<User>().fetch_all(&self.pool).await
    }
}
