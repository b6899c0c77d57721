use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::{debug, error, info, warn};

use crate::config::DbConfig;
use crate::error::StoreError;
use crate::users::model::{User, UserUpdate};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    password VARCHAR(100) NOT NULL,
    name VARCHAR(100) NOT NULL,
    email VARCHAR(100) UNIQUE NOT NULL,
    age INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Data access for the `users` table over one private connection.
///
/// Database errors never escape: every operation catches, logs, and
/// degrades to `None`, `false`, or an empty list. Not-found is a normal
/// outcome, not an error.
pub struct UserStore {
    config: DbConfig,
    conn: Option<PgConnection>,
}

impl UserStore {
    pub fn new(config: DbConfig) -> Self {
        Self { config, conn: None }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Establish the connection. Returns `false` on failure; the cause is
    /// logged. Calling while already connected keeps the existing
    /// connection.
    pub async fn connect(&mut self) -> bool {
        if self.conn.is_some() {
            return true;
        }
        match PgConnection::connect_with(&self.config.connect_options()).await {
            Ok(conn) => {
                debug!(
                    host = %self.config.host,
                    database = %self.config.database,
                    "database connection established"
                );
                self.conn = Some(conn);
                true
            }
            Err(e) => {
                error!(
                    error = %e,
                    host = %self.config.host,
                    database = %self.config.database,
                    "database connection failed"
                );
                false
            }
        }
    }

    /// Close the connection gracefully. Safe to call when not connected.
    pub async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "closing database connection failed");
            } else {
                debug!("database connection closed");
            }
        }
    }

    /// Idempotent table creation; safe on every startup.
    pub async fn ensure_schema(&mut self) -> bool {
        match self.try_ensure_schema().await {
            Ok(()) => {
                info!("users table ready");
                true
            }
            Err(e) => {
                error!(error = %e, "create users table failed");
                false
            }
        }
    }

    /// Insert one user and return the generated id, or `None` on any
    /// database error (duplicate email included).
    pub async fn insert(
        &mut self,
        name: &str,
        email: &str,
        age: Option<i32>,
        password: &str,
    ) -> Option<i32> {
        match self.try_insert(name, email, age, password).await {
            Ok(id) => {
                info!(user_id = id, email = %email, "user inserted");
                Some(id)
            }
            Err(e) if e.is_unique_violation() => {
                warn!(email = %email, "insert rejected, email already registered");
                None
            }
            Err(e) => {
                error!(error = %e, email = %email, "insert user failed");
                None
            }
        }
    }

    pub async fn get_by_id(&mut self, id: i32) -> Option<User> {
        match self.try_get_by_id(id).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                debug!(user_id = id, "no user with this id");
                None
            }
            Err(e) => {
                error!(error = %e, user_id = id, "get user by id failed");
                None
            }
        }
    }

    pub async fn get_by_email(&mut self, email: &str) -> Option<User> {
        match self.try_get_by_email(email).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                debug!(email = %email, "no user with this email");
                None
            }
            Err(e) => {
                error!(error = %e, email = %email, "get user by email failed");
                None
            }
        }
    }

    /// All users ordered by ascending id; empty list when the table is
    /// empty or on error.
    pub async fn get_all(&mut self) -> Vec<User> {
        match self.try_get_all().await {
            Ok(users) => {
                debug!(count = users.len(), "listed users");
                users
            }
            Err(e) => {
                error!(error = %e, "list users failed");
                Vec::new()
            }
        }
    }

    /// Write only the supplied fields. An empty field set returns `false`
    /// without issuing a statement. `true` iff at least one row changed.
    pub async fn update(&mut self, id: i32, fields: &UserUpdate) -> bool {
        if fields.is_empty() {
            warn!(user_id = id, "update called with no fields");
            return false;
        }
        match self.try_update(id, fields).await {
            Ok(true) => {
                info!(user_id = id, "user updated");
                true
            }
            Ok(false) => {
                debug!(user_id = id, "update matched no user");
                false
            }
            Err(e) if e.is_unique_violation() => {
                warn!(user_id = id, "update rejected, email already registered");
                false
            }
            Err(e) => {
                error!(error = %e, user_id = id, "update user failed");
                false
            }
        }
    }

    /// Hard delete. `true` iff a row was removed.
    pub async fn delete(&mut self, id: i32) -> bool {
        match self.try_delete(id).await {
            Ok(true) => {
                info!(user_id = id, "user deleted");
                true
            }
            Ok(false) => {
                debug!(user_id = id, "delete matched no user");
                false
            }
            Err(e) => {
                error!(error = %e, user_id = id, "delete user failed");
                false
            }
        }
    }

    /// Case-insensitive substring match on `name`, ordered by ascending
    /// id. LIKE metacharacters in the pattern are matched literally.
    pub async fn search_by_name(&mut self, pattern: &str) -> Vec<User> {
        match self.try_search_by_name(pattern).await {
            Ok(users) => {
                debug!(count = users.len(), pattern = %pattern, "searched users by name");
                users
            }
            Err(e) => {
                error!(error = %e, pattern = %pattern, "search users by name failed");
                Vec::new()
            }
        }
    }

    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::NotConnected)
    }

    async fn try_ensure_schema(&mut self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        sqlx::query(CREATE_USERS_TABLE).execute(&mut *conn).await?;
        Ok(())
    }

    async fn try_insert(
        &mut self,
        name: &str,
        email: &str,
        age: Option<i32>,
        password: &str,
    ) -> Result<i32, StoreError> {
        let conn = self.conn()?;
        let mut tx = conn.begin().await?;
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (name, email, age, password)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(age)
        .bind(password)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn try_get_by_id(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, password, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    async fn try_get_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, password, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    async fn try_get_all(&mut self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn()?;
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, password, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(users)
    }

    async fn try_update(&mut self, id: i32, fields: &UserUpdate) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let Some(mut query) = build_update(id, fields) else {
            return Ok(false);
        };
        let mut tx = conn.begin().await?;
        let result = query.build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn try_delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let mut tx = conn.begin().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn try_search_by_name(&mut self, pattern: &str) -> Result<Vec<User>, StoreError> {
        let conn = self.conn()?;
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, password, created_at
            FROM users
            WHERE name ILIKE $1
            ORDER BY id
            "#,
        )
        .bind(like_pattern(pattern))
        .fetch_all(&mut *conn)
        .await?;
        Ok(users)
    }
}

/// Build `UPDATE users SET <col> = $n, ... WHERE id = $last` from the
/// supplied fields, every value bound. `None` when no field is set.
fn build_update<'a>(id: i32, fields: &'a UserUpdate) -> Option<QueryBuilder<'a, Postgres>> {
    if fields.is_empty() {
        return None;
    }

    let mut qb = QueryBuilder::new("UPDATE users SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(name) = fields.name.as_deref() {
            set.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = fields.email.as_deref() {
            set.push("email = ").push_bind_unseparated(email);
        }
        if let Some(age) = fields.age {
            set.push("age = ").push_bind_unseparated(age);
        }
        if let Some(password) = fields.password.as_deref() {
            set.push("password = ").push_bind_unseparated(password);
        }
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    Some(qb)
}

/// Wrap a search term as `%term%`, escaping LIKE metacharacters so the
/// match is a literal substring match.
fn like_pattern(pattern: &str) -> String {
    let escaped = pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_update_rejects_empty_field_set() {
        assert!(build_update(1, &UserUpdate::default()).is_none());
    }

    #[test]
    fn build_update_single_field_binds_id_second() {
        let fields = UserUpdate {
            age: Some(26),
            ..Default::default()
        };
        let qb = build_update(7, &fields).unwrap();
        assert_eq!(qb.sql(), "UPDATE users SET age = $1 WHERE id = $2");
    }

    #[test]
    fn build_update_applies_fields_in_declaration_order() {
        let fields = UserUpdate {
            name: Some("ZhangSan".into()),
            email: Some("zhangsan@example.com".into()),
            age: Some(26),
            password: Some("new-hash".into()),
        };
        let qb = build_update(1, &fields).unwrap();
        assert_eq!(
            qb.sql(),
            "UPDATE users SET name = $1, email = $2, age = $3, password = $4 WHERE id = $5"
        );
    }

    #[test]
    fn build_update_skips_unset_fields() {
        let fields = UserUpdate {
            name: Some("ZhangSan".into()),
            age: Some(26),
            ..Default::default()
        };
        let qb = build_update(1, &fields).unwrap();
        assert_eq!(qb.sql(), "UPDATE users SET name = $1, age = $2 WHERE id = $3");
    }

    #[test]
    fn like_pattern_wraps_plain_terms() {
        assert_eq!(like_pattern("a"), "%a%");
        assert_eq!(like_pattern("Zhang"), "%Zhang%");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }

    #[tokio::test]
    async fn operations_degrade_when_not_connected() {
        let mut store = UserStore::new(crate::config::DbConfig::default());
        assert!(!store.is_connected());

        assert!(store.insert("Zhang", "zhang@x.com", Some(25), "pw1").await.is_none());
        assert!(store.get_by_id(1).await.is_none());
        assert!(store.get_by_email("zhang@x.com").await.is_none());
        assert!(store.get_all().await.is_empty());
        assert!(!store.update(1, &UserUpdate { age: Some(26), ..Default::default() }).await);
        assert!(!store.delete(1).await);
        assert!(store.search_by_name("a").await.is_empty());

        // Safe when no connection is held.
        store.disconnect().await;
    }
}
