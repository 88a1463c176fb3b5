use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kvant_types::domain::order::{NewOrder, Order};
use kvant_types::domain::user::{NewUser, User, UserFilter, UserId};
use kvant_types::ports::order_repository::OrderRepository;
use kvant_types::ports::user_repository::UserRepository;
use kvant_types::ports::RepoError;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

const MIGRATIONS: [&str; 3] = [
    include_str!("../migrations/0001_create_users.sql"),
    include_str!("../migrations/0002_create_orders.sql"),
    include_str!("../migrations/0003_index_orders_user_id.sql"),
];

const USER_COLUMNS: &str = "id, name, email, age, password_hash";

#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbUser {
    id: i64,
    name: String,
    email: String,
    age: i32,
    password_hash: String,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            age: row.age,
            password_hash: row.password_hash,
        }
    }
}

#[derive(FromRow)]
struct DbOrder {
    id: i64,
    user_id: i64,
    product: String,
    quantity: i32,
    price: f64,
    created_at: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| RepoError::DbError(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            product: self.product,
            quantity: self.quantity,
            price: self.price,
            created_at,
        })
    }
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::DbError(e.to_string())
}

fn email_write_err(e: sqlx::Error, email: &str) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(format!("email {email} already exists"))
        }
        _ => db_err(e),
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;

        for ddl in MIGRATIONS {
            sqlx::query(ddl).execute(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl UserRepository for SqliteRepo {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let res = sqlx::query(
            "INSERT INTO users (name, email, age, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.profile.name)
        .bind(&user.profile.email)
        .bind(user.profile.age)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| email_write_err(e, &user.profile.email))?;
        Ok(User::from_new(res.last_insert_rowid(), user))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(row.map(User::from))
    }

    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), RepoError> {
        const WHERE_AGE: &str = "(?1 IS NULL OR age >= ?1) AND (?2 IS NULL OR age <= ?2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {WHERE_AGE}"))
            .bind(filter.min_age)
            .bind(filter.max_age)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        // SQLite reads a negative OFFSET as 0, so an offset past i64 must not wrap.
        let Ok(offset) = i64::try_from(filter.offset()) else {
            return Ok((Vec::new(), total as u64));
        };

        let rows: Vec<DbUser> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {WHERE_AGE} ORDER BY id LIMIT ?3 OFFSET ?4"
        ))
        .bind(filter.min_age)
        .bind(filter.max_age)
        .bind(i64::from(filter.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok((rows.into_iter().map(User::from).collect(), total as u64))
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepoError> {
        let updated = sqlx::query("UPDATE users SET name = ?, email = ?, age = ? WHERE id = ?")
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.age)
            .bind(user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| email_write_err(e, &user.email))?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(user.id).await
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError> {
        let res = sqlx::query(
            "INSERT INTO orders (user_id, product, quantity, price, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(order.user_id)
        .bind(&order.product)
        .bind(order.quantity)
        .bind(order.price)
        .bind(order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(Order::from_new(res.last_insert_rowid(), order))
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrder> = sqlx::query_as(
            "SELECT id, user_id, product, quantity, price, created_at
             FROM orders WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()
    }
}
