#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use kvant_types::domain::order::{NewOrder, Order};
use kvant_types::domain::user::{NewUser, User, UserFilter, UserId};
use kvant_types::ports::order_repository::OrderRepository;
use kvant_types::ports::user_repository::UserRepository;
use kvant_types::ports::RepoError;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub const DEFAULT_SQLITE_URL: &str = "sqlite://kvant.db";

/// The storage adapter selected at startup.
#[derive(Clone)]
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

/// Picks an adapter: SQLite when a URL is given and the `sqlite` feature is on,
/// otherwise in-memory, otherwise SQLite at `DEFAULT_SQLITE_URL`.
pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Repo> {
    match database_url {
        #[cfg(feature = "sqlite")]
        Some(url) => Ok(Repo::Sqlite(sqlite::SqliteRepo::new(url).await?)),
        _ => fallback_repo().await,
    }
}

#[cfg(feature = "memory")]
async fn fallback_repo() -> anyhow::Result<Repo> {
    Ok(Repo::Memory(memory::InMemoryRepo::new()))
}

#[cfg(not(feature = "memory"))]
async fn fallback_repo() -> anyhow::Result<Repo> {
    Ok(Repo::Sqlite(sqlite::SqliteRepo::new(DEFAULT_SQLITE_URL).await?))
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($inner) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($inner) => $call,
        }
    };
}

#[async_trait::async_trait]
impl UserRepository for Repo {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        dispatch!(self, r => r.create(user).await)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepoError> {
        dispatch!(self, r => r.get(id).await)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        dispatch!(self, r => r.find_by_email(email).await)
    }

    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), RepoError> {
        dispatch!(self, r => r.list(filter).await)
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepoError> {
        dispatch!(self, r => r.update(user).await)
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepoError> {
        dispatch!(self, r => r.delete(id).await)
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError> {
        dispatch!(self, r => r.create_order(order).await)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, r => r.list_by_user(user_id).await)
    }
}
