use async_trait::async_trait;

use super::RepoError;
use crate::domain::user::{NewUser, User, UserFilter, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Stores a user and assigns its id. Fails with `Conflict` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    async fn get(&self, id: UserId) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Returns one page in id order plus the total number of matching users.
    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), RepoError>;
    /// Overwrites name, email and age. `None` when the user does not exist.
    async fn update(&self, user: User) -> Result<Option<User>, RepoError>;
    /// Removes the user and their orders.
    async fn delete(&self, id: UserId) -> Result<bool, RepoError>;
}
