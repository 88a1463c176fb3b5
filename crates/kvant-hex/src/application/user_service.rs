use crate::application::notifications::{Notification, NotificationQueue};
use crate::application::password::Passwords;
use crate::errors::AppError;
use kvant_types::domain::user::{NewUser, User, UserFilter, UserId, UserProfile};
use kvant_types::ports::user_repository::UserRepository;

pub struct UserService<R: UserRepository> {
    repo: R,
    passwords: Passwords,
    notifications: NotificationQueue,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R, passwords: Passwords, notifications: NotificationQueue) -> Self {
        Self {
            repo,
            passwords,
            notifications,
        }
    }

    pub async fn create_user(
        &self,
        name: String,
        email: String,
        age: i32,
        password: String,
    ) -> Result<User, AppError> {
        let profile =
            UserProfile::new(name, email, age).map_err(|e| AppError::BadRequest(e.to_string()))?;
        if password.is_empty() {
            return Err(AppError::BadRequest("password empty".into()));
        }
        if self.repo.find_by_email(&profile.email).await?.is_some() {
            return Err(AppError::BadRequest("email already exists".into()));
        }

        let password_hash = self.passwords.hash(password).await?;
        let user = self
            .repo
            .create(NewUser {
                profile,
                password_hash,
            })
            .await?;
        tracing::info!(user_id = user.id, "user registered");

        self.notifications.enqueue(Notification::Welcome {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        });
        Ok(user)
    }

    pub async fn list_users(&self, filter: UserFilter) -> Result<(Vec<User>, u64), AppError> {
        Ok(self.repo.list(&filter).await?)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, AppError> {
        match self.repo.get(id).await? {
            Some(u) => Ok(u),
            None => Err(AppError::NotFound(format!("user {}", id))),
        }
    }

    /// Replaces name, email and age. The password is not touched here.
    pub async fn update_user(
        &self,
        id: UserId,
        name: String,
        email: String,
        age: i32,
    ) -> Result<User, AppError> {
        let profile =
            UserProfile::new(name, email, age).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let mut user = self.get_user(id).await?;

        if profile.email != user.email {
            if let Some(owner) = self.repo.find_by_email(&profile.email).await? {
                if owner.id != id {
                    return Err(AppError::BadRequest("email already exists".into()));
                }
            }
        }

        user.apply_profile(profile);
        match self.repo.update(user).await? {
            Some(u) => Ok(u),
            None => Err(AppError::NotFound(format!("user {}", id))),
        }
    }

    pub async fn delete_user(&self, id: UserId) -> Result<(), AppError> {
        if self.repo.delete(id).await? {
            tracing::info!(user_id = id, "user deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("user {}", id)))
        }
    }
}
