use crate::application::password::Passwords;
use crate::application::token::JwtService;
use crate::errors::AppError;
use kvant_types::ports::user_repository::UserRepository;

pub const INVALID_CREDENTIALS: &str = "invalid email or password";

pub struct AuthService<R: UserRepository> {
    repo: R,
    passwords: Passwords,
    jwt: JwtService,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: R, passwords: Passwords, jwt: JwtService) -> Self {
        Self {
            repo,
            passwords,
            jwt,
        }
    }

    /// Returns a signed token. Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: String) -> Result<String, AppError> {
        let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.into());

        let Some(user) = self.repo.find_by_email(email).await? else {
            tracing::debug!("login rejected: unknown email");
            return Err(invalid());
        };
        if !self.passwords.verify(password, user.password_hash).await? {
            tracing::debug!(user_id = user.id, "login rejected: wrong password");
            return Err(invalid());
        }

        let token = self
            .jwt
            .issue(user.id)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))?;
        tracing::info!(user_id = user.id, "login succeeded");
        Ok(token)
    }
}
