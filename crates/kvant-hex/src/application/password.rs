use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Salted argon2id hashing. Work runs on the blocking pool so request tasks
/// are not stalled by the deliberately slow hash.
#[derive(Clone, Debug, Default)]
pub struct Passwords {
    params: Params,
}

impl Passwords {
    /// Custom cost: memory in KiB, iterations, lanes.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> anyhow::Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self { params })
    }

    /// Cheapest parameters argon2 accepts. Only meant for tests.
    pub fn insecure_fast() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
                .unwrap_or_default(),
        }
    }

    pub async fn hash(&self, plain: String) -> anyhow::Result<String> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(plain.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
        })
        .await?
    }

    /// `Ok(false)` on mismatch. The cost parameters are read from the stored hash.
    pub async fn verify(&self, plain: String, stored_hash: String) -> anyhow::Result<bool> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored_hash)
                .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {e}"))?;
            match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(anyhow::anyhow!("password verification failed: {e}")),
            }
        })
        .await?
    }
}
