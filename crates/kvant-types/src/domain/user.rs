use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type UserId = i64;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// A registered user.
///
/// `password_hash` is an argon2 PHC string. It is never serialized, so a `User`
/// can be returned from any endpoint as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct User {
    #[schema(value_type = i64)]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub age: i32,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// The mutable, validated part of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl UserProfile {
    pub fn new(name: String, email: String, age: i32) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            anyhow::bail!("name empty");
        }
        if !email.contains('@') {
            anyhow::bail!("invalid email");
        }
        if age < 0 {
            anyhow::bail!("age must be >= 0");
        }
        Ok(Self { name, email, age })
    }
}

/// A user ready to be persisted; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub profile: UserProfile,
    pub password_hash: String,
}

impl User {
    pub fn from_new(id: UserId, new: NewUser) -> Self {
        Self {
            id,
            name: new.profile.name,
            email: new.profile.email,
            age: new.profile.age,
            password_hash: new.password_hash,
        }
    }

    /// Overwrites name, email and age. The password hash is left untouched.
    pub fn apply_profile(&mut self, profile: UserProfile) {
        self.name = profile.name;
        self.email = profile.email;
        self.age = profile.age;
    }
}

/// Page and inclusive age bounds for listing users.
///
/// A bound of `None` means unbounded; `Some(0)` is a real bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserFilter {
    pub page: u32,
    pub limit: u32,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            min_age: None,
            max_age: None,
        }
    }
}

impl UserFilter {
    pub fn new(
        page: Option<i64>,
        limit: Option<i64>,
        min_age: Option<i64>,
        max_age: Option<i64>,
    ) -> anyhow::Result<Self> {
        let page = match page {
            None => DEFAULT_PAGE,
            Some(p) if (1..=u32::MAX as i64).contains(&p) => p as u32,
            Some(_) => anyhow::bail!("invalid page parameter"),
        };
        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(l) if (1..=u32::MAX as i64).contains(&l) => l as u32,
            Some(_) => anyhow::bail!("invalid limit parameter"),
        };
        let min_age =
            age_bound(min_age).ok_or_else(|| anyhow::anyhow!("invalid min_age parameter"))?;
        let max_age =
            age_bound(max_age).ok_or_else(|| anyhow::anyhow!("invalid max_age parameter"))?;
        Ok(Self {
            page,
            limit,
            min_age,
            max_age,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn matches(&self, age: i32) -> bool {
        self.min_age.map_or(true, |min| age >= min) && self.max_age.map_or(true, |max| age <= max)
    }
}

// Outer None: invalid; inner None: no bound.
fn age_bound(raw: Option<i64>) -> Option<Option<i32>> {
    match raw {
        None => Some(None),
        Some(a) if (0..=i32::MAX as i64).contains(&a) => Some(Some(a as i32)),
        Some(_) => None,
    }
}
