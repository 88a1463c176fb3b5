use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kvant_types::domain::order::{NewOrder, Order, OrderId};
use kvant_types::domain::user::{NewUser, User, UserFilter, UserId};
use kvant_types::ports::order_repository::OrderRepository;
use kvant_types::ports::user_repository::UserRepository;
use kvant_types::ports::RepoError;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Dashmap-backed storage. Ids come from monotonic counters, so sorting by id
/// yields insertion order.
///
/// Lock order is always `emails` before `users`.
#[derive(Clone)]
pub struct InMemoryRepo {
    users: Arc<DashMap<UserId, User>>,
    emails: Arc<DashMap<String, UserId>>,
    orders: Arc<DashMap<OrderId, Order>>,
    next_user_id: Arc<AtomicI64>,
    next_order_id: Arc<AtomicI64>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            emails: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
            next_user_id: Arc::new(AtomicI64::new(1)),
            next_order_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of stored orders across all users.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn email_taken(email: &str) -> RepoError {
    RepoError::Conflict(format!("email {email} already exists"))
}

#[async_trait]
impl UserRepository for InMemoryRepo {
    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        match self.emails.entry(user.profile.email.clone()) {
            Entry::Occupied(_) => Err(email_taken(&user.profile.email)),
            Entry::Vacant(slot) => {
                let id = self.next_user_id.fetch_add(1, Ordering::SeqCst);
                let created = User::from_new(id, user);
                self.users.insert(id, created.clone());
                slot.insert(id);
                Ok(created)
            }
        }
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let id = match self.emails.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, u64), RepoError> {
        let mut matching: Vec<User> = self
            .users
            .iter()
            .filter(|kv| filter.matches(kv.value().age))
            .map(|kv| kv.value().clone())
            .collect();
        matching.sort_by_key(|u| u.id);

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, user: User) -> Result<Option<User>, RepoError> {
        if !self.users.contains_key(&user.id) {
            return Ok(None);
        }

        // The claim on the new email stays locked while the row is written.
        let (claim, reserved) = match self.emails.entry(user.email.clone()) {
            Entry::Occupied(owner) if *owner.get() != user.id => {
                return Err(email_taken(&user.email));
            }
            Entry::Occupied(owner) => (owner.into_ref(), false),
            Entry::Vacant(slot) => (slot.insert(user.id), true),
        };
        let applied = self.users.get_mut(&user.id).map(|mut row| {
            let previous = std::mem::replace(&mut row.email, user.email.clone());
            row.name = user.name.clone();
            row.age = user.age;
            (previous, row.clone())
        });
        drop(claim);

        let Some((previous, updated)) = applied else {
            // Deleted in the meantime.
            if reserved {
                self.emails.remove_if(&user.email, |_, owner| *owner == user.id);
            }
            return Ok(None);
        };

        if previous != updated.email {
            // Only release it if no concurrent update moved the row back to it.
            self.emails.remove_if(&previous, |_, owner| {
                *owner == updated.id
                    && self
                        .users
                        .get(&updated.id)
                        .map_or(true, |row| row.email != previous)
            });
        }
        Ok(Some(updated))
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepoError> {
        let Some((_, removed)) = self.users.remove(&id) else {
            return Ok(false);
        };
        self.emails.remove(&removed.email);
        self.orders.retain(|_, o| o.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepoError> {
        // Holding the owner's row keeps `delete` from removing it until the
        // order is in place, so its cascade sees the new order.
        let Some(_owner) = self.users.get(&order.user_id) else {
            return Err(RepoError::DbError(format!(
                "user {} does not exist",
                order.user_id
            )));
        };
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let created = Order::from_new(id, order);
        self.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepoError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|kv| kv.value().user_id == user_id)
            .map(|kv| kv.value().clone())
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}
