use crate::core::custodian::CustodianId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// A tracker user and the custodians they may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub custodians: Vec<CustodianId>,
}

impl User {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            custodians: Vec::new(),
        }
    }

    pub fn with_custodians(mut self, custodians: impl IntoIterator<Item = CustodianId>) -> Self {
        self.custodians.extend(custodians);
        self
    }

    pub fn can_access(&self, custodian: CustodianId) -> bool {
        self.custodians.contains(&custodian)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("user {0} not found")]
    NotFound(u32),
    #[error("user {0} exists already")]
    AlreadyExists(u32),
}

/// Lookup of tracker users.
pub trait UserStore: Send + Sync {
    fn get_user(&self, id: u32) -> Result<User, UserError>;
    fn add_user(&self, user: User) -> Result<(), UserError>;
}

/// Users held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<u32, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the demo user 1, who owns the four seeded custodians.
    pub fn populate(&self) -> Result<(), UserError> {
        self.add_user(User::new(1).with_custodians((1..=4).map(CustodianId::new)))
    }

    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStore for InMemoryUserStore {
    fn get_user(&self, id: u32) -> Result<User, UserError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(&id).cloned().ok_or(UserError::NotFound(id))
    }

    fn add_user(&self, user: User) -> Result<(), UserError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&user.id) {
            return Err(UserError::AlreadyExists(user.id));
        }
        users.insert(user.id, user);
        Ok(())
    }
}
