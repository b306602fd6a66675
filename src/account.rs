//! In-memory account store
//!
//! Accounts are kept densely packed in insertion order. Deleting an account
//! shifts every later record down by one, so an account's index is only
//! meaningful at the moment it was read. Callers that need to refer to an
//! account over time hold its `AccountId` instead.

use tracing::debug;

use crate::error::AccountError;
use crate::types::AccountId;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LEN: usize = 14;

/// Longest accepted password, in characters
pub const MAX_PASSWORD_LEN: usize = 11;

/// Number of slots allocated before the first growth
pub const INITIAL_CAPACITY: usize = 10;

/// A registered user
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    password: String,
}

impl Account {
    fn new(username: &str, password: &str) -> Self {
        Self {
            id: AccountId::new(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Ordered username/password records with linear lookup
#[derive(Debug)]
pub struct AccountStore {
    accounts: Vec<Account>,
    capacity: usize,
}

impl AccountStore {
    /// Create an empty store with the initial capacity
    pub fn new() -> Self {
        Self {
            accounts: Vec::with_capacity(INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
        }
    }

    /// Add an account, returning its index
    ///
    /// Fails without touching the store if the username is taken or either
    /// field is out of bounds. Capacity doubles when the store is full.
    pub fn create(&mut self, username: &str, password: &str) -> Result<usize, AccountError> {
        if username.is_empty() {
            return Err(AccountError::EmptyUsername);
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AccountError::UsernameTooLong {
                max: MAX_USERNAME_LEN,
            });
        }
        if password.chars().count() > MAX_PASSWORD_LEN {
            return Err(AccountError::PasswordTooLong {
                max: MAX_PASSWORD_LEN,
            });
        }
        if self.find(username).is_some() {
            return Err(AccountError::UsernameTaken);
        }

        if self.accounts.len() >= self.capacity {
            let grown = self.capacity * 2;
            self.accounts.reserve_exact(grown - self.accounts.len());
            debug!("Account store grown from {} to {}", self.capacity, grown);
            self.capacity = grown;
        }

        self.accounts.push(Account::new(username, password));
        Ok(self.accounts.len() - 1)
    }

    /// Remove an account by username, compacting the store
    pub fn delete(&mut self, username: &str) -> Result<(), AccountError> {
        let index = self.find(username).ok_or(AccountError::NotFound)?;
        // Vec::remove shifts the tail down, preserving relative order
        self.accounts.remove(index);
        Ok(())
    }

    /// Find the index of an account by exact (case-sensitive) username
    pub fn find(&self, username: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.username == username)
    }

    /// Check a password against the account at `index`
    ///
    /// Returns false for an out-of-range index.
    pub fn verify(&self, index: usize, password: &str) -> bool {
        self.accounts
            .get(index)
            .is_some_and(|a| a.password == password)
    }

    /// Username of the account at `index`
    pub fn username_at(&self, index: usize) -> Option<&str> {
        self.accounts.get(index).map(|a| a.username.as_str())
    }

    /// Stable id of the account at `index`
    pub fn id_at(&self, index: usize) -> Option<AccountId> {
        self.accounts.get(index).map(|a| a.id)
    }

    /// Current index of the account with the given id
    pub fn index_of(&self, id: AccountId) -> Option<usize> {
        self.accounts.iter().position(|a| a.id == id)
    }

    /// Username of the account with the given id
    pub fn username_of(&self, id: AccountId) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.username.as_str())
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if the store holds no accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Number of slots before the next growth
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}
