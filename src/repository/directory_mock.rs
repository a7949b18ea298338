#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::SecretString;
use crate::config::DEFAULT_USER_MATCH_ATTRIBUTE;

use super::directory::{
    DirectoryEntry, DirectoryError, DirectorySearch, DirectoryService, escape_filter_value,
};

#[derive(Debug, Clone)]
pub struct MockAccount {
    pub password: String,
    /// Values returned for requested attributes, by name.
    pub attributes: HashMap<String, String>,
}

/// In-memory [`DirectoryService`] keyed by `uid`.
///
/// Accounts match when the request filter ends in `(uid=<escaped id>))`.
/// `server_down` makes the next N calls fail with
/// [`DirectoryError::ServerDown`]; `forced_error` fails every call.
#[derive(Clone, Default)]
pub struct MockDirectoryService {
    pub accounts: Arc<Mutex<HashMap<String, MockAccount>>>,
    pub server_down: Arc<Mutex<u32>>,
    pub forced_error: Arc<Mutex<Option<DirectoryError>>>,
    pub searches: Arc<Mutex<Vec<DirectorySearch>>>,
}

impl MockDirectoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, uid: &str, password: &str, attributes: &[(&str, &str)]) {
        self.accounts.lock().unwrap().insert(
            uid.to_owned(),
            MockAccount {
                password: password.to_owned(),
                attributes: attributes
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
            },
        );
    }

    pub fn fail_next(&self, times: u32) {
        *self.server_down.lock().unwrap() = times;
    }

    pub fn force_error(&self, error: DirectoryError) {
        *self.forced_error.lock().unwrap() = Some(error);
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn last_search(&self) -> Option<DirectorySearch> {
        self.searches.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DirectoryService for MockDirectoryService {
    async fn check_user(
        &self,
        search: &DirectorySearch,
        secret: &SecretString,
    ) -> Result<DirectoryEntry, DirectoryError> {
        self.searches.lock().unwrap().push(search.clone());

        {
            let mut down = self.server_down.lock().unwrap();
            if *down > 0 {
                *down -= 1;
                return Err(DirectoryError::ServerDown);
            }
        }
        if let Some(error) = self.forced_error.lock().unwrap().clone() {
            return Err(error);
        }

        let accounts = self.accounts.lock().unwrap();
        let found = accounts.iter().find(|(uid, _)| {
            let clause = format!("({DEFAULT_USER_MATCH_ATTRIBUTE}={}))", escape_filter_value(uid));
            search.filter.ends_with(&clause)
        });
        let Some((uid, account)) = found else {
            return Err(DirectoryError::NoSuchObject);
        };
        if account.password != secret.expose_secret() {
            return Err(DirectoryError::InvalidCredentials);
        }

        Ok(DirectoryEntry {
            dn: format!("uid={uid},{}", search.base_dn),
            attributes: search
                .attributes
                .iter()
                .map(|name| account.attributes.get(name).cloned())
                .collect(),
        })
    }
}
