use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchedAccount {
    pub username: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WatchListFile {
    #[serde(default)]
    accounts: Vec<WatchedAccount>,
}

/// The operator-configured set of monitored accounts. Read-only during a run.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    accounts: Vec<WatchedAccount>,
    by_handle: HashMap<String, usize>,
}

impl WatchList {
    pub fn new(accounts: Vec<WatchedAccount>) -> Self {
        let by_handle = accounts
            .iter()
            .enumerate()
            .map(|(idx, account)| (normalize_handle(&account.username), idx))
            .collect();
        Self { accounts, by_handle }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: WatchListFile = serde_json::from_str(content)?;
        Ok(Self::new(file.accounts))
    }

    /// A missing or unreadable watch-list is treated as empty.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Watch-list {} not readable ({}), using an empty one", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_json(&content) {
            Ok(list) => {
                info!("Loaded {} watched accounts from {}", list.len(), path.display());
                list
            }
            Err(e) => {
                warn!("Watch-list {} is malformed ({}), using an empty one", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.by_handle.contains_key(&normalize_handle(handle))
    }

    pub fn get(&self, handle: &str) -> Option<&WatchedAccount> {
        self.by_handle
            .get(&normalize_handle(handle))
            .map(|&idx| &self.accounts[idx])
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}
