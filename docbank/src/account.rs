//! The bank account record.

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use docbank_core::{
    document::Record,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Identifier the lookup in `run` searches for unless told otherwise.
pub const SAMPLE_ACCOUNT_ID: &str = "64280b07e1bf6b49034e2b51";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<ObjectId>,
    pub account_holder: String,
    pub account_id: String,
    pub account_type: AccountType,
    /// Balance in the smallest currency unit. May be negative.
    pub balance: i64,
    pub last_updated: DateTime,
}

impl Account {
    pub fn new(
        account_holder: impl Into<String>,
        account_id: impl Into<String>,
        account_type: AccountType,
        balance: i64,
    ) -> Self {
        Self {
            id: None,
            account_holder: account_holder.into(),
            account_id: account_id.into(),
            account_type,
            balance,
            last_updated: DateTime::from_chrono(chrono::Utc::now()),
        }
    }

    /// The account the tour inserts and then works on.
    pub fn sample() -> Self {
        Account::new("Linus Torvalds", "MDB829001337", AccountType::Checking, 50352434)
    }
}

impl Record for Account {
    fn collection_name() -> &'static str {
        "accounts"
    }

    fn validate(&self) -> DocumentStoreResult<()> {
        if self.account_holder.trim().is_empty() {
            return Err(DocumentStoreError::InvalidDocument("account_holder must not be empty".into()));
        }
        if self.account_id.trim().is_empty() {
            return Err(DocumentStoreError::InvalidDocument("account_id must not be empty".into()));
        }

        Ok(())
    }
}
