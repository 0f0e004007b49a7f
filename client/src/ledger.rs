//! # Ledger Browser
//!
//! Read-only access to the ledger service for the ledger and analytics
//! views. Every call goes through [`SessionStore::bearer`] first, so an
//! expired token ends the session here just as it does for wallet calls.

use std::sync::Arc;

use uuid::Uuid;

use crate::api::ApiClient;
use crate::config::{DEFAULT_PAGE_SIZE, DEFAULT_RECENT_LIMIT};
use crate::error::Result;
use crate::session::SessionStore;
use crate::types::{AuditLog, FinancialSummary, LedgerEntry, LedgerSearch, Page};

pub struct LedgerBrowser {
    api: ApiClient,
    session: Arc<SessionStore>,
}

impl LedgerBrowser {
    pub fn new(api: ApiClient, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Zero-based `page` of the user's ledger. A `size` of 0 means the
    /// default page size.
    pub async fn transactions(&self, page: u32, size: u32) -> Result<Page<LedgerEntry>> {
        let token = self.session.bearer()?;
        let size = if size == 0 { DEFAULT_PAGE_SIZE } else { size };
        self.api
            .ledger()
            .get_user_transactions(&token, page, size)
            .await
    }

    pub async fn transaction(&self, id: Uuid) -> Result<LedgerEntry> {
        let token = self.session.bearer()?;
        self.api.ledger().get_transaction(&token, id).await
    }

    /// Most recent entries. A `limit` of 0 means the default.
    pub async fn recent(&self, limit: u32) -> Result<Vec<LedgerEntry>> {
        let token = self.session.bearer()?;
        let limit = if limit == 0 { DEFAULT_RECENT_LIMIT } else { limit };
        self.api
            .ledger()
            .get_recent_transactions(&token, limit)
            .await
    }

    /// Every recorded change to one entry, oldest first.
    pub async fn audit_trail(&self, transaction_id: Uuid) -> Result<Vec<AuditLog>> {
        let token = self.session.bearer()?;
        self.api
            .ledger()
            .get_audit_trail(&token, transaction_id)
            .await
    }

    pub async fn summary(&self) -> Result<FinancialSummary> {
        let token = self.session.bearer()?;
        self.api.ledger().get_financial_summary(&token).await
    }

    pub async fn search(&self, filter: &LedgerSearch) -> Result<Page<LedgerEntry>> {
        let token = self.session.bearer()?;
        let mut filter = filter.clone();
        if filter.size == 0 {
            filter.size = DEFAULT_PAGE_SIZE;
        }
        self.api
            .ledger()
            .search_transactions(&token, &filter)
            .await
    }
}
