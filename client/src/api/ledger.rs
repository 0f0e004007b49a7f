//! Ledger service client: `/api/ledger`.
//!
//! Every endpoint answers `{success, message, data}`; the user is taken
//! from the token, never from the path.

use uuid::Uuid;

use super::{field, ApiRequest, ServiceHandle};
use crate::error::Result;
use crate::types::{AuditLog, FinancialSummary, LedgerEntry, LedgerSearch, Page};

#[derive(Clone)]
pub struct LedgerClient {
    service: ServiceHandle,
}

impl LedgerClient {
    pub(crate) fn new(service: ServiceHandle) -> Self {
        Self { service }
    }

    async fn data<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.service.execute(request).await?;
        field(&body, "data")
    }

    /// One page of the user's ledger, newest first. `page` is zero-based.
    pub async fn get_user_transactions(
        &self,
        token: &str,
        page: u32,
        size: u32,
    ) -> Result<Page<LedgerEntry>> {
        let req = ApiRequest::get(self.service.url("/api/ledger/transactions"))
            .bearer(token)
            .query("page", page)
            .query("size", size);
        self.data(req).await
    }

    pub async fn get_transaction(&self, token: &str, id: Uuid) -> Result<LedgerEntry> {
        let req = ApiRequest::get(self.service.url(&format!("/api/ledger/transactions/{id}")))
            .bearer(token);
        self.data(req).await
    }

    pub async fn get_recent_transactions(&self, token: &str, limit: u32) -> Result<Vec<LedgerEntry>> {
        let req = ApiRequest::get(self.service.url("/api/ledger/transactions/recent"))
            .bearer(token)
            .query("limit", limit);
        self.data(req).await
    }

    pub async fn get_audit_trail(&self, token: &str, transaction_id: Uuid) -> Result<Vec<AuditLog>> {
        let req = ApiRequest::get(
            self.service
                .url(&format!("/api/ledger/transactions/{transaction_id}/audit-trail")),
        )
        .bearer(token);
        self.data(req).await
    }

    pub async fn get_financial_summary(&self, token: &str) -> Result<FinancialSummary> {
        let req = ApiRequest::get(self.service.url("/api/ledger/reports/summary")).bearer(token);
        self.data(req).await
    }

    pub async fn search_transactions(
        &self,
        token: &str,
        search: &LedgerSearch,
    ) -> Result<Page<LedgerEntry>> {
        let mut req = ApiRequest::get(self.service.url("/api/ledger/search")).bearer(token);
        req.query.extend(search.query_pairs());
        self.data(req).await
    }
}
