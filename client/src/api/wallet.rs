//! Wallet service client: `/api/wallets`.
//!
//! Balance and history reads, wallet provisioning, and direct
//! credit/debit. Transfers between users go through the payment service,
//! not here.

use rust_decimal::Decimal;
use serde_json::Value;

use super::{field, message, ApiRequest, ServiceHandle};
use crate::error::{ClientError, Result};
use crate::types::{
    BalanceBody, TransactionRecord, UserId, WalletInfo, WalletSnapshot, WireTransaction,
};

/// Result of a credit or debit: the wallet after the change.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletMutation {
    pub wallet: WalletInfo,
    pub message: String,
}

#[derive(Clone)]
pub struct WalletClient {
    service: ServiceHandle,
}

impl WalletClient {
    pub(crate) fn new(service: ServiceHandle) -> Self {
        Self { service }
    }

    fn user_path(user_id: &UserId, suffix: &str) -> String {
        format!("/api/wallets/user/{user_id}{suffix}")
    }

    pub async fn get_balance(&self, token: &str, user_id: &UserId) -> Result<WalletSnapshot> {
        let request =
            ApiRequest::get(self.service.url(&Self::user_path(user_id, "/balance"))).bearer(token);
        let body = self.service.execute(request).await?;
        let balance: BalanceBody = serde_json::from_value(body)?;
        Ok(balance.into())
    }

    /// History rows, newest first, in the server's order.
    pub async fn get_transactions(
        &self,
        token: &str,
        user_id: &UserId,
    ) -> Result<Vec<TransactionRecord>> {
        let request = ApiRequest::get(self.service.url(&Self::user_path(user_id, "/transactions")))
            .bearer(token);
        let body = self.service.execute(request).await?;

        // A user with no history may come back without the key at all.
        if body.get("transactions").map_or(true, Value::is_null) {
            return Ok(Vec::new());
        }
        let rows: Vec<WireTransaction> = field(&body, "transactions")?;
        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    /// Provisions a wallet. Fails with an "already has an active wallet"
    /// service error if one exists; see [`ClientError::is_already_exists`].
    pub async fn create_wallet(&self, token: &str, user_id: &UserId) -> Result<WalletInfo> {
        let request = ApiRequest::post(
            self.service
                .url(&format!("/api/wallets/create-for-user/{user_id}")),
        )
        .bearer(token);
        let body = self.service.execute(request).await?;
        field(&body, "wallet")
    }

    pub async fn credit(
        &self,
        token: &str,
        user_id: &UserId,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<WalletMutation> {
        self.mutate(token, user_id, "/credit", amount, description).await
    }

    pub async fn debit(
        &self,
        token: &str,
        user_id: &UserId,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<WalletMutation> {
        self.mutate(token, user_id, "/debit", amount, description).await
    }

    async fn mutate(
        &self,
        token: &str,
        user_id: &UserId,
        op: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<WalletMutation> {
        let mut request = ApiRequest::post(self.service.url(&Self::user_path(user_id, op)))
            .bearer(token)
            .query("amount", amount);
        if let Some(d) = description {
            request = request.query("description", d);
        }
        let body = self.service.execute(request).await?;
        Ok(WalletMutation {
            wallet: field(&body, "wallet")?,
            message: message(&body).unwrap_or_default(),
        })
    }

    pub async fn wallet_exists(&self, token: &str, user_id: &UserId) -> Result<bool> {
        let request =
            ApiRequest::get(self.service.url(&Self::user_path(user_id, "/exists"))).bearer(token);
        let body = self.service.execute(request).await?;
        body.get("exists")
            .and_then(Value::as_bool)
            .ok_or_else(|| ClientError::Decode("missing field `exists`".to_string()))
    }
}
