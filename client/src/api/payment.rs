//! Payment service client: `/api/payments`.
//!
//! The service identifies the sender from the bearer token, so
//! [`PaymentClient::transfer`] carries no sender id.

use uuid::Uuid;

use super::{field, message, ApiRequest, ServiceHandle};
use crate::error::Result;
use crate::types::{Payment, PaymentStatusInfo, TransferRequest, UserId};

/// A processed transfer plus the service's confirmation text.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub message: String,
}

#[derive(Clone)]
pub struct PaymentClient {
    service: ServiceHandle,
}

impl PaymentClient {
    pub(crate) fn new(service: ServiceHandle) -> Self {
        Self { service }
    }

    pub async fn transfer(&self, token: &str, request: &TransferRequest) -> Result<PaymentReceipt> {
        let req = ApiRequest::post(self.service.url("/api/payments/transfer"))
            .bearer(token)
            .json(serde_json::to_value(request)?);
        let body = self.service.execute(req).await?;
        Ok(PaymentReceipt {
            payment: field(&body, "payment")?,
            message: message(&body).unwrap_or_else(|| "Payment processed successfully".to_string()),
        })
    }

    pub async fn get_payment(&self, token: &str, payment_id: Uuid) -> Result<Payment> {
        let req = ApiRequest::get(self.service.url(&format!("/api/payments/{payment_id}")))
            .bearer(token);
        let body = self.service.execute(req).await?;
        field(&body, "payment")
    }

    /// Public lookup by reference id. Needs no token.
    pub async fn get_payment_status(&self, reference_id: &str) -> Result<PaymentStatusInfo> {
        let req =
            ApiRequest::get(self.service.url(&format!("/api/payments/status/{reference_id}")));
        let body = self.service.execute(req).await?;
        field(&body, "status")
    }

    pub async fn get_user_payments(&self, token: &str, user_id: &UserId) -> Result<Vec<Payment>> {
        let req = ApiRequest::get(self.service.url(&format!("/api/payments/user/{user_id}")))
            .bearer(token);
        let body = self.service.execute(req).await?;
        field(&body, "payments")
    }

    /// Cancels a payment that has not completed yet.
    pub async fn cancel_payment(&self, token: &str, payment_id: Uuid) -> Result<Payment> {
        let req = ApiRequest::post(self.service.url(&format!("/api/payments/{payment_id}/cancel")))
            .bearer(token);
        let body = self.service.execute(req).await?;
        field(&body, "payment")
    }
}
