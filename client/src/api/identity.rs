//! User service client: `/api/users`.

use serde_json::json;

use super::{field, message, ApiRequest, ServiceHandle};
use crate::error::Result;
use crate::types::{LoginData, RegistrationProfile, UserId, UserProfile};

/// What `POST /api/users/register` returns.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterResponse {
    pub user: UserProfile,
    pub message: String,
}

#[derive(Clone)]
pub struct IdentityClient {
    service: ServiceHandle,
}

impl IdentityClient {
    pub(crate) fn new(service: ServiceHandle) -> Self {
        Self { service }
    }

    /// Exchanges credentials for a token and the user's identity.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginData> {
        let request = ApiRequest::post(self.service.url("/api/users/login"))
            .json(json!({ "email": email, "password": password }));
        let body = self.service.execute(request).await?;
        field(&body, "data")
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, profile: &RegistrationProfile) -> Result<RegisterResponse> {
        let request = ApiRequest::post(self.service.url("/api/users/register"))
            .json(serde_json::to_value(profile)?);
        let body = self.service.execute(request).await?;
        Ok(RegisterResponse {
            user: field(&body, "user")?,
            message: message(&body).unwrap_or_else(|| "User registered successfully".to_string()),
        })
    }

    pub async fn get_profile(&self, token: &str, user_id: &UserId) -> Result<UserProfile> {
        let request = ApiRequest::get(self.service.url(&format!("/api/users/profile/{user_id}")))
            .bearer(token);
        let body = self.service.execute(request).await?;
        field(&body, "user")
    }
}
