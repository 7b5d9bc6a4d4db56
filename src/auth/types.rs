//! Request and response types for auth API calls. Requests carry passwords and
//! one-time codes, so their `Debug` output is redacted and they must never be
//! logged.

use crate::error::{Error, Result};
use crate::session::UserRecord;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const REDACTED: &str = "[REDACTED]";

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtpVerificationRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

impl fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ResetPasswordRequest")
            .field("email", &self.email)
            .field("otp", &REDACTED)
            .field("new_password", &REDACTED)
            .finish()
    }
}

/// Generic envelope returned by most auth endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiMessage {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Login payload. Token fields are optional on the wire so a malformed
/// response is reported as a validation error instead of a parse error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

impl LoginResponse {
    /// Extracts both tokens, failing if either is absent or empty.
    /// # Errors
    /// Returns `Error::Validation` naming the missing field.
    pub fn tokens(&self) -> Result<(SecretString, SecretString)> {
        let access = non_empty(self.access_token.as_deref())
            .ok_or_else(|| Error::Validation("login response is missing accessToken".into()))?;
        let refresh = non_empty(self.refresh_token.as_deref())
            .ok_or_else(|| Error::Validation("login response is missing refreshToken".into()))?;
        Ok((SecretString::from(access), SecretString::from(refresh)))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
