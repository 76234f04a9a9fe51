//! Client for the external authentication service.
//!
//! Accounts live in a separate HTTP service. This client forwards signup, login, and password
//! reset requests and relays the service's own error messages.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while talking to the authentication service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was empty; the service was not contacted.
    #[error("All fields are required.")]
    MissingFields,
    /// The service answered with a failure status.
    #[error("{message}")]
    Rejected {
        /// Status returned by the service.
        status: u16,
        /// Message taken from the service's `error` field.
        message: String,
    },
    /// The service could not be reached.
    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),
}

/// New account details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    /// Desired username.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Credentials for signing in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Password reset request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Registered email address.
    pub email: String,
}

/// Account operations used by the HTTP layer.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Register a new account.
    async fn signup(&self, request: &SignupRequest) -> Result<(), AuthError>;
    /// Verify credentials, returning the signed-in username.
    async fn login(&self, request: &LoginRequest) -> Result<String, AuthError>;
    /// Ask the service to send a password reset link.
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<(), AuthError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the authentication service.
pub struct AuthClient {
    http: Client,
    base_url: String,
}

impl AuthClient {
    /// Construct a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let http = Client::builder()
            .user_agent("pdfgenius/auth")
            .build()
            .map_err(|error| AuthError::Unavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
        expected: StatusCode,
        fallback: &str,
    ) -> Result<(), AuthError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|error| {
                tracing::warn!(url = %url, error = %error, "Authentication service unreachable");
                AuthError::Unavailable(error.to_string())
            })?;

        let status = response.status();
        if status == expected {
            return Ok(());
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        tracing::debug!(path, status = status.as_u16(), "Authentication request rejected");
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn require(fields: &[&str]) -> Result<(), AuthError> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(AuthError::MissingFields);
    }
    Ok(())
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn signup(&self, request: &SignupRequest) -> Result<(), AuthError> {
        require(&[
            request.username.as_str(),
            request.email.as_str(),
            request.password.as_str(),
        ])?;
        self.post(
            "/signup",
            request,
            StatusCode::CREATED,
            "An error occurred during signup.",
        )
        .await
    }

    async fn login(&self, request: &LoginRequest) -> Result<String, AuthError> {
        require(&[request.username.as_str(), request.password.as_str()])?;
        self.post("/login", request, StatusCode::OK, "Invalid credentials.")
            .await?;
        Ok(request.username.clone())
    }

    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<(), AuthError> {
        require(&[request.email.as_str()])?;
        self.post(
            "/forgot_password",
            request,
            StatusCode::OK,
            "Failed to send reset link.",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_success_returns_username() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/login")
                    .json_body(json!({ "username": "alice", "password": "secret" }));
                then.status(200).json_body(json!({ "message": "ok" }));
            })
            .await;

        let client = AuthClient::new(server.base_url()).expect("client");
        let username = client.login(&login("alice", "secret")).await.expect("login");

        mock.assert();
        assert_eq!(username, "alice");
    }

    #[tokio::test]
    async fn rejection_relays_service_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/login");
                then.status(401).json_body(json!({ "error": "Wrong password" }));
            })
            .await;

        let client = AuthClient::new(server.base_url()).expect("client");
        let error = client.login(&login("alice", "nope")).await.unwrap_err();
        assert!(matches!(
            error,
            AuthError::Rejected { status: 401, ref message } if message == "Wrong password"
        ));
    }

    #[tokio::test]
    async fn rejection_without_body_uses_fallback() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/signup");
                then.status(409).body("conflict");
            })
            .await;

        let client = AuthClient::new(server.base_url()).expect("client");
        let error = client
            .signup(&SignupRequest {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "An error occurred during signup.");
    }

    #[tokio::test]
    async fn signup_expects_created() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/signup");
                then.status(201).json_body(json!({ "message": "registered" }));
            })
            .await;

        let client = AuthClient::new(server.base_url()).expect("client");
        client
            .signup(&SignupRequest {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password: "secret".into(),
            })
            .await
            .expect("signup");
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_without_calling_service() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let client = AuthClient::new(server.base_url()).expect("client");
        let error = client.login(&login("alice", "  ")).await.unwrap_err();
        assert!(matches!(error, AuthError::MissingFields));
        let error = client
            .forgot_password(&ForgotPasswordRequest { email: String::new() })
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "All fields are required.");
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn forgot_password_posts_email() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/forgot_password")
                    .json_body(json!({ "email": "alice@example.com" }));
                then.status(200).json_body(json!({ "message": "sent" }));
            })
            .await;

        let client = AuthClient::new(server.base_url()).expect("client");
        client
            .forgot_password(&ForgotPasswordRequest {
                email: "alice@example.com".into(),
            })
            .await
            .expect("reset");
        mock.assert();
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let client = AuthClient::new("http://127.0.0.1:9").expect("client");
        let error = client.login(&login("alice", "secret")).await.unwrap_err();
        assert!(matches!(error, AuthError::Unavailable(_)));
    }
}
