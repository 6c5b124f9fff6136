//! Auth provider client: password sign-in, sign-up, recovery, password update,
//! and sign-out against the backend auth service. Sessions are published on a
//! `watch` channel so UI layers can react to sign-in and sign-out without
//! polling. Passwords and tokens stay wrapped in `SecretString` and are never
//! logged.

use super::{BackendClient, Error};
use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

const TOKEN_PASSWORD_PATH: &str = "/auth/v1/token?grant_type=password";
const SIGNUP_PATH: &str = "/auth/v1/signup";
const RECOVER_PATH: &str = "/auth/v1/recover";
const USER_PATH: &str = "/auth/v1/user";
const LOGOUT_PATH: &str = "/auth/v1/logout";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session. Tokens are secrets; `Debug` redacts them.
#[derive(Clone, Debug)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_in: u64,
    pub user: AuthUser,
}

/// Sign-up either signs the user in right away or waits for email confirmation.
#[derive(Clone, Debug)]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationRequired(AuthUser),
}

#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
    #[error("Email ou senha incorretos")]
    InvalidCredentials,
    #[error("Confirme seu email antes de entrar")]
    EmailNotConfirmed,
    #[error("{0}")]
    Rejected(String),
    #[error("Falha de comunicação com o servidor: {0}")]
    Backend(#[from] Error),
}

/// Session-based authentication operations.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
        captcha_token: Option<&str>,
    ) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError>;

    async fn update_password(
        &self,
        access_token: &SecretString,
        password: &SecretString,
    ) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Session change notifications; the current value is the active session.
    fn sessions(&self) -> watch::Receiver<Option<Session>>;
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gotrue_meta_security: Option<CaptchaMeta<'a>>,
}

#[derive(Serialize)]
struct CaptchaMeta<'a> {
    captcha_token: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    full_name: &'a str,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct PasswordBody<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionWire {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: u64,
    user: AuthUser,
}

impl From<SessionWire> for Session {
    fn from(wire: SessionWire) -> Self {
        Self {
            access_token: SecretString::from(wire.access_token),
            refresh_token: SecretString::from(wire.refresh_token),
            expires_in: wire.expires_in,
            user: wire.user,
        }
    }
}

/// Error payloads differ between auth service versions.
#[derive(Default, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ProviderErrorBody {
    fn text(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }
}

/// Maps backend failures into auth outcomes the form can act on.
fn classify(err: Error) -> AuthError {
    let (status, message) = match err {
        Error::Http { status, message } => (status, message),
        other => return AuthError::Backend(other),
    };
    if !(400..500).contains(&status) {
        return AuthError::Backend(Error::Http { status, message });
    }

    let body: ProviderErrorBody = serde_json::from_str(&message).unwrap_or_default();
    let code = body.error_code.as_deref().or(body.error.as_deref());
    let text = body.text().unwrap_or(message.as_str());

    if code == Some("invalid_credentials") || text.contains("Invalid login credentials") {
        AuthError::InvalidCredentials
    } else if code == Some("email_not_confirmed") || text.contains("Email not confirmed") {
        AuthError::EmailNotConfirmed
    } else {
        AuthError::Rejected(text.to_string())
    }
}

/// Auth service reached over HTTP.
#[derive(Debug)]
pub struct HttpAuthProvider {
    client: BackendClient,
    sessions: watch::Sender<Option<Session>>,
}

impl HttpAuthProvider {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        let (sessions, _) = watch::channel(None);
        Self { client, sessions }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    #[instrument(skip_all, fields(captcha = captcha_token.is_some()))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
        captcha_token: Option<&str>,
    ) -> Result<Session, AuthError> {
        let body = PasswordGrant {
            email,
            password: password.expose_secret(),
            gotrue_meta_security: captcha_token.map(|captcha_token| CaptchaMeta { captcha_token }),
        };

        let wire: SessionWire = self
            .client
            .post_json(TOKEN_PASSWORD_PATH, &body)
            .await
            .map_err(classify)?;
        let session = Session::from(wire);

        info!(user_id = %session.user.id, "signed in");
        self.sessions.send_replace(Some(session.clone()));

        Ok(session)
    }

    #[instrument(skip_all)]
    async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        let body = SignUpBody {
            email,
            password: password.expose_secret(),
            data: SignUpData { full_name },
        };

        let value: Value = self
            .client
            .post_json(SIGNUP_PATH, &body)
            .await
            .map_err(classify)?;

        // With auto-confirm the service answers with a session, otherwise with the bare user.
        if value.get("access_token").is_some() {
            let wire: SessionWire = serde_json::from_value(value).map_err(|err| {
                Error::Parse(format!("Failed to decode sign-up session: {err}"))
            })?;
            let session = Session::from(wire);
            self.sessions.send_replace(Some(session.clone()));
            Ok(SignUpOutcome::SignedIn(session))
        } else {
            let user_value = value.get("user").cloned().unwrap_or(value);
            let user: AuthUser = serde_json::from_value(user_value)
                .map_err(|err| Error::Parse(format!("Failed to decode sign-up user: {err}")))?;
            debug!(user_id = %user.id, "sign-up awaiting confirmation");
            Ok(SignUpOutcome::ConfirmationRequired(user))
        }
    }

    #[instrument(skip_all)]
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        let path = match redirect_to {
            Some(redirect) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("redirect_to", redirect)
                    .finish();
                format!("{RECOVER_PATH}?{query}")
            }
            None => RECOVER_PATH.to_string(),
        };

        self.client
            .post_json_empty(&path, &EmailBody { email })
            .await
            .map_err(classify)
    }

    #[instrument(skip_all)]
    async fn update_password(
        &self,
        access_token: &SecretString,
        password: &SecretString,
    ) -> Result<(), AuthError> {
        let body = PasswordBody {
            password: password.expose_secret(),
        };

        self.client
            .send_empty(Method::PUT, USER_PATH, &body, Some(access_token))
            .await
            .map_err(classify)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .sessions
            .borrow()
            .as_ref()
            .map(|session| session.access_token.clone());

        if let Some(token) = token {
            self.client
                .send_empty(Method::POST, LOGOUT_PATH, &serde_json::json!({}), Some(&token))
                .await
                .map_err(classify)?;
        }

        self.sessions.send_replace(None);
        info!("signed out");

        Ok(())
    }

    fn sessions(&self) -> watch::Receiver<Option<Session>> {
        self.sessions.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::tests::{can_bind_localhost, client_for};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json() -> Value {
        json!({
            "access_token": "access-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": { "id": "u-1", "email": "ana@example.com" }
        })
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn classify_recognises_provider_errors() {
        let legacy = Error::Http {
            status: 400,
            message: r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
                .to_string(),
        };
        assert!(matches!(classify(legacy), AuthError::InvalidCredentials));

        let current = Error::Http {
            status: 400,
            message: r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#
                .to_string(),
        };
        assert!(matches!(classify(current), AuthError::EmailNotConfirmed));

        let other = Error::Http {
            status: 422,
            message: r#"{"msg":"Password should be at least 6 characters"}"#.to_string(),
        };
        match classify(other) {
            AuthError::Rejected(text) => {
                assert_eq!(text, "Password should be at least 6 characters");
            }
            unexpected => panic!("unexpected: {unexpected:?}"),
        }

        let server = Error::Http {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert!(matches!(classify(server), AuthError::Backend(_)));
        assert!(matches!(
            classify(Error::Timeout("slow".to_string())),
            AuthError::Backend(Error::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn sign_in_publishes_session_and_sends_captcha() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({
                "email": "ana@example.com",
                "password": "hunter22",
                "gotrue_meta_security": { "captcha_token": "cap-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        let mut sessions = provider.sessions();
        assert!(sessions.borrow().is_none());

        let session = provider
            .sign_in_with_password("ana@example.com", &secret("hunter22"), Some("cap-1"))
            .await
            .unwrap();
        assert_eq!(session.user.id, "u-1");
        assert_eq!(session.access_token.expose_secret(), "access-1");

        assert!(sessions.has_changed().unwrap());
        let current = sessions.borrow_and_update().clone().unwrap();
        assert_eq!(current.user.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn sign_in_maps_invalid_credentials() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        let err = provider
            .sign_in_with_password("ana@example.com", &secret("wrong-pass"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(provider.sessions().borrow().is_none());
    }

    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SIGNUP_PATH))
            .and(body_json(json!({
                "email": "bia@example.com",
                "password": "segredo1",
                "data": { "full_name": "Bia Souza" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u-2",
                "email": "bia@example.com",
                "confirmation_sent_at": "2026-10-19T10:00:00Z"
            })))
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        let outcome = provider
            .sign_up("Bia Souza", "bia@example.com", &secret("segredo1"))
            .await
            .unwrap();
        match outcome {
            SignUpOutcome::ConfirmationRequired(user) => assert_eq!(user.id, "u-2"),
            SignUpOutcome::SignedIn(_) => panic!("expected confirmation"),
        }
    }

    #[tokio::test]
    async fn sign_up_with_session_signs_in() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SIGNUP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        let outcome = provider
            .sign_up("Ana Lima", "ana@example.com", &secret("segredo1"))
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
        assert!(provider.sessions().borrow().is_some());
    }

    #[tokio::test]
    async fn recovery_passes_redirect() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(RECOVER_PATH))
            .and(query_param("redirect_to", "https://app.example.com/reset?x=1"))
            .and(body_json(json!({ "email": "ana@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        provider
            .reset_password_for_email("ana@example.com", Some("https://app.example.com/reset?x=1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_password_uses_user_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(USER_PATH))
            .and(header("authorization", "Bearer recovery-token"))
            .and(body_json(json!({ "password": "novasenha" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        provider
            .update_password(&secret("recovery-token"), &secret("novasenha"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sign_out_revokes_and_clears_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpAuthProvider::new(client_for(&server));
        provider
            .sign_in_with_password("ana@example.com", &secret("hunter22"), None)
            .await
            .unwrap();
        provider.sign_out().await.unwrap();
        assert!(provider.sessions().borrow().is_none());
    }
}
