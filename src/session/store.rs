use serde::{Deserialize, Serialize};

use crate::api::{endpoints, ApiClient, AuthToken};
use crate::errors::{PopoteError, PopoteResult};
use crate::session::persist::{SessionFile, SessionRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

/// Exactly one of these holds at any time; consumers gate rendering and
/// login redirects on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// In-memory session plus its persisted mirror.
///
/// Owns the user half of the state and shares the token cell with the
/// [`ApiClient`], so a token refreshed by the response interceptor is
/// immediately visible here and vice versa.
pub struct SessionStore {
    token: AuthToken,
    user: Option<User>,
    loading: bool,
    file: SessionFile,
}

impl SessionStore {
    pub fn new(token: AuthToken, file: SessionFile) -> Self {
        Self {
            token,
            user: None,
            loading: true,
            file,
        }
    }

    pub fn state(&self) -> AuthState {
        if self.loading {
            AuthState::Loading
        } else if self.token.is_set() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<String> {
        self.token.get()
    }

    /// Read the persisted session at startup. Absence or an unreadable
    /// record is not an error; it reads as logged out.
    pub fn hydrate(&mut self) {
        match self.file.load() {
            Some(record) if record.token.is_some() => {
                tracing::info!("session hydrated from disk");
                self.token.set(record.token);
                self.user = record.user;
            }
            _ => {
                tracing::debug!("no persisted session, starting logged out");
            }
        }
        self.loading = false;
    }

    /// Post credentials, take the token from the response `Authorization`
    /// header and the user from the body, then persist both.
    pub async fn sign_in(
        &mut self,
        api: &ApiClient,
        email: &str,
        password: &str,
    ) -> PopoteResult<()> {
        self.loading = true;
        let body = sign_in_body(email, password);

        match api
            .post_json::<_, serde_json::Value>(endpoints::SIGN_IN, &body)
            .await
        {
            Ok(response) => {
                // The response interceptor already captured the header token.
                let token = api.token().get();
                let user = user_from_body(&response);
                tracing::info!(email = email, "signed in");
                self.complete_sign_in(token, user);
                Ok(())
            }
            Err(err) => {
                self.token.set(None);
                self.user = None;
                self.loading = false;
                let message = match &err {
                    PopoteError::Auth(m) | PopoteError::Validation(m) => m.clone(),
                    PopoteError::Api { message, .. } => message.clone(),
                    _ => "unable to sign in".to_string(),
                };
                tracing::warn!(email = email, message = %message, "sign-in failed");
                Err(PopoteError::Auth(message))
            }
        }
    }

    /// Apply a successful sign-in and mirror it to disk. Persistence failure
    /// is logged, not surfaced; the in-memory session is already valid.
    pub fn complete_sign_in(&mut self, token: Option<String>, user: Option<User>) {
        self.token.set(token.clone());
        self.user = user.clone();
        self.loading = false;
        if let Err(err) = self.file.save(&SessionRecord { token, user }) {
            tracing::warn!(error = %err, "could not persist session");
        }
    }

    /// Best-effort server revocation, then unconditionally clear local state.
    pub async fn sign_out(&mut self, api: &ApiClient) {
        if let Err(err) = api.delete(endpoints::SIGN_OUT).await {
            tracing::debug!(error = %err, "sign-out endpoint failed, clearing locally anyway");
        }
        self.token.set(None);
        self.user = None;
        self.loading = false;
        if let Err(err) = self.file.clear() {
            tracing::warn!(error = %err, "could not clear persisted session");
        }
        tracing::info!("signed out");
    }
}

/// Devise inside a namespace maps the scope to `api_v1_user`; send both
/// wrapper keys to stay compatible across environments.
pub(crate) fn sign_in_body(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({
        "api_v1_user": {"email": email, "password": password},
        "user": {"email": email, "password": password},
    })
}

/// The login body carries the user under `data`.
pub(crate) fn user_from_body(body: &serde_json::Value) -> Option<User> {
    let data = body.get("data")?;
    serde_json::from_value(data.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> (SessionStore, AuthToken) {
        let token = AuthToken::new();
        let file = SessionFile::new(dir.path().join("session.json"));
        (SessionStore::new(token.clone(), file), token)
    }

    #[test]
    fn sign_in_body_carries_both_wrapper_keys() {
        let body = sign_in_body("a@b.com", "secret");
        assert_eq!(body["api_v1_user"]["email"], "a@b.com");
        assert_eq!(body["user"]["password"], "secret");
    }

    #[test]
    fn user_is_read_from_body_data() {
        let body = serde_json::json!({"data": {"id": 1, "email": "a@b.com"}});
        assert_eq!(
            user_from_body(&body),
            Some(User {
                id: 1,
                email: "a@b.com".into()
            })
        );
        assert_eq!(user_from_body(&serde_json::json!({})), None);
    }

    #[test]
    fn sign_in_scenario_updates_state_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, token) = store_in(&dir);
        assert_eq!(store.state(), AuthState::Loading);

        // Token captured from the `Authorization: token123` response header,
        // user from the body `{data: {id: 1, email: "a@b.com"}}`.
        let user = user_from_body(&serde_json::json!({"data": {"id": 1, "email": "a@b.com"}}));
        store.complete_sign_in(Some("token123".into()), user);

        assert_eq!(store.state(), AuthState::Authenticated);
        assert_eq!(token.get().as_deref(), Some("token123"));
        assert_eq!(store.user().map(|u| u.email.as_str()), Some("a@b.com"));

        // The persisted record rehydrates an identical session.
        let file = SessionFile::new(dir.path().join("session.json"));
        let record = file.load().unwrap();
        assert_eq!(record.token.as_deref(), Some("token123"));
        assert_eq!(record.user.map(|u| u.id), Some(1));
    }

    #[test]
    fn hydrate_without_record_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let (mut store, _token) = store_in(&dir);

        store.hydrate();
        assert_eq!(store.state(), AuthState::Unauthenticated);
        assert!(store.user().is_none());
    }

    #[test]
    fn hydrate_restores_persisted_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        file.save(&SessionRecord {
            token: Some("token123".into()),
            user: Some(User {
                id: 1,
                email: "a@b.com".into(),
            }),
        })
        .unwrap();

        let (mut store, token) = store_in(&dir);
        store.hydrate();
        assert_eq!(store.state(), AuthState::Authenticated);
        assert_eq!(token.get().as_deref(), Some("token123"));
    }
}
