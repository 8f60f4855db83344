//! Firebase Auth + Firestore REST client.
//!
//! Documents live at
//! `{firestore_url}/v1/projects/{project}/databases/(default)/documents/{collection}/{user_id}`.
//! Every request carries the web API key as `?key=`; requests made on behalf
//! of a user also carry their ID token as a bearer token.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::document_codec::{
    decode_run_query, decode_user_document, encode_new_user, encode_push_fields, integer_value,
    leaderboard_query, PUSH_FIELD_PATHS,
};
use super::gateway::RemoteGateway;
use super::types::{
    Credentials, LeaderboardSnapshot, PushOutcome, RemoteUserRecord, StatePush, SyncError,
    UserIdentity,
};
use crate::storage::SyncConfig;

pub struct FirestoreGateway {
    http: reqwest::Client,
    config: SyncConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

impl FirestoreGateway {
    /// Build a client for `config`. The config must pass [`SyncConfig::validate`].
    pub fn new(config: SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Offline(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    // ── URLs ─────────────────────────────────────────────────────────

    fn with_key(&self, mut url: Url) -> Url {
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        url
    }

    fn documents_base(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents",
            self.config.firestore_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    fn document_url(&self, user_id: &str) -> Result<Url, SyncError> {
        let url = Url::parse(&format!(
            "{}/{}/{}",
            self.documents_base(),
            self.config.collection,
            urlencoding::encode(user_id)
        ))?;
        Ok(self.with_key(url))
    }

    fn run_query_url(&self) -> Result<Url, SyncError> {
        let url = Url::parse(&format!("{}:runQuery", self.documents_base()))?;
        Ok(self.with_key(url))
    }

    fn accounts_url(&self, method: &str) -> Result<Url, SyncError> {
        let url = Url::parse(&format!(
            "{}/v1/accounts:{method}",
            self.config.auth_url.trim_end_matches('/')
        ))?;
        Ok(self.with_key(url))
    }

    fn token_url(&self) -> Result<Url, SyncError> {
        let url = Url::parse(&format!(
            "{}/v1/token",
            self.config.token_url.trim_end_matches('/')
        ))?;
        Ok(self.with_key(url))
    }

    // ── Requests ─────────────────────────────────────────────────────

    fn authorized(builder: RequestBuilder, identity: Option<&UserIdentity>) -> RequestBuilder {
        match identity {
            Some(identity) => builder.bearer_auth(&identity.id_token),
            None => builder,
        }
    }

    /// Turn a non-success response into [`SyncError::Backend`], pulling the
    /// message out of the Google error envelope when there is one.
    async fn check(response: Response) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Backend {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or(body),
        })
    }

    async fn sign_in_request(&self, method: &str, body: Value) -> Result<UserIdentity, SyncError> {
        let response = self
            .http
            .post(self.accounts_url(method)?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| "sign-in rejected".into());
            return Err(SyncError::Authentication(message));
        }

        let parsed: SignInResponse = response.json().await?;
        Ok(UserIdentity {
            user_id: parsed.local_id,
            display_name: parsed.display_name.filter(|n| !n.is_empty()),
            email: parsed.email.filter(|e| !e.is_empty()),
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at: Utc::now() + expires_in(&parsed.expires_in),
        })
    }

    async fn query_all(
        &self,
        identity: Option<&UserIdentity>,
    ) -> Result<Vec<RemoteUserRecord>, SyncError> {
        let request = self
            .http
            .post(self.run_query_url()?)
            .json(&leaderboard_query(&self.config.collection));
        let response = Self::check(Self::authorized(request, identity).send().await?).await?;
        let body: Value = response.json().await?;
        decode_run_query(&body)
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

fn expires_in(raw: &str) -> Duration {
    Duration::seconds(raw.trim().parse::<i64>().unwrap_or(3600))
}

#[async_trait]
impl RemoteGateway for FirestoreGateway {
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserIdentity, SyncError> {
        match credentials {
            Credentials::EmailPassword { email, password } => {
                self.sign_in_request(
                    "signInWithPassword",
                    json!({ "email": email, "password": password, "returnSecureToken": true }),
                )
                .await
            }
            Credentials::Anonymous { display_name } => {
                let mut identity = self
                    .sign_in_request("signUp", json!({ "returnSecureToken": true }))
                    .await?;
                identity.display_name = Some(display_name.clone());
                Ok(identity)
            }
        }
    }

    async fn refresh(&self, identity: &UserIdentity) -> Result<UserIdentity, SyncError> {
        let response = self
            .http
            .post(self.token_url()?)
            .json(&json!({
                "grant_type": "refresh_token",
                "refresh_token": identity.refresh_token,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| "token refresh rejected".into());
            return Err(SyncError::Authentication(message));
        }
        let parsed: RefreshResponse = response.json().await?;
        if parsed.user_id != identity.user_id {
            return Err(SyncError::Authentication(
                "refreshed token belongs to another user".into(),
            ));
        }
        Ok(UserIdentity {
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at: Utc::now() + expires_in(&parsed.expires_in),
            ..identity.clone()
        })
    }

    async fn sign_out(&self, identity: &UserIdentity) -> Result<(), SyncError> {
        // ID tokens are stateless; forgetting them locally is the sign-out.
        tracing::debug!(user_id = %identity.user_id, "signing out");
        Ok(())
    }

    async fn push_state(
        &self,
        identity: &UserIdentity,
        push: &StatePush,
    ) -> Result<PushOutcome, SyncError> {
        let mut url = self.document_url(&identity.user_id)?;
        {
            let mut query = url.query_pairs_mut();
            for path in PUSH_FIELD_PATHS {
                query.append_pair("updateMask.fieldPaths", path);
            }
        }
        let body = encode_push_fields(push, Utc::now());
        let sent = Self::authorized(self.http.patch(url).json(&body), Some(identity))
            .send()
            .await;
        match sent {
            Ok(response) => {
                Self::check(response).await?;
                Ok(PushOutcome::Synced)
            }
            Err(e) => match SyncError::from(e) {
                SyncError::Offline(reason) => {
                    tracing::info!(%reason, "push skipped, backend unreachable");
                    Ok(PushOutcome::Offline)
                }
                other => Err(other),
            },
        }
    }

    async fn pull_state(
        &self,
        identity: &UserIdentity,
    ) -> Result<Option<RemoteUserRecord>, SyncError> {
        let request = self.http.get(self.document_url(&identity.user_id)?);
        let response = Self::authorized(request, Some(identity)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = Self::check(response).await?.json().await?;
        decode_user_document(&body).map(Some)
    }

    async fn create_user(&self, identity: &UserIdentity, push: &StatePush) -> Result<(), SyncError> {
        let mut url = self.document_url(&identity.user_id)?;
        url.query_pairs_mut()
            .append_pair("currentDocument.exists", "false");
        let body = encode_new_user(identity, push, Utc::now());
        let response = Self::authorized(self.http.patch(url).json(&body), Some(identity))
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            tracing::debug!(user_id = %identity.user_id, "user document already exists");
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_leaderboard(
        &self,
        identity: Option<&UserIdentity>,
    ) -> Result<LeaderboardSnapshot, SyncError> {
        let users = self.query_all(identity).await?;
        Ok(LeaderboardSnapshot::from_users(users, Utc::now()))
    }

    async fn reset_daily_counts(&self, identity: &UserIdentity) -> Result<usize, SyncError> {
        let users = self.query_all(Some(identity)).await?;
        let mut reset = 0;
        for user in &users {
            let mut url = self.document_url(&user.user_id)?;
            url.query_pairs_mut()
                .append_pair("updateMask.fieldPaths", "todayJapa");
            let body = json!({ "fields": { "todayJapa": integer_value(0) } });
            let response = Self::authorized(self.http.patch(url).json(&body), Some(identity))
                .send()
                .await?;
            Self::check(response).await?;
            reset += 1;
        }
        tracing::info!(reset, "daily counts reset");
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig {
            enabled: true,
            project_id: "radha-counter".into(),
            api_key: "k3y".into(),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_incomplete_config() {
        assert!(FirestoreGateway::new(SyncConfig::default()).is_err());
    }

    #[test]
    fn document_url_encodes_user_id() {
        let gateway = FirestoreGateway::new(config()).unwrap();
        let url = gateway.document_url("Shyam Das").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/radha-counter/databases/(default)/documents/users/Shyam%20Das?key=k3y"
        );
    }

    #[test]
    fn accounts_url_carries_key() {
        let gateway = FirestoreGateway::new(config()).unwrap();
        let url = gateway.accounts_url("signUp").unwrap();
        assert_eq!(url.path(), "/v1/accounts:signUp");
        assert_eq!(url.query(), Some("key=k3y"));
    }

    #[test]
    fn google_error_envelope_is_unwrapped() {
        let body = r#"{"error":{"code":400,"message":"INVALID_PASSWORD"}}"#;
        assert_eq!(error_message(body).as_deref(), Some("INVALID_PASSWORD"));
        assert_eq!(error_message("plain"), None);
    }
}
