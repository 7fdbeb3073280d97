// latex-proxy-client - api/client.rs
//
// The backend API client: single point of contact with the server.
//
// Every operation is a thin instantiation of `request`, which:
//   1. merges `Content-Type: application/json` and, when the session holds a
//      token, `Authorization: Bearer <token>` with caller headers (caller wins),
//   2. performs one exchange through the injected transport,
//   3. turns a non-success status into `ApiError::Request` with the best
//      available message,
//   4. returns `None` for 204 or an empty 200 instead of parsing nothing,
//   5. otherwise parses the body into the caller's type.
//
// No retries, no timeouts, no cancellation: each call is fire-once.

use crate::api::transport::{HttpRequest, HttpResponse, Transport};
use crate::app::session::Session;
use crate::core::model::{
    AuthResponse, LogPage, NewProfile, NewTab, Profile, ProfilePatch, Tab, TabPatch, User,
};
use crate::util::constants::GENERIC_API_ERROR;
use crate::util::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Per-call options for [`ApiClient::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Extra headers; these override the defaults on conflict.
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Response of `PUT /api/users/me/active-profile`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveProfileResponse {
    #[serde(default)]
    active_profile_id: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    login: &'a str,
    password: &'a str,
}

/// Client for the latex-proxy backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// `base_url` is prefixed verbatim to every path. The binary only passes
    /// validated absolute URLs (see `platform::config::normalise_base_url`).
    pub fn new(base_url: &str, session: Arc<Session>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            transport,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Generic request primitive.
    ///
    /// Returns `Ok(None)` for 204 and for 200 with an empty body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|source| {
                ApiError::InvalidHeader {
                    name: "authorization",
                    source,
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let body = options
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|source| ApiError::Encode {
                path: path.to_string(),
                source,
            })?;

        let request = HttpRequest {
            method: options.method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        };

        tracing::debug!(method = %request.method, path, "API request");
        let response = self.transport.send(request).await?;
        tracing::debug!(path, status = response.status, "API response");

        interpret_response(path, response)
    }

    /// `request` for operations whose success response must carry a body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(path, options)
            .await?
            .ok_or_else(|| ApiError::EmptyResponse {
                path: path.to_string(),
            })
    }

    /// `request` for operations whose response body is ignored.
    async fn execute(&self, path: &str, options: RequestOptions) -> Result<(), ApiError> {
        self.request::<serde_json::Value>(path, options).await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    pub async fn login(&self, login: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = encode("/api/auth/login", &Credentials { login, password })?;
        self.fetch("/api/auth/login", RequestOptions::new(Method::POST).with_body(body))
            .await
    }

    pub async fn register(&self, login: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = encode("/api/auth/register", &Credentials { login, password })?;
        self.fetch(
            "/api/auth/register",
            RequestOptions::new(Method::POST).with_body(body),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Current user
    // -------------------------------------------------------------------------

    pub async fn get_user(&self) -> Result<User, ApiError> {
        self.fetch("/api/users/me", RequestOptions::new(Method::GET))
            .await
    }

    pub async fn update_user_logging(&self, enabled: bool) -> Result<(), ApiError> {
        self.execute(
            "/api/users/me/logging",
            RequestOptions::new(Method::PUT).with_body(json!({ "enabled": enabled })),
        )
        .await
    }

    /// Returns the profile id echoed by the server, if any.
    pub async fn update_active_profile(&self, profile_id: &str) -> Result<Option<String>, ApiError> {
        let echoed: Option<ActiveProfileResponse> = self
            .request(
                "/api/users/me/active-profile",
                RequestOptions::new(Method::PUT).with_body(json!({ "profileId": profile_id })),
            )
            .await?;
        Ok(echoed.and_then(|r| r.active_profile_id))
    }

    pub async fn update_profile_order(&self, order: &[String]) -> Result<(), ApiError> {
        self.execute(
            "/api/users/me/profile-order",
            RequestOptions::new(Method::PUT).with_body(json!({ "order": order })),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Profiles
    // -------------------------------------------------------------------------

    pub async fn get_profiles(&self) -> Result<Vec<Profile>, ApiError> {
        self.fetch("/api/profiles", RequestOptions::new(Method::GET))
            .await
    }

    pub async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, ApiError> {
        let body = encode("/api/profiles", profile)?;
        self.fetch("/api/profiles", RequestOptions::new(Method::POST).with_body(body))
            .await
    }

    pub async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Profile, ApiError> {
        let path = format!("/api/profiles/{id}");
        let body = encode(&path, patch)?;
        self.fetch(&path, RequestOptions::new(Method::PUT).with_body(body))
            .await
    }

    pub async fn delete_profile(&self, id: &str) -> Result<(), ApiError> {
        self.execute(
            &format!("/api/profiles/{id}"),
            RequestOptions::new(Method::DELETE),
        )
        .await
    }

    pub async fn clone_profile(&self, id: &str) -> Result<Profile, ApiError> {
        self.fetch(
            &format!("/api/profiles/{id}/clone"),
            RequestOptions::new(Method::POST),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Tabs
    // -------------------------------------------------------------------------

    pub async fn create_tab(&self, profile_id: &str, tab: &NewTab) -> Result<Tab, ApiError> {
        let path = format!("/api/profiles/{profile_id}/tabs");
        let body = encode(&path, tab)?;
        self.fetch(&path, RequestOptions::new(Method::POST).with_body(body))
            .await
    }

    pub async fn update_tab(
        &self,
        profile_id: &str,
        tab_id: &str,
        patch: &TabPatch,
    ) -> Result<Tab, ApiError> {
        let path = format!("/api/profiles/{profile_id}/tabs/{tab_id}");
        let body = encode(&path, patch)?;
        self.fetch(&path, RequestOptions::new(Method::PUT).with_body(body))
            .await
    }

    pub async fn delete_tab(&self, profile_id: &str, tab_id: &str) -> Result<(), ApiError> {
        self.execute(
            &format!("/api/profiles/{profile_id}/tabs/{tab_id}"),
            RequestOptions::new(Method::DELETE),
        )
        .await
    }

    /// Send the complete reordered tab list. Returns the updated profile when
    /// the server echoes one.
    pub async fn move_tabs(&self, profile_id: &str, tabs: &[Tab]) -> Result<Option<Profile>, ApiError> {
        let path = format!("/api/profiles/{profile_id}/tabs/move");
        let body = encode(&path, &json!({ "tabs": tabs }))?;
        self.request(&path, RequestOptions::new(Method::PUT).with_body(body))
            .await
    }

    // -------------------------------------------------------------------------
    // Request logs
    // -------------------------------------------------------------------------

    pub async fn get_logs(&self, page: u32) -> Result<LogPage, ApiError> {
        self.fetch(
            &format!("/api/logs?page={page}"),
            RequestOptions::new(Method::GET),
        )
        .await
    }
}

fn encode<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|source| ApiError::Encode {
        path: path.to_string(),
        source,
    })
}

/// Map a completed exchange onto the client's result contract.
fn interpret_response<T: DeserializeOwned>(
    path: &str,
    response: HttpResponse,
) -> Result<Option<T>, ApiError> {
    if !(200..300).contains(&response.status) {
        let message = error_message(&response.body);
        tracing::debug!(path, status = response.status, message = %message, "API request failed");
        return Err(ApiError::Request {
            status: response.status,
            message,
        });
    }

    if response.status == 204 || (response.status == 200 && response.body.is_empty()) {
        return Ok(None);
    }

    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
}

/// Best available message for a failed response: the `msg` field of a JSON
/// body, else the raw text, else the generic fallback.
pub fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty());

    match from_json {
        Some(msg) => msg,
        None if !body.is_empty() => body.to_string(),
        None => GENERIC_API_ERROR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport that replays canned responses and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn with(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left"))
        }
    }

    fn client(transport: Arc<ScriptedTransport>) -> (ApiClient, Arc<Session>) {
        let session = Arc::new(Session::new(Arc::new(MemoryStorage::new())));
        (ApiClient::new("", session.clone(), transport), session)
    }

    const USER_JSON: &str = r#"{"id":"u1","login":"alice","apiKey":"k","loggingEnabled":false,"createdAt":"2025-01-01T00:00:00Z"}"#;

    fn header(request: &HttpRequest, name: &str) -> Option<String> {
        request
            .headers
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_204_returns_none_without_parsing() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(204, "")]);
        let (client, _) = client(transport);
        let result: Option<serde_json::Value> = client
            .request("/api/anything", RequestOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_empty_200_returns_none() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(200, "")]);
        let (client, _) = client(transport);
        let result: Option<User> = client
            .request("/api/users/me", RequestOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_error_message_from_msg_field() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(404, r#"{"msg":"not found"}"#)]);
        let (client, _) = client(transport);
        let err = client.get_profiles().await.unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_error_message_generic_fallback_for_empty_body() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(500, "")]);
        let (client, _) = client(transport);
        let err = client.get_user().await.unwrap_err();
        assert_eq!(err.message(), GENERIC_API_ERROR);
    }

    #[test]
    fn test_error_message_prefers_raw_text_when_not_json() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(r#"{"error":"x"}"#), r#"{"error":"x"}"#);
        assert_eq!(error_message(r#"{"msg":""}"#), r#"{"msg":""}"#);
        assert_eq!(error_message(""), GENERIC_API_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(200, "<html>")]);
        let (client, _) = client(transport);
        let err = client.get_user().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_empty_body_where_value_required_is_empty_response() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(204, "")]);
        let (client, _) = client(transport);
        let err = client.get_profiles().await.unwrap_err();
        assert!(matches!(err, ApiError::EmptyResponse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_headers_without_token() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(200, "[]")]);
        let (client, _) = client(transport.clone());
        client.get_profiles().await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].url, "/api/profiles");
        assert_eq!(header(&sent[0], "content-type").as_deref(), Some("application/json"));
        assert!(header(&sent[0], "authorization").is_none());
        assert!(sent[0].body.is_none());
    }

    #[tokio::test]
    async fn test_login_then_bearer_header_on_get_user() {
        let login_body = format!(r#"{{"token":"t1","user":{USER_JSON}}}"#);
        let transport = ScriptedTransport::with(vec![
            HttpResponse::new(200, login_body),
            HttpResponse::new(200, USER_JSON),
        ]);
        let (client, session) = client(transport.clone());

        let auth = client.login("alice", "pw").await.unwrap();
        assert_eq!(auth.token, "t1");
        assert_eq!(auth.user.login, "alice");
        session.set_token(Some(auth.token.as_str()));

        client.get_user().await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].url, "/api/auth/login");
        let body: serde_json::Value = serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"login": "alice", "password": "pw"}));
        assert_eq!(header(&sent[1], "authorization").as_deref(), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn test_caller_headers_override_defaults() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(204, "")]);
        let (client, session) = client(transport.clone());
        session.set_token(Some("t1"));

        let mut options = RequestOptions::new(Method::POST);
        options
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        options
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        client
            .request::<serde_json::Value>("/api/raw", options)
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(header(&sent[0], "content-type").as_deref(), Some("text/plain"));
        assert_eq!(header(&sent[0], "authorization").as_deref(), Some("Bearer other"));
        assert_eq!(sent[0].headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[tokio::test]
    async fn test_operation_paths_and_methods() {
        let transport = ScriptedTransport::with(vec![
            HttpResponse::new(204, ""),
            HttpResponse::new(204, ""),
            HttpResponse::new(200, r#"{"activeProfileId":"p2"}"#),
            HttpResponse::new(204, ""),
            HttpResponse::new(204, ""),
            HttpResponse::new(200, r#"{"logs":[],"page":3,"totalPages":3,"total":41}"#),
        ]);
        let (client, _) = client(transport.clone());

        client.delete_profile("p1").await.unwrap();
        client.delete_tab("p1", "t9").await.unwrap();
        let echoed = client.update_active_profile("p2").await.unwrap();
        client.update_profile_order(&["p2".to_string(), "p1".to_string()]).await.unwrap();
        client.update_user_logging(true).await.unwrap();
        let page = client.get_logs(3).await.unwrap();

        assert_eq!(echoed.as_deref(), Some("p2"));
        assert_eq!(page.total, 41);

        let sent: Vec<(Method, String)> = transport
            .requests()
            .into_iter()
            .map(|r| (r.method, r.url))
            .collect();
        assert_eq!(
            sent,
            vec![
                (Method::DELETE, "/api/profiles/p1".to_string()),
                (Method::DELETE, "/api/profiles/p1/tabs/t9".to_string()),
                (Method::PUT, "/api/users/me/active-profile".to_string()),
                (Method::PUT, "/api/users/me/profile-order".to_string()),
                (Method::PUT, "/api/users/me/logging".to_string()),
                (Method::GET, "/api/logs?page=3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_move_tabs_sends_full_list() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(204, "")]);
        let (client, _) = client(transport.clone());
        let tabs = vec![
            Tab {
                id: "b".to_string(),
                role: crate::core::model::TabRole::User,
                title: "B".to_string(),
                content: String::new(),
                enabled: true,
                pinned: None,
            },
            Tab {
                id: "a".to_string(),
                role: crate::core::model::TabRole::System,
                title: "A".to_string(),
                content: String::new(),
                enabled: false,
                pinned: Some(true),
            },
        ];
        let echoed = client.move_tabs("p1", &tabs).await.unwrap();
        assert!(echoed.is_none());

        let sent = transport.requests();
        assert_eq!(sent[0].url, "/api/profiles/p1/tabs/move");
        let body: serde_json::Value = serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        let ids: Vec<&str> = body["tabs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_base_url_is_prefixed_without_double_slash() {
        let transport = ScriptedTransport::with(vec![HttpResponse::new(200, "[]")]);
        let session = Arc::new(Session::new(Arc::new(MemoryStorage::new())));
        let client = ApiClient::new("https://proxy.example.com/", session, transport.clone());
        client.get_profiles().await.unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "https://proxy.example.com/api/profiles"
        );
    }
}
