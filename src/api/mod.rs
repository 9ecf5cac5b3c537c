mod config;
mod error;
#[cfg(test)]
pub(crate) mod testing;
mod transport;

use crate::models::{AuthRequest, AuthResponse, Note, NoteBody};
use std::collections::BTreeMap;

pub use config::EnvConfig;
pub use error::{ApiError, ApiErrorKind};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError,
};

pub type ApiResult<T> = Result<T, ApiError>;

/// Per-call options for [`ApiClient::request`].
///
/// `query` is a map, so a repeated key keeps its last value.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions<'a> {
    pub method: Method,
    pub token: Option<&'a str>,
    pub body: Option<serde_json::Value>,
    pub query: Option<BTreeMap<String, String>>,
}

/// Single chokepoint for every call to the notes backend.
///
/// No retries and no timeouts here; callers decide what a failure means.
#[derive(Clone, Debug)]
pub struct ApiClient<T> {
    base_url: String,
    transport: T,
}

impl ApiClient<ReqwestTransport> {
    pub fn from_env() -> Self {
        let config = EnvConfig::new();
        if config.is_insecure_remote() {
            log::warn!(
                "API base URL {} uses plain http for a non-local host; hosted deployments need https",
                config.api_url
            );
        }
        log::info!("notes API base URL: {}", config.api_url);
        Self::new(config.api_url, ReqwestTransport::default())
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        Self {
            base_url: config::normalize_base_url(&base_url.into()),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[allow(dead_code)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn build_url(&self, path: &str, query: Option<&BTreeMap<String, String>>) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }

    fn with_auth_headers(headers: &mut Vec<(String, String)>, token: Option<&str>) {
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
    }

    pub async fn request(
        &self,
        path: &str,
        opts: RequestOptions<'_>,
    ) -> ApiResult<serde_json::Value> {
        let url = self.build_url(path, opts.query.as_ref());

        let mut headers = Vec::new();
        Self::with_auth_headers(&mut headers, opts.token);

        let body = match opts.body {
            Some(b) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(&b).map_err(ApiError::parse)?)
            }
            None => None,
        };

        log::debug!("{} {}", opts.method.as_str(), path);

        let res = self
            .transport
            .send(HttpRequest {
                method: opts.method,
                url,
                headers,
                body,
            })
            .await
            .map_err(|e| ApiError::network(&self.base_url, &e))?;

        if !(200..300).contains(&res.status) {
            log::debug!("{} {} -> {}", opts.method.as_str(), path, res.status);
            return Err(ApiError::from_status(res.status, res.body));
        }

        // Acks such as DELETE may come back with no body at all.
        if res.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&res.body).map_err(ApiError::parse)
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<String> {
        self.authenticate("/api/login", username, password).await
    }

    pub async fn signup(&self, username: &str, password: &str) -> ApiResult<String> {
        self.authenticate("/api/signup", username, password).await
    }

    async fn authenticate(&self, path: &str, username: &str, password: &str) -> ApiResult<String> {
        let body = serde_json::to_value(AuthRequest { username, password })
            .map_err(ApiError::parse)?;
        let data = self
            .request(
                path,
                RequestOptions {
                    method: Method::Post,
                    body: Some(body),
                    ..Default::default()
                },
            )
            .await?;

        let resp: AuthResponse = serde_json::from_value(data).map_err(ApiError::parse)?;
        resp.token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::parse("response is missing a token"))
    }

    /// An empty query lists every note of the session.
    pub async fn list_notes(&self, token: &str, query: &str) -> ApiResult<Vec<Note>> {
        let query = (!query.is_empty())
            .then(|| BTreeMap::from([("q".to_string(), query.to_string())]));
        let data = self
            .request(
                "/api/notes",
                RequestOptions {
                    token: Some(token),
                    query,
                    ..Default::default()
                },
            )
            .await?;
        Self::parse_note_list_response(data)
    }

    pub async fn create_note(&self, token: &str, title: &str, content: &str) -> ApiResult<Note> {
        let body = serde_json::to_value(NoteBody { title, content }).map_err(ApiError::parse)?;
        let data = self
            .request(
                "/api/notes",
                RequestOptions {
                    method: Method::Post,
                    token: Some(token),
                    body: Some(body),
                    ..Default::default()
                },
            )
            .await?;
        Self::parse_note_response(data)
    }

    /// Sends the base note back with the new title/content, so fields we
    /// don't model survive the round trip.
    pub async fn update_note(
        &self,
        token: &str,
        base: &Note,
        title: &str,
        content: &str,
    ) -> ApiResult<Note> {
        let mut next = base.clone();
        next.title = title.to_string();
        next.content = content.to_string();
        let body = serde_json::to_value(&next).map_err(ApiError::parse)?;

        let data = self
            .request(
                &note_path(&base.id),
                RequestOptions {
                    method: Method::Put,
                    token: Some(token),
                    body: Some(body),
                    ..Default::default()
                },
            )
            .await?;
        Self::parse_note_response(data)
    }

    pub async fn delete_note(&self, token: &str, id: &str) -> ApiResult<()> {
        self.request(
            &note_path(id),
            RequestOptions {
                method: Method::Delete,
                token: Some(token),
                ..Default::default()
            },
        )
        .await
        .map(|_| ())
    }

    fn parse_note_response(data: serde_json::Value) -> ApiResult<Note> {
        let note: Note = serde_json::from_value(data).map_err(ApiError::parse)?;
        if note.id.trim().is_empty() {
            return Err(ApiError::parse("note in response has no id"));
        }
        Ok(note)
    }

    /// Entries without an id are drafts as far as we're concerned and never
    /// enter the mirror list.
    pub(crate) fn parse_note_list_response(data: serde_json::Value) -> ApiResult<Vec<Note>> {
        let serde_json::Value::Array(list) = data else {
            return Err(ApiError::parse("expected a list of notes"));
        };

        let mut out: Vec<Note> = Vec::with_capacity(list.len());
        for item in list {
            match serde_json::from_value::<Note>(item) {
                Ok(note) if !note.id.trim().is_empty() => out.push(note),
                Ok(_) => log::warn!("dropping note without id from list response"),
                Err(e) => log::warn!("dropping malformed note from list response: {e}"),
            }
        }

        Ok(out)
    }
}

fn note_path(id: &str) -> String {
    format!("/api/notes/{}", urlencoding::encode(id))
}
