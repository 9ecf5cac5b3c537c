//! In-memory stand-in for the notes backend, used by unit tests across the
//! crate.

use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use crate::models::Note;
use async_trait::async_trait;
use futures::channel::oneshot;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Overrides the normal handling of the next request, in FIFO order.
pub(crate) enum Fault {
    /// Answer normally; lets a later fault line up with a later request.
    Pass,
    Unreachable,
    Respond(u16, String),
    /// Answer normally, but only once the paired [`Gate`] is released.
    Hold(oneshot::Receiver<()>),
}

pub(crate) struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, String>,
    tokens: HashMap<String, String>,
    notes: Vec<Note>,
    clock: u32,
    next_token: u32,
}

impl BackendState {
    fn tick(&mut self) -> String {
        self.clock += 1;
        format!("2024-01-01T00:{:02}:{:02}Z", self.clock / 60, self.clock % 60)
    }

    fn issue_token(&mut self, username: &str) -> String {
        self.next_token += 1;
        let token = format!("tok-{username}-{}", self.next_token);
        self.tokens.insert(token.clone(), username.to_string());
        token
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    state: RefCell<BackendState>,
    faults: RefCell<VecDeque<Fault>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.state
            .borrow_mut()
            .users
            .insert(username.to_string(), password.to_string());
    }

    /// Adds a user and hands back a valid token for them.
    pub fn register(&self, username: &str, password: &str) -> String {
        self.add_user(username, password);
        self.state.borrow_mut().issue_token(username)
    }

    /// Treats `token` as issued to `username`, e.g. after a simulated reload.
    pub fn accept_token(&self, token: &str, username: &str) {
        self.state
            .borrow_mut()
            .tokens
            .insert(token.to_string(), username.to_string());
    }

    pub fn seed_note(&self, title: &str, content: &str) -> Note {
        let mut state = self.state.borrow_mut();
        let updated_at = state.tick();
        let note = Note {
            id: format!("n{}", state.clock),
            title: title.to_string(),
            content: content.to_string(),
            updated_at: Some(updated_at),
            extra: serde_json::Map::new(),
        };
        state.notes.push(note.clone());
        note
    }

    pub fn notes(&self) -> Vec<Note> {
        self.state.borrow().notes.clone()
    }

    pub fn revoke_tokens(&self) {
        self.state.borrow_mut().tokens.clear();
    }

    pub fn push_fault(&self, fault: Fault) {
        self.faults.borrow_mut().push_back(fault);
    }

    pub fn hold_next(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.push_fault(Fault::Hold(rx));
        Gate(tx)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    fn handle(&self, req: &HttpRequest) -> HttpResponse {
        let Some(start) = req.url.find("/api/") else {
            return respond(404, "Not found".to_string());
        };
        let (path, query) = match req.url[start..].split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (req.url[start..].to_string(), None),
        };
        let body: serde_json::Value = req
            .body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
            .unwrap_or(serde_json::Value::Null);
        let field = |k: &str| body.get(k).and_then(|v| v.as_str()).unwrap_or_default().to_string();

        let mut state = self.state.borrow_mut();

        match (req.method, path.as_str()) {
            (Method::Post, "/api/login") => {
                let username = field("username");
                if state.users.get(&username) == Some(&field("password")) {
                    let token = state.issue_token(&username);
                    json(200, serde_json::json!({ "token": token }))
                } else {
                    respond(401, "Invalid credentials".to_string())
                }
            }
            (Method::Post, "/api/signup") => {
                let username = field("username");
                if state.users.contains_key(&username) {
                    return respond(409, "Username already taken".to_string());
                }
                state.users.insert(username.clone(), field("password"));
                let token = state.issue_token(&username);
                json(200, serde_json::json!({ "token": token }))
            }
            _ => {
                let authorized = req
                    .header("Authorization")
                    .and_then(|h| h.strip_prefix("Bearer "))
                    .is_some_and(|t| state.tokens.contains_key(t));
                if !authorized {
                    return respond(401, "Unauthorized".to_string());
                }

                let note_id = path.strip_prefix("/api/notes/").map(|id| {
                    urlencoding::decode(id)
                        .map(|s| s.into_owned())
                        .unwrap_or_default()
                });

                match (req.method, note_id) {
                    (Method::Get, None) if path == "/api/notes" => {
                        let q = query
                            .as_deref()
                            .and_then(|q| q.split('&').find_map(|kv| kv.strip_prefix("q=")))
                            .and_then(|v| urlencoding::decode(v).ok())
                            .map(|s| s.to_lowercase())
                            .unwrap_or_default();
                        let hits: Vec<&Note> = state
                            .notes
                            .iter()
                            .filter(|n| {
                                q.is_empty()
                                    || n.title.to_lowercase().contains(&q)
                                    || n.content.to_lowercase().contains(&q)
                            })
                            .collect();
                        json(200, serde_json::json!(hits))
                    }
                    (Method::Post, None) if path == "/api/notes" => {
                        let updated_at = state.tick();
                        let note = Note {
                            id: format!("n{}", state.clock),
                            title: field("title"),
                            content: field("content"),
                            updated_at: Some(updated_at),
                            extra: serde_json::Map::new(),
                        };
                        state.notes.push(note.clone());
                        json(201, serde_json::json!(note))
                    }
                    (Method::Put, Some(id)) => {
                        let updated_at = state.tick();
                        let Some(note) = state.notes.iter_mut().find(|n| n.id == id) else {
                            return respond(404, "Note not found".to_string());
                        };
                        note.title = field("title");
                        note.content = field("content");
                        note.updated_at = Some(updated_at);
                        json(200, serde_json::json!(note))
                    }
                    (Method::Delete, Some(id)) => {
                        let before = state.notes.len();
                        state.notes.retain(|n| n.id != id);
                        if state.notes.len() == before {
                            respond(404, "Note not found".to_string())
                        } else {
                            respond(200, String::new())
                        }
                    }
                    _ => respond(404, "Not found".to_string()),
                }
            }
        }
    }
}

fn respond(status: u16, body: String) -> HttpResponse {
    HttpResponse { status, body }
}

fn json(status: u16, value: serde_json::Value) -> HttpResponse {
    respond(status, value.to_string())
}

#[async_trait(?Send)]
impl HttpTransport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());

        let fault = self.faults.borrow_mut().pop_front();
        match fault {
            Some(Fault::Pass) | None => Ok(self.handle(&request)),
            Some(Fault::Unreachable) => Err(TransportError("connection refused".to_string())),
            Some(Fault::Respond(status, body)) => Ok(respond(status, body)),
            Some(Fault::Hold(gate)) => {
                let res = self.handle(&request);
                let _ = gate.await;
                Ok(res)
            }
        }
    }
}
