//! Purpose: In-memory transports for unit tests.
//! Exports: `ScriptedTransport`, `MemoryBoard`.
//! Role: Test-only stand-ins for the REST service; compiled under `cfg(test)`.
//! Invariants: Both record every request so tests can count network calls.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Value, json};

use super::gateway::{ApiResult, Method, OutboundRequest, RawResponse, Transport};
use crate::core::error::{Error, ErrorKind};

enum Scripted {
    Respond(RawResponse),
    NetworkFailure,
}

/// Replays canned responses in order; repeats the last one when exhausted.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptedState>>,
}

#[derive(Default)]
struct ScriptedState {
    queue: VecDeque<Scripted>,
    requests: Vec<OutboundRequest>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.lock().queue.push_back(Scripted::Respond(RawResponse {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail_network(self) -> Self {
        self.lock().queue.push_back(Scripted::NetworkFailure);
        self
    }

    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.lock().requests.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Transport for ScriptedTransport {
    fn exchange(&self, request: &OutboundRequest) -> ApiResult<RawResponse> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let next = if state.queue.len() > 1 {
            state.queue.pop_front()
        } else {
            state.queue.front().map(|scripted| match scripted {
                Scripted::Respond(raw) => Scripted::Respond(raw.clone()),
                Scripted::NetworkFailure => Scripted::NetworkFailure,
            })
        };
        match next {
            Some(Scripted::Respond(raw)) => Ok(raw),
            Some(Scripted::NetworkFailure) | None => {
                Err(Error::new(ErrorKind::Network).with_message("connection refused"))
            }
        }
    }
}

#[derive(Clone, Debug)]
struct User {
    id: i64,
    username: String,
    password: String,
    nickname: String,
    email: String,
}

#[derive(Clone, Debug)]
struct StoredPost {
    id: i64,
    user_id: i64,
    title: String,
    content: String,
}

#[derive(Clone, Debug)]
struct StoredComment {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
}

/// A tiny board service: one browser session, posts and comments newest first.
/// Comments page by `before` cursor only; a `page` parameter is ignored.
#[derive(Clone, Default)]
pub struct MemoryBoard {
    state: Arc<Mutex<BoardState>>,
}

#[derive(Default)]
struct BoardState {
    users: Vec<User>,
    posts: Vec<StoredPost>,
    comments: Vec<StoredComment>,
    session: Option<i64>,
    next_id: i64,
    requests: Vec<(Method, String)>,
    failures: Vec<(Method, String, u16, String)>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, password: &str) -> Self {
        {
            let mut state = self.lock();
            let id = state.allocate_id();
            state.users.push(User {
                id,
                username: username.to_string(),
                password: password.to_string(),
                nickname: username.to_string(),
                email: format!("{username}@board.test"),
            });
        }
        self
    }

    pub fn user_id(&self, username: &str) -> i64 {
        self.lock()
            .users
            .iter()
            .find(|user| user.username == username)
            .map(|user| user.id)
            .unwrap_or_default()
    }

    pub fn seed_posts(&self, count: usize, author: &str) -> Vec<i64> {
        let user_id = self.user_id(author);
        let mut state = self.lock();
        (0..count)
            .map(|idx| {
                let id = state.allocate_id();
                state.posts.push(StoredPost {
                    id,
                    user_id,
                    title: format!("post {idx}"),
                    content: format!("body {idx}"),
                });
                id
            })
            .collect()
    }

    pub fn seed_comment(&self, post_id: i64, author: &str, content: &str) -> i64 {
        let user_id = self.user_id(author);
        let mut state = self.lock();
        let id = state.allocate_id();
        state.comments.push(StoredComment {
            id,
            post_id,
            user_id,
            content: content.to_string(),
        });
        id
    }

    /// Server-side content of a comment, bypassing the client.
    pub fn comment_content(&self, id: i64) -> Option<String> {
        self.lock()
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .map(|comment| comment.content.clone())
    }

    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    /// Makes every later request whose path starts with `prefix` fail.
    pub fn fail(&self, method: Method, prefix: &str, status: u16, body: &str) {
        self.lock()
            .failures
            .push((method, prefix.to_string(), status, body.to_string()));
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl BoardState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn current_user(&self) -> Option<&User> {
        let id = self.session?;
        self.users.iter().find(|user| user.id == id)
    }
}

impl Transport for MemoryBoard {
    fn exchange(&self, request: &OutboundRequest) -> ApiResult<RawResponse> {
        let mut state = self.lock();
        let path = request.url.path().to_string();
        let full = match request.url.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.clone(),
        };
        state.requests.push((request.method, full));

        if let Some((_, _, status, body)) = state
            .failures
            .iter()
            .find(|(method, prefix, _, _)| *method == request.method && path.starts_with(prefix))
        {
            return Ok(RawResponse {
                status: *status,
                body: body.clone(),
            });
        }

        let query: Vec<(String, String)> = request.url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            query
                .iter()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| value.parse::<usize>().ok())
        };
        let body: Value = request
            .body
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or(Value::Null);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        let (status, payload) = match (request.method, segments.as_slice()) {
            (Method::Get, ["api", "me"]) => match state.current_user() {
                Some(user) => (200, json!({"data": user_json(user)})),
                None => (401, json!({"message": "login required"})),
            },
            (Method::Post, ["api", "login"]) => {
                let username = body["username"].as_str().unwrap_or_default();
                let password = body["password"].as_str().unwrap_or_default();
                let found = state
                    .users
                    .iter()
                    .find(|user| user.username == username && user.password == password)
                    .map(|user| user.id);
                match found {
                    Some(id) => {
                        state.session = Some(id);
                        (200, json!({"data": null, "message": "ok"}))
                    }
                    None => (401, json!({"message": "invalid credentials"})),
                }
            }
            (Method::Post, ["api", "logout"]) => {
                state.session = None;
                (200, json!({"data": null}))
            }
            (Method::Post, ["api", "users"]) => {
                let username = body["username"].as_str().unwrap_or_default().to_string();
                if username.is_empty() {
                    (400, json!({"message": "username is required"}))
                } else if state.users.iter().any(|user| user.username == username) {
                    (409, json!({"message": "username already taken"}))
                } else {
                    let id = state.allocate_id();
                    let user = User {
                        id,
                        username,
                        password: body["password"].as_str().unwrap_or_default().to_string(),
                        nickname: body["nickname"].as_str().unwrap_or_default().to_string(),
                        email: body["email"].as_str().unwrap_or_default().to_string(),
                    };
                    let data = user_json(&user);
                    state.users.push(user);
                    (200, json!({"data": data}))
                }
            }
            (Method::Get, ["api", "users"]) => {
                let limit = param("limit").unwrap_or(20);
                let users: Vec<Value> = state.users.iter().take(limit).map(user_json).collect();
                (200, json!({"data": users}))
            }
            (Method::Get, ["api", "posts"]) => {
                let page = param("page").unwrap_or(1).max(1);
                let limit = param("limit").unwrap_or(20);
                let mut posts = state.posts.clone();
                posts.sort_by(|a, b| b.id.cmp(&a.id));
                let data: Vec<Value> = posts
                    .iter()
                    .skip((page - 1) * limit)
                    .take(limit)
                    .map(post_json)
                    .collect();
                (200, json!({"data": data}))
            }
            (Method::Post, ["api", "posts"]) => match state.session {
                None => (401, json!({"message": "login required"})),
                Some(user_id) => {
                    let id = state.allocate_id();
                    let post = StoredPost {
                        id,
                        user_id,
                        title: body["title"].as_str().unwrap_or_default().to_string(),
                        content: body["content"].as_str().unwrap_or_default().to_string(),
                    };
                    let data = post_json(&post);
                    state.posts.push(post);
                    (200, json!({"data": data}))
                }
            },
            (method, ["api", "posts", id]) => {
                let id = id.parse::<i64>().unwrap_or_default();
                let session = state.session;
                match state.posts.iter().position(|post| post.id == id) {
                    None => (404, json!({"message": "post not found"})),
                    Some(idx) => match method {
                        Method::Get => (200, json!({"data": post_json(&state.posts[idx])})),
                        _ if session != Some(state.posts[idx].user_id) => {
                            (403, json!({"message": "not the author"}))
                        }
                        Method::Put => {
                            if let Some(title) = body["title"].as_str() {
                                state.posts[idx].title = title.to_string();
                            }
                            if let Some(content) = body["content"].as_str() {
                                state.posts[idx].content = content.to_string();
                            }
                            (200, json!({"data": post_json(&state.posts[idx])}))
                        }
                        Method::Delete => {
                            state.posts.remove(idx);
                            (200, json!({"data": null}))
                        }
                        Method::Post => (405, json!({"message": "method not allowed"})),
                    },
                }
            }
            (Method::Get, ["api", "posts", post_id, "comments"]) => {
                let post_id = post_id.parse::<i64>().unwrap_or_default();
                let before = query
                    .iter()
                    .find(|(key, _)| key == "before")
                    .and_then(|(_, value)| value.parse::<i64>().ok());
                let limit = param("limit").unwrap_or(20);
                let data: Vec<Value> = state
                    .comments
                    .iter()
                    .rev()
                    .filter(|comment| comment.post_id == post_id)
                    .filter(|comment| before.is_none_or(|before| comment.id < before))
                    .take(limit)
                    .map(comment_json)
                    .collect();
                (200, json!({"data": data}))
            }
            (Method::Post, ["api", "posts", post_id, "comments"]) => match state.session {
                None => (401, json!({"message": "login required"})),
                Some(user_id) => {
                    let id = state.allocate_id();
                    let comment = StoredComment {
                        id,
                        post_id: post_id.parse::<i64>().unwrap_or_default(),
                        user_id,
                        content: body["content"].as_str().unwrap_or_default().to_string(),
                    };
                    let data = comment_json(&comment);
                    state.comments.push(comment);
                    (200, json!({"data": data}))
                }
            },
            (method, ["api", "comments", id]) => {
                let id = id.parse::<i64>().unwrap_or_default();
                let session = state.session;
                match state.comments.iter().position(|comment| comment.id == id) {
                    None => (404, json!({"message": "comment not found"})),
                    Some(idx) if session != Some(state.comments[idx].user_id) => {
                        (403, json!({"message": "not the author"}))
                    }
                    Some(idx) => match method {
                        Method::Put => {
                            state.comments[idx].content =
                                body["content"].as_str().unwrap_or_default().to_string();
                            (200, json!({"data": comment_json(&state.comments[idx])}))
                        }
                        Method::Delete => {
                            state.comments.remove(idx);
                            (200, json!({"data": null}))
                        }
                        _ => (405, json!({"message": "method not allowed"})),
                    },
                }
            }
            _ => (404, json!({"message": "no route"})),
        };

        Ok(RawResponse {
            status,
            body: payload.to_string(),
        })
    }
}

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "nickname": user.nickname,
        "email": user.email,
    })
}

fn post_json(post: &StoredPost) -> Value {
    json!({
        "id": post.id,
        "userId": post.user_id,
        "title": post.title,
        "content": post.content,
    })
}

fn comment_json(comment: &StoredComment) -> Value {
    json!({
        "id": comment.id,
        "postId": comment.post_id,
        "userId": comment.user_id.to_string(),
        "content": comment.content,
    })
}
