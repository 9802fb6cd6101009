use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::ClientState;
use crate::{config::SESSION_IDLE_TIMEOUT, users::dto::PublicUser};

pub const SESSION_COOKIE: &str = "um_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
            FlashKind::Info => "info",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct SessionData {
    user: PublicUser,
    flashes: Vec<Flash>,
    last_seen: Instant,
}

/// Server-side sessions keyed by an opaque random id. The browser only ever
/// sees the id. Sessions idle for longer than `idle_timeout` are evicted.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Start a session for `user` and return its id. Expired sessions are
    /// purged on the way.
    pub fn create(&self, user: PublicUser) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.lock();
        let ttl = self.idle_timeout;
        sessions.retain(|_, s| s.last_seen.elapsed() < ttl);
        sessions.insert(
            id.clone(),
            SessionData {
                user,
                flashes: Vec::new(),
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// The session's user, touching its last-seen time. An idle session is
    /// removed and reported as absent.
    pub fn user(&self, id: &str) -> Option<PublicUser> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id)?;
        if session.last_seen.elapsed() >= self.idle_timeout {
            sessions.remove(id);
            debug!("session expired");
            return None;
        }
        session.last_seen = Instant::now();
        Some(session.user.clone())
    }

    /// Replace the cached user record, e.g. after the API returned a fresher copy.
    pub fn refresh_user(&self, id: &str, user: PublicUser) {
        if let Some(session) = self.sessions.lock().get_mut(id) {
            session.user = user;
        }
    }

    pub fn remove(&self, id: &str) -> Option<PublicUser> {
        self.sessions.lock().remove(id).map(|s| s.user)
    }

    pub fn flash(&self, id: &str, kind: FlashKind, message: impl Into<String>) {
        if let Some(session) = self.sessions.lock().get_mut(id) {
            session.flashes.push(Flash::new(kind, message));
        }
    }

    pub fn take_flashes(&self, id: &str) -> Vec<Flash> {
        self.sessions
            .lock()
            .get_mut(id)
            .map(|s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie handed to `CookieJar::remove`; path must match the one it was set with.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The logged-in user for this request. Rejects with a redirect to `/login`.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: String,
    pub user: PublicUser,
}

impl CurrentSession {
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

#[async_trait]
impl FromRequestParts<ClientState> for CurrentSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ClientState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let id = session_id(&jar).ok_or_else(|| Redirect::to("/login"))?;
        let user = state.sessions.user(&id).ok_or_else(|| {
            debug!("unknown or expired session");
            Redirect::to("/login")
        })?;
        Ok(CurrentSession { id, user })
    }
}
