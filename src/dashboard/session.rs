use axum::http::{HeaderMap, header};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "symptom_session";
const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const MAX_ENTRIES: usize = 20;
const MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionEntry {
    pub time: String,
    pub symptom: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Preferences {
    pub user_id: String,
    pub show_confidence: bool,
    pub auto_fetch_logs: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            show_confidence: true,
            auto_fetch_logs: false,
        }
    }
}

/// State of one browser session; dropped when the session ends.
pub struct Session {
    pub preferences: Preferences,
    entries: VecDeque<SessionEntry>,
    last_seen: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            preferences: Preferences::default(),
            entries: VecDeque::new(),
            last_seen: Instant::now(),
        }
    }

    pub fn record(&mut self, entry: SessionEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(MAX_ENTRIES);
    }

    /// Newest first.
    pub fn recent(&self, n: usize) -> Vec<SessionEntry> {
        self.entries.iter().take(n).cloned().collect()
    }

    pub fn latest(&self) -> Option<&SessionEntry> {
        self.entries.front()
    }
}

pub struct SessionManager {
    sessions: HashMap<String, Session>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self::with_limits(idle_timeout, MAX_SESSIONS)
    }

    /// At most `max_sessions` live at once; opening one more evicts the least recently seen.
    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Marks `id` as active, or opens a new session when it is unknown or expired.
    pub fn touch(&mut self, id: Option<&str>) -> String {
        self.prune();

        if let Some(id) = id
            && let Some(session) = self.sessions.get_mut(id)
        {
            session.last_seen = Instant::now();
            return id.to_string();
        }

        while self.sessions.len() >= self.max_sessions {
            self.evict_oldest();
        }

        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), Session::new());
        debug!("Opened dashboard session {}", id);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn end(&mut self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!("Ended dashboard session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|(_, session)| session.last_seen)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.sessions.remove(&id);
            debug!("Evicted dashboard session {}", id);
        }
    }

    fn prune(&mut self) {
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, session| session.last_seen.elapsed() < timeout);
    }
}

/// Reads the session id from the request's `Cookie` headers.
pub fn session_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn entry(n: usize) -> SessionEntry {
        SessionEntry {
            time: format!("t{}", n),
            symptom: format!("symptom {}", n),
            result: format!("result {}", n),
        }
    }

    #[test]
    fn touch_reuses_known_session() {
        let mut sessions = SessionManager::new();
        let id = sessions.touch(None);
        assert_eq!(sessions.touch(Some(&id)), id);
        assert_eq!(sessions.len(), 1);

        let other = sessions.touch(Some("not-a-session"));
        assert_ne!(other, id);
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let mut sessions = SessionManager::new();
        let id = sessions.touch(None);
        let session = sessions.get_mut(&id).unwrap();
        for n in 0..25 {
            session.record(entry(n));
        }

        assert_eq!(session.latest(), Some(&entry(24)));
        assert_eq!(session.recent(2), vec![entry(24), entry(23)]);
        assert_eq!(session.recent(100).len(), MAX_ENTRIES);
    }

    #[test]
    fn ended_sessions_lose_their_state() {
        let mut sessions = SessionManager::new();
        let id = sessions.touch(None);
        sessions.get_mut(&id).unwrap().record(entry(1));

        assert!(sessions.end(&id));
        assert!(!sessions.end(&id));
        let fresh = sessions.touch(Some(&id));
        assert_ne!(fresh, id);
        assert!(sessions.get(&fresh).unwrap().latest().is_none());
    }

    #[test]
    fn idle_sessions_expire() {
        let mut sessions = SessionManager::with_idle_timeout(Duration::ZERO);
        let id = sessions.touch(None);
        assert_ne!(sessions.touch(Some(&id)), id);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn session_count_is_capped() {
        let mut sessions = SessionManager::with_limits(IDLE_TIMEOUT, 3);
        for _ in 0..50 {
            sessions.touch(None);
        }
        assert_eq!(sessions.len(), 3);
    }

    #[test]
    fn recently_used_session_survives_eviction() {
        let mut sessions = SessionManager::with_limits(IDLE_TIMEOUT, 2);
        let kept = sessions.touch(None);
        std::thread::sleep(Duration::from_millis(2));
        let dropped = sessions.touch(None);
        std::thread::sleep(Duration::from_millis(2));
        sessions.touch(Some(&kept));
        std::thread::sleep(Duration::from_millis(2));

        sessions.touch(None);
        assert!(sessions.get(&kept).is_some());
        assert!(sessions.get(&dropped).is_none());
    }

    #[test]
    fn reads_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; symptom_session=abc-123; lang=en"),
        );
        assert_eq!(session_id_from(&headers).as_deref(), Some("abc-123"));
        assert_eq!(session_id_from(&HeaderMap::new()), None);
    }
}
