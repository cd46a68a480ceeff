use crate::prefs::UserId;
use dashmap::DashMap;
use rand::Rng;

const NONCE_LEN: usize = 24;
const NONCE_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn generate_nonce() -> String {
    let mut rng = rand::rng();
    (0..NONCE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..NONCE_CHARS.len());
            NONCE_CHARS.as_bytes()[idx] as char
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserId,
    pub can_edit: bool,
}

/// Anti-forgery tokens for the AJAX-style endpoints. Real authentication is
/// an external concern; this only maps issued nonces back to a user and an
/// edit capability.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<String, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            sessions: DashMap::new(),
        }
    }

    pub fn issue(&self, user: UserId, can_edit: bool) -> String {
        let nonce = generate_nonce();
        self.sessions
            .insert(nonce.clone(), Session { user, can_edit });
        nonce
    }

    /// Returns the session iff the nonce is known and its user holds the
    /// edit capability. A known nonce without the capability is rejected the
    /// same way as an unknown one: forbidden, never "no results".
    pub fn verify_editor(&self, nonce: &str) -> Option<Session> {
        self.sessions
            .get(nonce)
            .filter(|session| session.can_edit)
            .map(|session| session.value().clone())
    }
}
