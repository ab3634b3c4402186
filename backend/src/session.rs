use std::fmt;
use std::path::{Path, PathBuf};

use crate::ids::random_base36;
use crate::model::StreamerProfile;

/// Fixed key the last created/loaded profile is stored under.
pub const PROFILE_KEY: &str = "sb_profile_v2";

/// Header that carries a client's session id, issued on profile creation.
pub const SESSION_HEADER: &str = "x-streambags-session";

const SESSION_ID_LEN: usize = 24;

/// Opaque per-client id. Only lowercase ASCII alphanumerics, so it is safe
/// to use as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(random_base36(&mut rand::thread_rng(), SESSION_ID_LEN))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let valid = (8..=64).contains(&raw.len())
            && raw
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Small on-disk cache so a reload keeps the streamer's own profile, one
/// entry per client session. Failures are logged and treated as an empty cache.
#[derive(Debug, Clone)]
pub struct SessionCache {
    dir: PathBuf,
}

impl SessionCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, session: &SessionId) -> PathBuf {
        self.dir
            .join(session.as_str())
            .join(format!("{PROFILE_KEY}.json"))
    }

    pub async fn save(&self, session: &SessionId, profile: &StreamerProfile) {
        let bytes = match serde_json::to_vec(profile) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize session profile");
                return;
            }
        };
        let path = self.path(session);
        if let Some(dir) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                tracing::warn!(error = %e, dir = %dir.display(), "could not create session dir");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!(error = %e, path = %path.display(), "could not write session profile");
        }
    }

    pub async fn load(&self, session: &SessionId) -> Option<StreamerProfile> {
        let path = self.path(session);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "could not read session profile");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, session = %session, "discarding corrupt session profile");
                None
            }
        }
    }

    pub async fn clear(&self, session: &SessionId) {
        match tokio::fs::remove_file(self.path(session)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, session = %session, "could not clear session profile"),
        }
    }
}
