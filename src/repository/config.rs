use std::env;

use email_address::EmailAddress;
use tracing::warn;

pub const GIT_DIR_NAME: &str = ".git";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUser {
    pub name: String,
    pub email: String,
}

impl ConfigUser {
    fn from_env(name_key: &str, email_key: &str) -> Option<Self> {
        let name = env::var_os(name_key)?.to_string_lossy().to_string();
        let email = env_or_default(email_key);
        Some(Self::new(name, email))
    }

    pub fn new(name: String, email: String) -> Self {
        if !email.is_empty() && !EmailAddress::is_valid(&email) {
            warn!(%email, "identity email does not look like an address");
        }
        Self { name, email }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub author: ConfigUser,
    pub committer: ConfigUser,
}

fn env_or_default(key: &str) -> String {
    env::var_os(key)
        .map(|var| var.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl Config {
    /// Reads `GIT_AUTHOR_*` and `GIT_COMMITTER_*`; the committer falls back
    /// to the author when unset.
    pub fn from_env() -> Self {
        let author = ConfigUser::from_env("GIT_AUTHOR_NAME", "GIT_AUTHOR_EMAIL")
            .unwrap_or_else(|| ConfigUser::new(String::new(), env_or_default("GIT_AUTHOR_EMAIL")));
        let committer = ConfigUser::from_env("GIT_COMMITTER_NAME", "GIT_COMMITTER_EMAIL")
            .unwrap_or_else(|| author.clone());

        Self { author, committer }
    }
}
