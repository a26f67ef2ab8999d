//! Credentials and the single-invocation steamcmd command batch

use crate::catalog::{ModId, ModList};
use crate::error::{Error, Result};

/// Environment variable holding the Steam username
pub const USERNAME_VAR: &str = "STEAMCMD_USR";
/// Environment variable holding the Steam password
pub const PASSWORD_VAR: &str = "STEAMCMD_PWD";
/// Environment variable holding an optional Steam Guard code
pub const GUARD_CODE_VAR: &str = "STEAMCMD_GUARD";

/// Steam login credentials
///
/// Passed through to steamcmd untouched. `Debug` redacts the secrets so a
/// stray `?credentials` in a log line cannot leak them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Steam account name
    pub username: String,
    /// Steam account password
    pub password: String,
    /// One-time Steam Guard code, if the account needs one
    pub guard_code: Option<String>,
}

impl Credentials {
    /// Create credentials without a guard code
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            guard_code: None,
        }
    }

    /// Attach a one-time guard code
    pub fn with_guard_code(mut self, code: impl Into<String>) -> Self {
        self.guard_code = Some(code.into());
        self
    }

    /// Read credentials from `STEAMCMD_USR`, `STEAMCMD_PWD` and `STEAMCMD_GUARD`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let username = get(USERNAME_VAR)
            .ok_or_else(|| Error::config(format!("{USERNAME_VAR} is not set"), USERNAME_VAR))?;
        let password = get(PASSWORD_VAR)
            .ok_or_else(|| Error::config(format!("{PASSWORD_VAR} is not set"), PASSWORD_VAR))?;

        Ok(Self {
            username,
            password,
            guard_code: get(GUARD_CODE_VAR),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("guard_code", &self.guard_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One steamcmd invocation: login, one download per item, quit
///
/// All items share a single process so steamcmd logs in once per batch.
#[derive(Debug, Clone)]
pub struct FetchBatch {
    credentials: Credentials,
    app_id: u32,
    ids: Vec<ModId>,
}

impl FetchBatch {
    /// Build a batch for every mod in `mods`, in catalog order
    pub fn new(credentials: Credentials, app_id: u32, mods: &ModList) -> Self {
        Self {
            credentials,
            app_id,
            ids: mods.ids().cloned().collect(),
        }
    }

    /// Ids requested by this batch
    pub fn ids(&self) -> &[ModId] {
        &self.ids
    }

    /// Whether the batch requests nothing
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The steamcmd argument list
    pub fn to_args(&self) -> Vec<String> {
        self.render(false)
    }

    /// The argument list with credentials masked, for logging
    pub fn redacted_args(&self) -> Vec<String> {
        self.render(true)
    }

    fn render(&self, redact: bool) -> Vec<String> {
        let mut args = Vec::with_capacity(5 + self.ids.len() * 3);
        let secret = |value: &str| {
            if redact {
                "***".to_string()
            } else {
                value.to_string()
            }
        };

        args.push("+login".to_string());
        args.push(self.credentials.username.clone());
        args.push(secret(&self.credentials.password));
        if let Some(code) = &self.credentials.guard_code {
            args.push(secret(code));
        }

        let app_id = self.app_id.to_string();
        for id in &self.ids {
            args.push("+workshop_download_item".to_string());
            args.push(app_id.clone());
            args.push(id.to_string());
        }

        args.push("+quit".to_string());
        args
    }
}
