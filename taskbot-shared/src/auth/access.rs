/// Sender resolution
///
/// Maps the chat sender of an inbound message to a registered [`User`].
///
/// # Modes
///
/// - **Open**: anyone may register with `/start` and becomes an employee.
///   Every other command requires an existing registration.
/// - **Whitelist**: only handles on the allow-list may use the bot. A listed
///   sender is registered on first contact, whatever the command, with the
///   role from the allow-list; the stored role follows the allow-list.
///
/// # Example
///
/// ```no_run
/// use taskbot_shared::auth::access::{resolve_sender, AccessMode, AccessOutcome, SenderProfile};
/// use taskbot_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let profile = SenderProfile::new("111");
///
/// match resolve_sender(&store, AccessMode::Open, &profile, true).await? {
///     AccessOutcome::Granted(user) => println!("hello {}", user.display_name()),
///     other => println!("rejected: {:?}", other),
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::models::user::{NewUser, Role, User};
use crate::store::{Store, StoreError};

/// Who may use the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Self-registration via `/start`
    #[default]
    Open,

    /// Allow-listed handles only
    Whitelist,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Open => f.write_str("open"),
            AccessMode::Whitelist => f.write_str("whitelist"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(AccessMode::Open),
            "whitelist" => Ok(AccessMode::Whitelist),
            other => Err(format!("unknown access mode: {}", other)),
        }
    }
}

/// Profile of the chat sender as reported by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderProfile {
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub handle: Option<String>,
}

impl SenderProfile {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            ..Default::default()
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    fn to_new_user(&self, role: Role) -> NewUser {
        NewUser {
            external_id: self.external_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            handle: self.handle.clone(),
            role,
        }
    }
}

/// Result of resolving a sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    /// Sender is a registered user
    Granted(User),

    /// Open mode: sender has not run the register command yet
    NotRegistered,

    /// Whitelist mode: sender's handle is not on the allow-list
    NotAuthorized,
}

/// Resolves the sender of a message to a user
///
/// `registering` is true when the message is the register command.
///
/// # Errors
///
/// Returns the store error if a lookup or write fails
pub async fn resolve_sender(
    store: &dyn Store,
    mode: AccessMode,
    profile: &SenderProfile,
    registering: bool,
) -> Result<AccessOutcome, StoreError> {
    match mode {
        AccessMode::Open => resolve_open(store, profile, registering).await,
        AccessMode::Whitelist => resolve_whitelisted(store, profile).await,
    }
}

async fn resolve_open(
    store: &dyn Store,
    profile: &SenderProfile,
    registering: bool,
) -> Result<AccessOutcome, StoreError> {
    if registering {
        let user = store.register_user(profile.to_new_user(Role::Employee)).await?;
        debug!(user_id = user.id, external_id = %user.external_id, "Sender registered");
        return Ok(AccessOutcome::Granted(user));
    }

    match store.find_user_by_external_id(&profile.external_id).await? {
        Some(user) => Ok(AccessOutcome::Granted(user)),
        None => Ok(AccessOutcome::NotRegistered),
    }
}

async fn resolve_whitelisted(
    store: &dyn Store,
    profile: &SenderProfile,
) -> Result<AccessOutcome, StoreError> {
    let handle = match profile.handle.as_deref().filter(|h| !h.trim().is_empty()) {
        Some(handle) => handle,
        None => {
            warn!(external_id = %profile.external_id, "Sender without handle rejected");
            return Ok(AccessOutcome::NotAuthorized);
        }
    };

    let entry = match store.find_allowed_user(handle).await? {
        Some(entry) => entry,
        None => {
            warn!(external_id = %profile.external_id, handle = %handle, "Sender not on allow-list");
            return Ok(AccessOutcome::NotAuthorized);
        }
    };

    let mut user = store.register_user(profile.to_new_user(entry.role)).await?;

    if user.role != entry.role {
        info!(
            user_id = user.id,
            from = %user.role,
            to = %entry.role,
            "Syncing role with allow-list"
        );
        if let Some(updated) = store.set_user_role(user.id, entry.role).await? {
            user = updated;
        }
    }

    Ok(AccessOutcome::Granted(user))
}
