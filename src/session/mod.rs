//! Application context: session token, current user and active hospital
//!
//! State lives in memory behind a `RwLock` and is mirrored to an injected
//! [`StateStore`] so it survives restarts. The context is shared by `Arc`
//! between the HTTP client and whatever drives it.

pub mod notifier;
pub mod storage;

pub use notifier::{ConsoleNotifier, Notice, NoticeLevel, Notifier, RecordingNotifier};
pub use storage::{keys, FileStore, MemoryStore, StateStore};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::types::{Hospital, RoleType, UserInfo};

/// Menu paths reachable before a hospital is activated
pub const HOSPITAL_FREE_PATHS: &[&str] = &["/system-settings", "/users", "/data-sources"];

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<UserInfo>,
    pub hospital: Option<Hospital>,
    pub accessible_hospitals: Vec<Hospital>,
}

pub struct AppContext {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<SessionState>,
    /// Set by the first 401; cleared by the next successful login
    redirecting: AtomicBool,
    redirect_delay: Duration,
}

impl AppContext {
    /// Empty context (logged out, no hospital).
    pub fn new(store: Arc<dyn StateStore>, notifier: Arc<dyn Notifier>, redirect_delay: Duration) -> Self {
        Self {
            store,
            notifier,
            state: RwLock::new(SessionState::default()),
            redirecting: AtomicBool::new(false),
            redirect_delay,
        }
    }

    /// Context re-hydrated from persistent storage.
    ///
    /// Corrupt JSON entries are logged and dropped instead of failing startup.
    pub fn restore(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        redirect_delay: Duration,
    ) -> ApiResult<Self> {
        let ctx = Self::new(store, notifier, redirect_delay);

        let token = ctx.store.get(keys::ACCESS_TOKEN)?.filter(|t| !t.is_empty());
        let user = ctx.load_json::<UserInfo>(&[keys::USER_INFO])?;
        let hospital =
            ctx.load_json::<Hospital>(&[keys::CURRENT_HOSPITAL, keys::CURRENT_HOSPITAL_ID])?;

        debug!(
            logged_in = token.is_some(),
            hospital_id = hospital.as_ref().map(|h| h.id),
            "Session restored"
        );

        {
            let mut state = ctx.state.write();
            state.token = token;
            state.user = user;
            state.hospital = hospital;
        }
        Ok(ctx)
    }

    /// Parse the JSON under `keys[0]`; on failure remove every key in `keys`.
    fn load_json<T: DeserializeOwned>(&self, keys: &[&str]) -> ApiResult<Option<T>> {
        let Some(raw) = self.store.get(keys[0])? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding unreadable {}: {}", keys[0], e);
                for key in keys {
                    self.store.remove(key)?;
                }
                Ok(None)
            }
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.read().token.is_some()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.state.read().user.clone()
    }

    /// Store a freshly issued bearer token.
    pub fn store_login(&self, token: &str) -> ApiResult<()> {
        self.store.set(keys::ACCESS_TOKEN, token)?;
        self.state.write().token = Some(token.to_string());
        self.redirecting.store(false, Ordering::SeqCst);
        info!("Logged in");
        Ok(())
    }

    pub fn store_user(&self, user: UserInfo) -> ApiResult<()> {
        let raw = serde_json::to_string(&user).map_err(|e| ApiError::Storage(e.to_string()))?;
        self.store.set(keys::USER_INFO, &raw)?;
        self.state.write().user = Some(user);
        Ok(())
    }

    /// Drop token, user and hospital both in memory and in storage.
    pub fn logout(&self) -> ApiResult<()> {
        *self.state.write() = SessionState::default();
        self.store.clear()?;
        info!("Session cleared");
        Ok(())
    }

    pub fn is_redirecting(&self) -> bool {
        self.redirecting.load(Ordering::SeqCst)
    }

    /// React to a 401.
    ///
    /// Only the first caller since the last login clears the session, emits
    /// the notice and schedules the redirect. Returns whether this call did.
    pub fn handle_unauthorized(&self) -> bool {
        if self
            .redirecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Unauthorized response while redirect already pending");
            return false;
        }

        warn!("Credential rejected, clearing session");
        if let Err(e) = self.logout() {
            warn!("Failed to clear persisted session: {}", e);
        }
        self.notifier
            .notify(Notice::new(NoticeLevel::Warning, ApiError::Unauthorized.to_string()));

        let notifier = Arc::clone(&self.notifier);
        let delay = self.redirect_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    notifier.redirect_to_login();
                });
            }
            Err(_) => notifier.redirect_to_login(),
        }
        true
    }

    /// Surface an error to the user as a single notice.
    pub fn report(&self, err: &ApiError) {
        self.notifier.notify(Notice::new(NoticeLevel::Error, err.to_string()));
    }

    // =========================================================================
    // Hospital context
    // =========================================================================

    pub fn current_hospital(&self) -> Option<Hospital> {
        self.state.read().hospital.clone()
    }

    pub fn current_hospital_id(&self) -> Option<i64> {
        self.state.read().hospital.as_ref().map(|h| h.id)
    }

    pub fn is_hospital_activated(&self) -> bool {
        self.state.read().hospital.is_some()
    }

    pub fn accessible_hospitals(&self) -> Vec<Hospital> {
        self.state.read().accessible_hospitals.clone()
    }

    pub fn set_accessible_hospitals(&self, hospitals: Vec<Hospital>) {
        self.state.write().accessible_hospitals = hospitals;
    }

    pub fn set_current_hospital(&self, hospital: Hospital) -> ApiResult<()> {
        let raw = serde_json::to_string(&hospital).map_err(|e| ApiError::Storage(e.to_string()))?;
        self.store.set(keys::CURRENT_HOSPITAL_ID, &hospital.id.to_string())?;
        self.store.set(keys::CURRENT_HOSPITAL, &raw)?;
        info!(hospital_id = hospital.id, "Hospital activated: {}", hospital.name);
        self.state.write().hospital = Some(hospital);
        Ok(())
    }

    pub fn clear_current_hospital(&self) -> ApiResult<()> {
        self.state.write().hospital = None;
        self.store.remove(keys::CURRENT_HOSPITAL_ID)?;
        self.store.remove(keys::CURRENT_HOSPITAL)?;
        Ok(())
    }

    /// Whether a menu path is reachable in the current hospital context.
    pub fn is_menu_enabled(&self, path: &str) -> bool {
        self.is_hospital_activated() || HOSPITAL_FREE_PATHS.contains(&path)
    }

    // =========================================================================
    // Roles and permissions
    // =========================================================================

    pub fn role_type(&self) -> Option<RoleType> {
        self.state.read().user.as_ref().and_then(|u| u.role_type)
    }

    /// Admins and maintainers
    pub fn is_admin(&self) -> bool {
        matches!(self.role_type(), Some(RoleType::Admin | RoleType::Maintainer))
    }

    pub fn is_maintainer(&self) -> bool {
        self.role_type() == Some(RoleType::Maintainer)
    }

    /// Admins see everything; everyone else only the configured menu paths.
    pub fn has_menu_permission(&self, path: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        let state = self.state.read();
        state
            .user
            .as_ref()
            .and_then(|u| u.menu_permissions.as_ref())
            .map(|perms| perms.iter().any(|p| p == path))
            .unwrap_or(false)
    }

    /// Legacy role check; "admin" also matches maintainers.
    pub fn has_role(&self, role: &str) -> bool {
        if role == "admin" || role == "系统管理员" {
            return self.is_admin();
        }
        self.role_type().map(|r| r.as_str() == role).unwrap_or(false)
    }
}
