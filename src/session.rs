//! Session Guard: bearer-token lifecycle and the authentication state
//! machine consumed by route protection and header display.
//!
//! The token is process-wide mutable state with a single designated
//! writer (this module); every gateway reads it as a snapshot through
//! [`SessionToken`]. The persisted copy lives in a plain file under the
//! user data directory and is only ever cleared by logout.

use crate::api::types::User;
use crate::api::AuthApi;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the in-memory bearer token. Cloned into every
/// gateway; reads are snapshots, mutation happens only through the
/// session guard.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(Arc<RwLock<Option<String>>>);

impl SessionToken {
  pub fn snapshot(&self) -> Option<String> {
    self
      .0
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub(crate) fn set(&self, token: Option<String>) {
    *self.0.write().unwrap_or_else(PoisonError::into_inner) = token;
  }
}

/// Persisted token store: a single file holding the raw token.
#[derive(Debug, Clone)]
pub struct TokenStore {
  path: PathBuf,
}

impl TokenStore {
  /// Open the store at the default location
  /// (`$XDG_DATA_HOME/smartinvoice/token`).
  pub fn open() -> Result<Self> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::TokenStore("could not determine data directory".into()))?;

    Ok(Self::at(data_dir.join("smartinvoice").join("token")))
  }

  /// Open the store at an explicit path.
  pub fn at(path: PathBuf) -> Self {
    Self { path }
  }

  /// Read the persisted token, if any. Unreadable or empty files count
  /// as "no token".
  pub fn load(&self) -> Option<String> {
    let raw = std::fs::read_to_string(&self.path).ok()?;
    let token = raw.trim();
    if token.is_empty() {
      None
    } else {
      Some(token.to_string())
    }
  }

  pub fn save(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::TokenStore(format!("failed to create {}: {}", parent.display(), e)))?;
    }
    std::fs::write(&self.path, token)
      .map_err(|e| Error::TokenStore(format!("failed to write {}: {}", self.path.display(), e)))
  }

  pub fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(Error::TokenStore(format!(
        "failed to remove {}: {}",
        self.path.display(),
        e
      ))),
    }
  }
}

/// Authentication state machine: `Unknown` until the startup identity
/// probe resolves, then `Authenticated` or `Unauthenticated`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
  Unknown,
  Authenticated(User),
  Unauthenticated,
}

/// What a protected route should do given the current auth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
  /// State not resolved yet: render nothing.
  Suspend,
  Allow,
  /// Redirect to the public landing view. The attempted location is
  /// recorded on the guard for post-login restoration.
  RedirectToLanding,
}

pub struct SessionGuard<A> {
  api: A,
  token: SessionToken,
  store: TokenStore,
  state: AuthState,
  return_location: Option<String>,
}

impl<A: AuthApi> SessionGuard<A> {
  /// Initialize from the persisted token store. The state stays
  /// `Unknown` until [`resolve`](Self::resolve) runs the identity probe.
  pub fn new(api: A, token: SessionToken, store: TokenStore) -> Self {
    token.set(store.load());
    Self {
      api,
      token,
      store,
      state: AuthState::Unknown,
      return_location: None,
    }
  }

  pub fn state(&self) -> &AuthState {
    &self.state
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(self.state, AuthState::Authenticated(_))
  }

  /// Run the startup identity probe. Success with a user record means
  /// `Authenticated`; any error means `Unauthenticated`. The persisted
  /// token is left in place either way (logout is the only clearing
  /// path).
  pub async fn resolve(&mut self) -> &AuthState {
    self.state = match self.api.me().await {
      Ok(user) => {
        tracing::info!(user = %user.name, "session resolved");
        AuthState::Authenticated(user)
      }
      Err(e) => {
        tracing::debug!(error = %e, "identity probe failed");
        AuthState::Unauthenticated
      }
    };
    &self.state
  }

  /// Log in with email and password. On success the token is persisted
  /// and the identity probe populates the user record. On failure the
  /// session state and token are left untouched.
  pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
    require_credential("email", email)?;
    require_credential("password", password)?;

    let token = self.api.login(email, password).await?;
    self.install_token(token).await
  }

  /// Sign up a new account. A 400 from the store is a field-level
  /// validation failure surfaced on the password field.
  pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> Result<()> {
    require_credential("name", name)?;
    require_credential("email", email)?;
    require_credential("password", password)?;

    let token = match self.api.signup(name, email, password).await {
      Ok(token) => token,
      Err(Error::Remote { status: 400, message }) => {
        return Err(Error::Validation {
          field: "password",
          message,
        });
      }
      Err(e) => return Err(e),
    };
    self.install_token(token).await
  }

  async fn install_token(&mut self, token: String) -> Result<()> {
    self.store.save(&token)?;
    self.token.set(Some(token));

    // The token response carries no user record; the probe supplies it.
    match self.api.me().await {
      Ok(user) => {
        tracing::info!(user = %user.name, "logged in");
        self.state = AuthState::Authenticated(user);
        Ok(())
      }
      Err(e) => {
        self.state = AuthState::Unauthenticated;
        Err(e)
      }
    }
  }

  /// Clear the token (memory and store) and drop to `Unauthenticated`.
  pub fn logout(&mut self) -> Result<()> {
    self.store.clear()?;
    self.token.set(None);
    self.state = AuthState::Unauthenticated;
    tracing::info!("logged out");
    Ok(())
  }

  /// Decide what a protected route at `attempted` should do. A redirect
  /// records the attempted location for post-login restoration.
  pub fn route_decision(&mut self, attempted: &str) -> RouteDecision {
    match self.state {
      AuthState::Unknown => RouteDecision::Suspend,
      AuthState::Authenticated(_) => RouteDecision::Allow,
      AuthState::Unauthenticated => {
        self.return_location = Some(attempted.to_string());
        RouteDecision::RedirectToLanding
      }
    }
  }

  /// The location captured by the last redirect, if any. Shells call
  /// this after a successful login to restore the attempted view.
  pub fn take_return_location(&mut self) -> Option<String> {
    self.return_location.take()
  }
}

fn require_credential(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(field, "required"));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Clone)]
  struct StubAuth {
    login: Result<String>,
    signup: Result<String>,
    me: Result<User>,
  }

  impl StubAuth {
    fn anonymous() -> Self {
      let denied = Error::Remote {
        status: 401,
        message: "unauthorized".into(),
      };
      Self {
        login: Err(denied.clone()),
        signup: Err(denied.clone()),
        me: Err(denied),
      }
    }

    fn for_user(name: &str, token: &str) -> Self {
      Self {
        login: Ok(token.to_string()),
        signup: Ok(token.to_string()),
        me: Ok(User { name: name.to_string() }),
      }
    }
  }

  impl AuthApi for StubAuth {
    async fn login(&self, _email: &str, _password: &str) -> Result<String> {
      self.login.clone()
    }

    async fn signup(&self, _name: &str, _email: &str, _password: &str) -> Result<String> {
      self.signup.clone()
    }

    async fn me(&self) -> Result<User> {
      self.me.clone()
    }
  }

  fn store_in(dir: &tempfile::TempDir) -> TokenStore {
    TokenStore::at(dir.path().join("token"))
  }

  #[test]
  fn token_store_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    assert_eq!(store.load(), None);
    store.save("tok-123").expect("save");
    assert_eq!(store.load(), Some("tok-123".to_string()));
    store.clear().expect("clear");
    assert_eq!(store.load(), None);
    // Clearing an already-empty store is fine.
    store.clear().expect("clear again");
  }

  #[tokio::test]
  async fn successful_login_persists_token_and_authenticates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    let token = SessionToken::default();
    let mut guard = SessionGuard::new(
      StubAuth::for_user("Alice", "tok-abc"),
      token.clone(),
      store.clone(),
    );

    guard.login("alice@example.com", "hunter2").await.expect("login");

    assert_eq!(token.snapshot(), Some("tok-abc".to_string()));
    assert_eq!(store.load(), Some("tok-abc".to_string()));
    assert_eq!(
      guard.state(),
      &AuthState::Authenticated(User { name: "Alice".into() })
    );
  }

  #[tokio::test]
  async fn failed_login_leaves_session_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    let token = SessionToken::default();
    let mut guard = SessionGuard::new(StubAuth::anonymous(), token.clone(), store.clone());

    let err = guard.login("alice@example.com", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::Remote { status: 401, .. }));
    assert_eq!(guard.state(), &AuthState::Unknown);
    assert_eq!(token.snapshot(), None);
    assert_eq!(store.load(), None);
  }

  #[tokio::test]
  async fn blank_credentials_never_reach_the_network() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut guard = SessionGuard::new(
      StubAuth::anonymous(),
      SessionToken::default(),
      store_in(&dir),
    );

    let err = guard.login("", "hunter2").await.unwrap_err();
    assert!(matches!(err, Error::Validation { field: "email", .. }));
  }

  #[tokio::test]
  async fn signup_400_lands_on_the_password_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut auth = StubAuth::anonymous();
    auth.signup = Err(Error::Remote {
      status: 400,
      message: "password too short".into(),
    });
    let mut guard = SessionGuard::new(auth, SessionToken::default(), store_in(&dir));

    let err = guard.signup("Bob", "bob@example.com", "x").await.unwrap_err();
    assert_eq!(
      err,
      Error::Validation {
        field: "password",
        message: "password too short".into()
      }
    );
  }

  #[tokio::test]
  async fn failed_probe_resolves_unauthenticated_but_keeps_stored_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    store.save("stale-token").expect("seed");

    let token = SessionToken::default();
    let mut guard = SessionGuard::new(StubAuth::anonymous(), token.clone(), store.clone());

    // Startup loaded the persisted token into memory.
    assert_eq!(token.snapshot(), Some("stale-token".to_string()));

    assert_eq!(guard.resolve().await, &AuthState::Unauthenticated);
    // Logout is the only clearing path for the store.
    assert_eq!(store.load(), Some("stale-token".to_string()));
  }

  #[tokio::test]
  async fn route_guard_follows_the_state_machine() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut guard = SessionGuard::new(
      StubAuth::anonymous(),
      SessionToken::default(),
      store_in(&dir),
    );

    assert_eq!(guard.route_decision("/invoice/7"), RouteDecision::Suspend);

    guard.resolve().await;
    assert_eq!(
      guard.route_decision("/invoice/7"),
      RouteDecision::RedirectToLanding
    );
    assert_eq!(guard.take_return_location(), Some("/invoice/7".to_string()));
    assert_eq!(guard.take_return_location(), None);
  }

  #[tokio::test]
  async fn logout_clears_token_everywhere() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);
    let token = SessionToken::default();
    let mut guard = SessionGuard::new(
      StubAuth::for_user("Alice", "tok-abc"),
      token.clone(),
      store.clone(),
    );

    guard.login("alice@example.com", "hunter2").await.expect("login");
    guard.logout().expect("logout");

    assert_eq!(guard.state(), &AuthState::Unauthenticated);
    assert_eq!(token.snapshot(), None);
    assert_eq!(store.load(), None);
  }
}
