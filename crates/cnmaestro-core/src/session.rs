// ── Session lifecycle ──
//
// Owns the login credentials and drives the shared `Session` through
// initial login and periodic refresh. Scrapes only ever read the session;
// this module is its single writer.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cnmaestro_api::{AuthInfo, LoginProvider, Session};

use crate::config::RefreshPolicy;
use crate::error::CoreError;

// ── SessionState ─────────────────────────────────────────────────

/// Authentication state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    /// The last `failures` refresh attempts all failed.
    RefreshFailing { failures: u32 },
    /// Refresh gave up. Terminal.
    Fatal,
}

// ── SessionManager ───────────────────────────────────────────────

/// Logs in through a [`LoginProvider`] and keeps the session fresh.
///
/// Cheaply cloneable; clones share the same session and state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    session: Arc<Session>,
    provider: Arc<dyn LoginProvider>,
    username: String,
    password: SecretString,
    policy: RefreshPolicy,
    state: watch::Sender<SessionState>,
}

/// Handle to a spawned refresh task.
pub struct RefreshTask {
    pub handle: JoinHandle<()>,
    /// Receives the error once refresh gives up. Closed without a value
    /// if the task is cancelled first.
    pub fatal: oneshot::Receiver<CoreError>,
}

impl SessionManager {
    pub fn new(
        session: Arc<Session>,
        provider: Arc<dyn LoginProvider>,
        username: String,
        password: SecretString,
        policy: RefreshPolicy,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            inner: Arc::new(Inner {
                session,
                provider,
                username,
                password,
                policy,
                state,
            }),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Current CSRF token, or empty if none is set.
    pub async fn csrf_token(&self) -> String {
        self.inner.session.csrf_token().await
    }

    /// Log in once and install the resulting session.
    ///
    /// Errors are returned as the provider reported them; a login that
    /// exceeds the policy's login timeout is a [`cnmaestro_api::Error::Timeout`].
    pub async fn login(&self) -> Result<AuthInfo, cnmaestro_api::Error> {
        let timeout = self.inner.policy.login_timeout;
        let attempt =
            self.inner
                .provider
                .login(&self.inner.username, &self.inner.password, timeout);

        let info = tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| cnmaestro_api::Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })??;

        self.inner.session.install(&info).await;
        self.set_state(SessionState::Authenticated);
        debug!(csrf = !info.csrf_token.is_empty(), "login succeeded");
        Ok(info)
    }

    /// Refresh the session until cancelled or until refresh gives up.
    ///
    /// Waits `interval` between successful logins and `retry_interval`
    /// after a failed one. Once more than `max_failures` consecutive
    /// attempts have failed the state becomes [`SessionState::Fatal`] and
    /// [`CoreError::RefreshExhausted`] is returned.
    pub async fn run_refresh(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        let policy = self.inner.policy;
        let mut failures: u32 = 0;
        let mut delay = next_delay(&policy, failures);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }

            match self.login().await {
                Ok(_) => {
                    if failures > 0 {
                        info!(failures, "session refresh recovered");
                    } else {
                        info!("session refreshed");
                    }
                    failures = 0;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if failures > policy.max_failures {
                        self.set_state(SessionState::Fatal);
                        error!(failures, error = %e, "session refresh failed too often, giving up");
                        return Err(CoreError::RefreshExhausted {
                            failures,
                            last_error: e.to_string(),
                        });
                    }
                    self.set_state(SessionState::RefreshFailing { failures });
                    warn!(
                        failures,
                        max_failures = policy.max_failures,
                        retry_in = ?policy.retry_interval,
                        error = %e,
                        "session refresh failed"
                    );
                }
            }
            delay = next_delay(&policy, failures);
        }
    }

    /// Spawn [`run_refresh`](Self::run_refresh) as a background task.
    pub fn spawn_refresh(&self, cancel: CancellationToken) -> RefreshTask {
        let (tx, fatal) = oneshot::channel();
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = manager.run_refresh(cancel).await {
                let _ = tx.send(e);
            }
        });
        RefreshTask { handle, fatal }
    }

    fn set_state(&self, next: SessionState) {
        self.inner.state.send_if_modified(|current| {
            if *current == SessionState::Fatal || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Time until the next refresh attempt after `failures` consecutive failures.
pub fn next_delay(policy: &RefreshPolicy, failures: u32) -> Duration {
    if failures == 0 {
        policy.interval
    } else {
        policy.retry_interval
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use tokio::sync::oneshot::error::TryRecvError;
    use url::Url;

    use super::*;

    /// Login stub answering from a script, then with `fallback`.
    struct ScriptedLogin {
        calls: AtomicU32,
        script: Mutex<VecDeque<bool>>,
        fallback: bool,
    }

    impl ScriptedLogin {
        fn new(script: &[bool], fallback: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script.iter().copied().collect()),
                fallback,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LoginProvider for ScriptedLogin {
        async fn login(
            &self,
            _username: &str,
            _password: &SecretString,
            _timeout: Duration,
        ) -> Result<AuthInfo, cnmaestro_api::Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let ok = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.fallback);
            if ok {
                Ok(AuthInfo {
                    session_id: format!("s:{n}"),
                    csrf_token: format!("tok-{n}"),
                })
            } else {
                Err(cnmaestro_api::Error::Login {
                    message: "browser crashed".into(),
                })
            }
        }
    }

    /// Never answers.
    struct HangingLogin;

    #[async_trait]
    impl LoginProvider for HangingLogin {
        async fn login(
            &self,
            _username: &str,
            _password: &SecretString,
            _timeout: Duration,
        ) -> Result<AuthInfo, cnmaestro_api::Error> {
            std::future::pending().await
        }
    }

    fn policy(max_failures: u32) -> RefreshPolicy {
        RefreshPolicy {
            interval: Duration::from_secs(6 * 3600),
            retry_interval: Duration::from_secs(1800),
            max_failures,
            login_timeout: Duration::from_secs(20),
        }
    }

    fn manager(provider: Arc<dyn LoginProvider>, max_failures: u32) -> SessionManager {
        let session = Arc::new(Session::new(
            Url::parse("https://cloud.example.com").unwrap(),
        ));
        SessionManager::new(
            session,
            provider,
            "admin".into(),
            SecretString::from("pw".to_string()),
            policy(max_failures),
        )
    }

    #[tokio::test]
    async fn login_installs_session() {
        let provider = ScriptedLogin::new(&[], true);
        let m = manager(provider, 3);
        assert_eq!(m.state(), SessionState::Unauthenticated);

        let info = m.login().await.unwrap();
        assert_eq!(info.session_id, "s:1");
        assert_eq!(m.csrf_token().await, "tok-1");
        assert!(m.session().has_session().await);
        assert_eq!(m.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn login_failure_is_returned_unchanged() {
        let m = manager(ScriptedLogin::new(&[], false), 3);
        let err = m.login().await.unwrap_err();
        assert!(matches!(err, cnmaestro_api::Error::Login { .. }));
        assert_eq!(m.state(), SessionState::Unauthenticated);
        assert_eq!(m.csrf_token().await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn login_times_out() {
        let m = manager(Arc::new(HangingLogin), 3);
        let err = m.login().await.unwrap_err();
        assert!(matches!(err, cnmaestro_api::Error::Timeout { timeout_secs: 20 }));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_gives_up_after_bound_is_exceeded() {
        let provider = ScriptedLogin::new(&[], false);
        let m = manager(provider.clone(), 3);
        let mut task = m.spawn_refresh(CancellationToken::new());

        // First tick after 6h, then retries every 30min: three failures
        // have happened by 7h, the fourth is due at 7h30.
        tokio::time::sleep(Duration::from_secs(7 * 3600 + 60)).await;
        assert_eq!(provider.calls(), 3);
        assert_eq!(m.state(), SessionState::RefreshFailing { failures: 3 });
        assert!(matches!(task.fatal.try_recv(), Err(TryRecvError::Empty)));

        let err = (&mut task.fatal).await.unwrap();
        assert!(matches!(err, CoreError::RefreshExhausted { failures: 4, .. }));
        assert_eq!(provider.calls(), 4);
        assert_eq!(m.state(), SessionState::Fatal);

        task.handle.await.unwrap();
        // No further attempts once fatal.
        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_counter() {
        // Three failures, one success, three failures: never more than
        // three in a row, so refresh keeps going.
        let provider = ScriptedLogin::new(&[false, false, false, true, false, false, false], true);
        let m = manager(provider.clone(), 3);
        let cancel = CancellationToken::new();
        let mut task = m.spawn_refresh(cancel.clone());

        // 6h + 3 * 30min -> success at 7h30; next tick at 13h30, then
        // 14h, 14h30 fail; 15h succeeds via fallback.
        tokio::time::sleep(Duration::from_secs(14 * 3600 + 45 * 60)).await;
        assert_eq!(provider.calls(), 7);
        assert_eq!(m.state(), SessionState::RefreshFailing { failures: 3 });
        assert!(matches!(task.fatal.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::sleep(Duration::from_secs(30 * 60)).await;
        assert_eq!(provider.calls(), 8);
        assert_eq!(m.state(), SessionState::Authenticated);
        assert_eq!(m.csrf_token().await, "tok-8");

        cancel.cancel();
        task.handle.await.unwrap();
        assert!(matches!(task.fatal.try_recv(), Err(TryRecvError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_refresh_before_first_tick() {
        let provider = ScriptedLogin::new(&[], true);
        let m = manager(provider.clone(), 3);
        let cancel = CancellationToken::new();
        let task = m.spawn_refresh(cancel.clone());

        cancel.cancel();
        task.handle.await.unwrap();
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn delay_depends_on_failures() {
        let p = policy(3);
        assert_eq!(next_delay(&p, 0), p.interval);
        assert_eq!(next_delay(&p, 2), p.retry_interval);
    }
}
