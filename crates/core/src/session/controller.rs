//! Token lifecycle for one account
//!
//! The token moves `NO_TOKEN -> AUTHENTICATING -> HAS_TOKEN` and back to
//! `NO_TOKEN` when the remote rejects it. Readers load the token without
//! locking. A caller that finds no token takes the decision lock for a
//! short synchronous section and either joins the authentication already in
//! flight, fails fast inside the backoff window, or starts the flight
//! itself. The flight runs on its own task, so a cancelled caller never
//! leaves the session stuck in `AUTHENTICATING`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use accountlink_common::resilience::{Clock, SystemClock};
use accountlink_domain::{
    Account, AccountLinkError, Authorisation, ExpiredTokenStrategy, Result, SessionConfig,
    UserCredentials,
};
use arc_swap::ArcSwapOption;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::flight::{Decision, FlightSlot, SharedAuth};
use crate::ports::Authenticator;

/// Shared, cloneable handle to a session's token state
pub struct AuthSession<C: Clock = SystemClock> {
    state: Arc<SessionState<C>>,
}

impl<C: Clock> Clone for AuthSession<C> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

struct SessionState<C> {
    account: Account,
    credentials: Option<UserCredentials>,
    strategy: ExpiredTokenStrategy,
    authenticator: Arc<dyn Authenticator>,
    token: ArcSwapOption<String>,
    flight: Mutex<FlightSlot>,
    clock: C,
    auth_lock_wait: Duration,
    auth_retry_interval: Duration,
}

enum Wait {
    Lead(SharedAuth),
    Join(SharedAuth),
}

impl<C: Clock> AuthSession<C> {
    /// Build a session from credentials, a preauthenticated token, or both
    ///
    /// Without credentials the strategy is forced to
    /// [`ExpiredTokenStrategy::Fail`] and the token is used as long as the
    /// session lives.
    pub fn new(
        account: Account,
        credentials: Option<UserCredentials>,
        token: Option<String>,
        authenticator: Arc<dyn Authenticator>,
        settings: &SessionConfig,
        clock: C,
    ) -> Result<Self> {
        let token = token.map(|token| token.trim().to_string()).filter(|token| !token.is_empty());
        if credentials.is_none() && token.is_none() {
            return Err(AccountLinkError::Config(
                "A session needs credentials or a preauthenticated token".into(),
            ));
        }
        let strategy = settings.effective_strategy(credentials.is_some());
        debug!(account = %account, ?strategy, preauthenticated = token.is_some(), "session created");

        Ok(Self {
            state: Arc::new(SessionState {
                account,
                credentials,
                strategy,
                authenticator,
                token: ArcSwapOption::new(token.map(Arc::new)),
                flight: Mutex::new(FlightSlot::default()),
                clock,
                auth_lock_wait: settings.auth_lock_wait,
                auth_retry_interval: settings.auth_retry_interval,
            }),
        })
    }

    /// Account the session authenticates against
    pub fn account(&self) -> &Account {
        &self.state.account
    }

    /// What happens when the API rejects the held token
    pub fn strategy(&self) -> ExpiredTokenStrategy {
        self.state.strategy
    }

    /// Whether a token is currently held
    pub fn has_token(&self) -> bool {
        self.state.token.load().is_some()
    }

    /// Current token, authenticating first when there is none
    pub async fn token(&self) -> Result<Arc<String>> {
        if let Some(token) = self.state.token.load_full() {
            return Ok(token);
        }
        self.acquire().await
    }

    /// Run `operation` with a valid authorisation
    ///
    /// When the operation reports a rejected token and the strategy is
    /// [`ExpiredTokenStrategy::Reauthenticate`], the token is dropped, a new
    /// one is acquired and the operation is issued exactly once more.
    #[instrument(skip_all, fields(account = %self.state.account))]
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(Authorisation) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.token().await?;
        match operation(self.authorisation(&token)?).await {
            Err(err)
                if err.is_auth_rejection() && self.state.strategy == ExpiredTokenStrategy::Reauthenticate =>
            {
                info!(error = %err, "token rejected; reauthenticating");
                self.invalidate(&token);
                let token = self.token().await?;
                operation(self.authorisation(&token)?).await
            }
            other => other,
        }
    }

    /// Drop the current token and authenticate again
    ///
    /// Goes through the same single-flight path as an implicit
    /// authentication, so it joins a flight already in progress.
    #[instrument(skip_all, fields(account = %self.state.account))]
    pub async fn authenticate(&self) -> Result<Authorisation> {
        if self.state.credentials.is_none() {
            return Err(AccountLinkError::Config("No credentials configured to authenticate with".into()));
        }
        if let Some(current) = self.state.token.load_full() {
            self.invalidate(&current);
        }
        let token = self.token().await?;
        self.authorisation(&token)
    }

    fn authorisation(&self, token: &str) -> Result<Authorisation> {
        Authorisation::staff(self.state.account.clone(), token)
    }

    /// Clear the token only if it is still the one that was rejected
    fn invalidate(&self, rejected: &Arc<String>) {
        let current = Some(Arc::clone(rejected));
        let previous = self.state.token.compare_and_swap(&current, None::<Arc<String>>);
        if !(*previous).as_ref().is_some_and(|token| Arc::ptr_eq(token, rejected)) {
            debug!("token already replaced by another caller");
        }
    }

    /// Held token, or the result of the current or a freshly launched flight
    async fn acquire(&self) -> Result<Arc<String>> {
        let wait = {
            let mut slot = self.state.flight.lock();
            if let Some(token) = self.state.token.load_full() {
                return Ok(token);
            }
            match slot.decide(self.state.clock.now()) {
                Decision::Join(flight) => Wait::Join(flight),
                Decision::Backoff(remaining) => {
                    let retry_after_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
                    return Err(AccountLinkError::AuthBackoff { retry_after_ms });
                }
                Decision::Lead => {
                    let flight = self.launch()?;
                    slot.start(flight.clone());
                    Wait::Lead(flight)
                }
            }
        };

        match wait {
            Wait::Lead(flight) => flight.await,
            Wait::Join(flight) => {
                let limit = self.state.auth_lock_wait;
                tokio::time::timeout(limit, flight).await.unwrap_or_else(|_| {
                    let waited_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    warn!(waited_ms, "gave up waiting for authentication in progress");
                    Err(AccountLinkError::AuthLockTimeout { waited_ms })
                })
            }
        }
    }

    /// Spawn the authentication call; must be invoked under the decision lock
    fn launch(&self) -> Result<SharedAuth> {
        let credentials = self.state.credentials.clone().ok_or_else(|| {
            AccountLinkError::Config("No credentials configured to authenticate with".into())
        })?;

        let state = Arc::clone(&self.state);
        let task = tokio::spawn(async move {
            let result = state.authenticator.authenticate(&state.account, &credentials).await;
            state.settle(result)
        });

        let state = Arc::clone(&self.state);
        Ok(async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => state.settle(Err(AccountLinkError::Internal(format!(
                    "authentication task failed: {join_error}"
                )))),
            }
        }
        .boxed()
        .shared())
    }
}

impl<C: Clock> SessionState<C> {
    fn settle(&self, result: Result<String>) -> Result<Arc<String>> {
        let mut slot = self.flight.lock();
        match result {
            Ok(token) => {
                let token = Arc::new(token);
                self.token.store(Some(Arc::clone(&token)));
                slot.succeeded();
                info!(account = %self.account, "authenticated");
                Ok(token)
            }
            Err(err) => {
                slot.failed(self.clock.now() + self.auth_retry_interval);
                warn!(account = %self.account, error = %err, "authentication failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use accountlink_common::resilience::MockClock;

    use super::*;
    use crate::testing::{account, credentials, CountingAuthenticator};

    fn settings() -> SessionConfig {
        SessionConfig::default()
    }

    fn session(authenticator: &CountingAuthenticator, clock: &MockClock) -> AuthSession<MockClock> {
        AuthSession::new(
            account(),
            Some(credentials()),
            None,
            Arc::new(authenticator.clone()),
            &settings(),
            clock.clone(),
        )
        .unwrap()
    }

    fn rejected() -> AccountLinkError {
        AccountLinkError::Auth("Authentication token rejected".into())
    }

    #[test]
    fn needs_credentials_or_token() {
        let result = AuthSession::new(
            account(),
            None,
            Some("  ".into()),
            Arc::new(CountingAuthenticator::numbered()),
            &settings(),
            SystemClock,
        );
        assert!(matches!(result, Err(AccountLinkError::Config(_))));
    }

    #[tokio::test]
    async fn token_is_cached_after_first_authentication() {
        let authenticator = CountingAuthenticator::numbered();
        let session = session(&authenticator, &MockClock::new());

        assert_eq!(*session.token().await.unwrap(), "token-1");
        assert_eq!(*session.token().await.unwrap(), "token-1");
        assert_eq!(authenticator.calls(), 1);
        assert!(session.has_token());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_flight() {
        let authenticator = CountingAuthenticator::numbered().with_delay(Duration::from_millis(20));
        let session = session(&authenticator, &MockClock::new());

        let tokens = futures::future::join_all((0..30).map(|_| session.token())).await;

        assert_eq!(authenticator.calls(), 1);
        assert!(tokens.iter().all(|token| token.as_deref().map(String::as_str) == Ok("token-1")));
    }

    #[tokio::test]
    async fn preauthenticated_session_without_credentials_never_refreshes() {
        let authenticator = CountingAuthenticator::numbered();
        let session = AuthSession::new(
            account(),
            None,
            Some("fixed".into()),
            Arc::new(authenticator.clone()),
            &settings(),
            MockClock::new(),
        )
        .unwrap();
        let attempts = AtomicUsize::new(0);

        let err = session
            .call(|auth| {
                attempts.fetch_add(1, Ordering::SeqCst);
                assert_eq!(auth.token(), "fixed");
                async { Err::<(), _>(rejected()) }
            })
            .await
            .unwrap_err();

        assert!(err.is_auth_rejection());
        assert_eq!(session.strategy(), ExpiredTokenStrategy::Fail);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(authenticator.calls(), 0);
        assert!(matches!(session.authenticate().await, Err(AccountLinkError::Config(_))));
    }

    #[tokio::test]
    async fn rejection_triggers_one_reauthentication() {
        let authenticator = CountingAuthenticator::numbered();
        let session = session(&authenticator, &MockClock::new());
        let seen = Mutex::new(Vec::new());

        let value = session
            .call(|auth| {
                seen.lock().push(auth.token().to_string());
                let token = auth.token().to_string();
                async move { if token == "token-1" { Err(rejected()) } else { Ok(42) } }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(*seen.lock(), vec!["token-1".to_string(), "token-2".to_string()]);
        assert_eq!(authenticator.calls(), 2);
    }

    #[tokio::test]
    async fn second_rejection_is_surfaced() {
        let authenticator = CountingAuthenticator::numbered();
        let session = session(&authenticator, &MockClock::new());
        let attempts = AtomicUsize::new(0);

        let err = session
            .call(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(rejected()) }
            })
            .await
            .unwrap_err();

        assert!(err.is_auth_rejection());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(authenticator.calls(), 2);
    }

    #[tokio::test]
    async fn fail_strategy_surfaces_rejection_immediately() {
        let authenticator = CountingAuthenticator::numbered();
        let settings =
            SessionConfig { expired_token_strategy: ExpiredTokenStrategy::Fail, ..SessionConfig::default() };
        let session = AuthSession::new(
            account(),
            Some(credentials()),
            None,
            Arc::new(authenticator.clone()),
            &settings,
            MockClock::new(),
        )
        .unwrap();

        let err = session.call(|_| async { Err::<(), _>(rejected()) }).await.unwrap_err();

        assert!(err.is_auth_rejection());
        assert_eq!(authenticator.calls(), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let authenticator = CountingAuthenticator::numbered();
        let session = session(&authenticator, &MockClock::new());
        let attempts = AtomicUsize::new(0);

        let err = session
            .call(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(AccountLinkError::Unavailable("down".into())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountLinkError::Unavailable(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_authentication_backs_off_until_interval_elapses() {
        let authenticator = CountingAuthenticator::new(|n| {
            if n == 0 {
                Err(AccountLinkError::Service { status: 401, errors: vec![] })
            } else {
                Ok("token-ok".into())
            }
        });
        let clock = MockClock::new();
        let session = session(&authenticator, &clock);

        assert!(matches!(session.token().await, Err(AccountLinkError::Service { status: 401, .. })));

        clock.advance_millis(2_000);
        assert_eq!(
            session.token().await.unwrap_err(),
            AccountLinkError::AuthBackoff { retry_after_ms: 3_000 }
        );
        assert_eq!(authenticator.calls(), 1);

        clock.advance_millis(3_000);
        assert_eq!(*session.token().await.unwrap(), "token-ok");
        assert_eq!(authenticator.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn joined_caller_times_out_without_network_call() {
        let authenticator = CountingAuthenticator::numbered().with_delay(Duration::from_secs(60));
        let session = session(&authenticator, &MockClock::new());

        let leader = tokio::spawn({
            let session = session.clone();
            async move { session.token().await }
        });
        while authenticator.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let err = session.token().await.unwrap_err();
        assert_eq!(err, AccountLinkError::AuthLockTimeout { waited_ms: 15_000 });
        assert_eq!(authenticator.calls(), 1);

        assert_eq!(*leader.await.unwrap().unwrap(), "token-1");
    }

    #[tokio::test]
    async fn explicit_authenticate_replaces_token() {
        let authenticator = CountingAuthenticator::numbered();
        let session = session(&authenticator, &MockClock::new());

        assert_eq!(*session.token().await.unwrap(), "token-1");
        let auth = session.authenticate().await.unwrap();

        assert_eq!(auth.token(), "token-2");
        assert_eq!(authenticator.calls(), 2);
    }
}
