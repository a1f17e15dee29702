use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    axum::{
        Router,
        extract::{Query, State},
        response::Html,
        routing::get,
    },
    serde::Deserialize,
    tokio::{
        net::TcpListener,
        sync::{Mutex, oneshot},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    pages,
    types::PkceSession,
};

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Check a callback against the session that issued the authorization URL.
/// Returns the authorization code when the callback may proceed to token exchange.
pub fn validate_callback<'a>(params: &'a CallbackParams, session: &PkceSession) -> Result<&'a str> {
    if let Some(error) = &params.error {
        return Err(Error::Denied {
            error: error.clone(),
            description: params.error_description.clone(),
        });
    }
    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(Error::MissingCode)?;
    if params.state.as_deref() != Some(session.state.as_str()) {
        return Err(Error::StateMismatch);
    }
    Ok(code)
}

/// A path the router can serve literally: absolute, with no `:name`, `*rest`
/// or `{param}` segments.
fn is_literal_route(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains(['{', '}'])
        && path
            .split('/')
            .all(|segment| !segment.starts_with([':', '*']))
}

/// Completes an accepted callback: token exchange, identity check, persistence.
#[async_trait]
pub trait AuthorizationHandler: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn complete(&self, code: &str, session: &PkceSession) -> Result<Self::Output>;

    /// HTML for the browser once `complete` succeeded.
    fn success_page(&self, output: &Self::Output) -> String;
}

struct CallbackState<H: AuthorizationHandler> {
    session: Mutex<Option<PkceSession>>,
    handler: Arc<H>,
    outcome: Mutex<Option<oneshot::Sender<Result<H::Output>>>>,
}

async fn handle_callback<H: AuthorizationHandler>(
    State(state): State<Arc<CallbackState<H>>>,
    Query(params): Query<CallbackParams>,
) -> Html<String> {
    let Some(session) = state.session.lock().await.take() else {
        debug!("callback received after the session was consumed");
        return Html(pages::failure_page(
            "Authorization Failed",
            &Error::SessionConsumed.to_string(),
        ));
    };

    let result = match validate_callback(&params, &session) {
        Ok(code) => {
            info!("authorization code received");
            state.handler.complete(code, &session).await
        },
        Err(e) => Err(e),
    };

    let page = match &result {
        Ok(output) => state.handler.success_page(output),
        Err(e) if e.is_protocol() => {
            warn!(error = %e, "rejected authorization callback");
            pages::failure_page("Authorization Failed", &e.to_string())
        },
        Err(e) => {
            warn!(error = %e, "authorization failed");
            pages::failure_page("Connection Failed", &e.to_string())
        },
    };

    if let Some(tx) = state.outcome.lock().await.take() {
        let _ = tx.send(result);
    }
    Html(page)
}

/// One-shot local listener for the provider redirect.
///
/// Owns exactly one [`PkceSession`]. The first request to the callback path
/// consumes it, whatever the outcome; the outcome is then available from
/// [`CallbackServer::wait`], which also tears the listener down.
pub struct CallbackServer<T> {
    local_addr: SocketAddr,
    outcome: oneshot::Receiver<Result<T>>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl<T: Send + 'static> CallbackServer<T> {
    /// Bind `addr` and serve `path` for `session`.
    pub async fn start<H>(
        addr: &str,
        path: &str,
        session: PkceSession,
        handler: Arc<H>,
    ) -> Result<Self>
    where
        H: AuthorizationHandler<Output = T>,
    {
        if !is_literal_route(path) {
            return Err(Error::InvalidCallbackPath(path.to_string()));
        }
        let listener = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(CallbackState {
            session: Mutex::new(Some(session)),
            handler,
            outcome: Mutex::new(Some(outcome_tx)),
        });
        let app = Router::new()
            .route(path, get(handle_callback::<H>))
            .with_state(state);

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(%local_addr, path, "callback listener started");
        Ok(Self {
            local_addr,
            outcome: outcome_rx,
            shutdown: shutdown_tx,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the terminal callback, keep serving for `grace` so the browser
    /// gets its page, then shut down.
    pub async fn wait(self, grace: Duration) -> Result<T> {
        self.wait_or_cancel(grace, std::future::pending()).await
    }

    /// Like [`CallbackServer::wait`], but stops early with [`Error::Cancelled`]
    /// when `cancel` resolves first. The listener is closed on every path.
    pub async fn wait_or_cancel<F>(mut self, grace: Duration, cancel: F) -> Result<T>
    where
        F: Future<Output = ()>,
    {
        let outcome = tokio::select! {
            received = &mut self.outcome => {
                let outcome = received.unwrap_or(Err(Error::Cancelled));
                tokio::time::sleep(grace).await;
                outcome
            },
            () = cancel => {
                info!("authorization cancelled");
                Err(Error::Cancelled)
            },
        };
        self.close().await?;
        outcome
    }

    async fn close(self) -> Result<()> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(Ok(())) => {
                debug!(local_addr = %self.local_addr, "callback listener closed");
                Ok(())
            },
            Ok(Err(source)) => Err(Error::Serve {
                addr: self.local_addr,
                source,
            }),
            Err(e) => {
                warn!(error = %e, "callback listener task ended abnormally");
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    fn session(state: &str) -> PkceSession {
        let mut s = PkceSession::new("client");
        s.state = state.to_string();
        s
    }

    fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_matching_state() {
        let p = params(Some("xyz"), Some("abc123"));
        assert_eq!(validate_callback(&p, &session("abc123")).unwrap(), "xyz");
    }

    #[test]
    fn test_validate_rejections() {
        let s = session("abc123");
        assert!(matches!(
            validate_callback(&params(Some("xyz"), Some("wrong")), &s),
            Err(Error::StateMismatch)
        ));
        assert!(matches!(
            validate_callback(&params(Some("xyz"), None), &s),
            Err(Error::StateMismatch)
        ));
        assert!(matches!(
            validate_callback(&params(None, Some("abc123")), &s),
            Err(Error::MissingCode)
        ));
        assert!(matches!(
            validate_callback(&params(Some(""), Some("abc123")), &s),
            Err(Error::MissingCode)
        ));

        let denied = CallbackParams {
            error: Some("access_denied".into()),
            state: Some("abc123".into()),
            ..Default::default()
        };
        let err = validate_callback(&denied, &s).unwrap_err();
        assert!(matches!(err, Error::Denied { .. }));
        assert!(err.is_protocol());
    }

    /// Records every completion attempt instead of calling the network.
    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AuthorizationHandler for CountingHandler {
        type Output = String;

        async fn complete(&self, code: &str, session: &PkceSession) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::TokenExchange {
                    status: 400,
                    body: "invalid_grant".into(),
                });
            }
            Ok(format!("{code}/{}", session.client_id))
        }

        fn success_page(&self, output: &String) -> String {
            pages::success_page("Connected", &[("Result:", output.clone())], "ok")
        }
    }

    async fn start(
        state: &str,
        handler: Arc<CountingHandler>,
    ) -> (CallbackServer<String>, String) {
        let server = CallbackServer::start("127.0.0.1:0", "/callback", session(state), handler)
            .await
            .unwrap();
        let base = format!("http://{}/callback", server.local_addr());
        (server, base)
    }

    #[tokio::test]
    async fn test_matching_state_reaches_handler() {
        let handler = Arc::new(CountingHandler::default());
        let (server, base) = start("abc123", Arc::clone(&handler)).await;

        let body = reqwest::get(format!("{base}?state=abc123&code=xyz"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("xyz/client"), "{body}");

        let output = server.wait(Duration::ZERO).await.unwrap();
        assert_eq!(output, "xyz/client");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrong_state_never_reaches_handler() {
        let handler = Arc::new(CountingHandler::default());
        let (server, base) = start("abc123", Arc::clone(&handler)).await;

        let body = reqwest::get(format!("{base}?state=wrong&code=xyz"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Authorization Failed"));

        let err = server.wait(Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, Error::StateMismatch));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_session_is_consumed_once() {
        let handler = Arc::new(CountingHandler::default());
        let (server, base) = start("abc123", Arc::clone(&handler)).await;

        reqwest::get(format!("{base}?state=wrong&code=xyz"))
            .await
            .unwrap();
        // A correct retry on the same session is not honoured.
        let body = reqwest::get(format!("{base}?state=abc123&code=xyz"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("already used"), "{body}");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(server.wait(Duration::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_handler_failure_is_reported_and_listener_closes() {
        let handler = Arc::new(CountingHandler {
            fail: true,
            ..Default::default()
        });
        let (server, base) = start("s", Arc::clone(&handler)).await;
        let addr = server.local_addr();

        let body = reqwest::get(format!("{base}?state=s&code=c"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Connection Failed"));
        assert!(body.contains("invalid_grant"));

        let err = server.wait(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, Error::TokenExchange { status: 400, .. }));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_closes_listener() {
        let handler = Arc::new(CountingHandler::default());
        let (server, _base) = start("s", Arc::clone(&handler)).await;
        let addr = server.local_addr();

        let err = server
            .wait_or_cancel(Duration::ZERO, async {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_relative_or_parameterized_path_is_rejected() {
        for path in ["callback", "", "/cb/:code", "/cb/{code}", "/*rest"] {
            let result = CallbackServer::start(
                "127.0.0.1:0",
                path,
                session("s"),
                Arc::new(CountingHandler::default()),
            )
            .await;
            assert!(
                matches!(result, Err(Error::InvalidCallbackPath(ref p)) if p == path),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_path_does_not_consume_session() {
        let handler = Arc::new(CountingHandler::default());
        let (server, base) = start("s", Arc::clone(&handler)).await;
        let root = base.trim_end_matches("/callback").to_string();

        let resp = reqwest::get(format!("{root}/favicon.ico")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        reqwest::get(format!("{base}?state=s&code=c")).await.unwrap();
        assert_eq!(server.wait(Duration::ZERO).await.unwrap(), "c/client");
    }
}
