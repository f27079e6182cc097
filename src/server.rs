//! Controlled-station (server) entry point.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::policy::SecurityPolicy;
use crate::registry::TypeRegistry;
use crate::session::{Session, SessionParameters, SessionRole};

/// Accept connections and run one server-role session per peer.
///
/// The security policy gates every accepted socket before a session exists;
/// rejected peers are dropped. For each admitted connection `on_session`
/// receives the [`Session`] handle and runs as its own task — it owns the
/// application logic (interrogation responses, command confirmation).
///
/// Runs until the listener fails.
pub async fn serve<F, Fut>(
    bind_addr: SocketAddr,
    params: SessionParameters,
    policy: Arc<dyn SecurityPolicy>,
    on_session: F,
) -> Result<()>
where
    F: Fn(Session) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    serve_with_registry(bind_addr, params, Arc::new(TypeRegistry::with_builtins()), policy, on_session)
        .await
}

/// [`serve`] with a caller-populated type registry.
pub async fn serve_with_registry<F, Fut>(
    bind_addr: SocketAddr,
    params: SessionParameters,
    registry: Arc<TypeRegistry>,
    policy: Arc<dyn SecurityPolicy>,
    on_session: F,
) -> Result<()>
where
    F: Fn(Session) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    params.validate()?;
    let listener = TcpListener::bind(bind_addr).await?;
    serve_on(listener, params, registry, policy, on_session).await
}

/// Serve on an already-bound listener (lets callers bind to port 0).
pub async fn serve_on<F, Fut>(
    listener: TcpListener,
    params: SessionParameters,
    registry: Arc<TypeRegistry>,
    policy: Arc<dyn SecurityPolicy>,
    on_session: F,
) -> Result<()>
where
    F: Fn(Session) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    params.validate()?;
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        if !policy.allow_connection(peer) {
            warn!(%peer, "connection rejected by security policy");
            drop(stream);
            continue;
        }
        stream.set_nodelay(true).ok();
        debug!(%peer, "client connected");

        match Session::establish(
            stream,
            Some(peer),
            SessionRole::Server,
            params.clone(),
            registry.clone(),
            policy.clone(),
        ) {
            Ok(session) => {
                tokio::spawn(on_session(session));
            }
            Err(err) => warn!(%peer, error = %err, "session setup failed"),
        }
    }
}
