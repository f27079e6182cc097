//! Controlling-station (client) entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::policy::SecurityPolicy;
use crate::registry::TypeRegistry;
use crate::session::{Session, SessionParameters, SessionRole};

/// Default IEC 104 port.
pub const DEFAULT_PORT: u16 = 2404;

/// Connect to a controlled station and start data transfer.
///
/// TCP establishment is bounded by T0; the STARTDT handshake by T1. The
/// returned session is in `Running` state with the built-in type registry.
pub async fn open_client(
    addr: SocketAddr,
    params: SessionParameters,
    policy: Arc<dyn SecurityPolicy>,
) -> Result<Session> {
    open_client_with_registry(addr, params, Arc::new(TypeRegistry::with_builtins()), policy).await
}

/// [`open_client`] with a caller-populated type registry.
pub async fn open_client_with_registry(
    addr: SocketAddr,
    params: SessionParameters,
    registry: Arc<TypeRegistry>,
    policy: Arc<dyn SecurityPolicy>,
) -> Result<Session> {
    params.validate()?;

    let stream = timeout(params.t0, TcpStream::connect(addr))
        .await
        .map_err(|_| Error::T0Timeout)??;
    // low-latency telecontrol traffic
    stream.set_nodelay(true).ok();
    let peer = stream.peer_addr().ok();
    debug!(?peer, "transport connected");

    let session = Session::establish(stream, peer, SessionRole::Client, params, registry, policy)?;
    session.start_data_transfer().await?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllowAll;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalid_params_rejected_before_io() {
        let params = SessionParameters::new().k(4).w(9);
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = open_client(addr, params, Arc::new(AllowAll)).await;
        assert!(matches!(result, Err(Error::Parameter(_))));
    }

    #[tokio::test]
    async fn test_t0_bounds_connect() {
        // RFC 5737 test address; connection attempts hang or fail
        let addr: SocketAddr = "192.0.2.1:2404".parse().unwrap();
        let params = SessionParameters::new().t0(Duration::from_millis(50));
        let result = open_client(addr, params, Arc::new(AllowAll)).await;
        match result {
            Err(Error::T0Timeout) | Err(Error::Io(_)) => {}
            other => panic!("expected timeout or refusal, got {other:?}"),
        }
    }
}
