//! Listening socket acquisition.
//!
//! Binds directly instead of probing first, so another process cannot
//! claim the port between the check and the bind.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;

use crate::error::ServerError;

/// How many consecutive ports to try before giving up.
pub(crate) const MAX_PORT_ATTEMPTS: u16 = 10;

/// Bind the first free port in `port..port + attempts`.
///
/// Returns the bound listener and the port it bound to, which differs
/// from `port` when the requested port was taken.
pub(crate) async fn acquire(port: u16, attempts: u16) -> Result<(TcpListener, u16), ServerError> {
    for offset in 0..attempts {
        let candidate = port.saturating_add(offset);
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, candidate));
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, candidate)),
            Err(err) => {
                tracing::debug!(port = candidate, error = %err, "Port unavailable");
            }
        }
    }

    Err(ServerError::PortExhausted {
        first: port,
        last: port.saturating_add(attempts.saturating_sub(1)),
    })
}
