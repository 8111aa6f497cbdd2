//! UDP listeners
//!
//! One task per configured listener drains datagrams from its socket into a
//! bounded channel toward the ingest loop. The whole set is torn down and
//! rebuilt on reconfiguration; a fresh cancellation token fences off the old
//! tasks.

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowcask_config::ListenConfig;

/// Largest datagram accepted; anything bigger is truncated by the kernel
/// and then rejected by the length checks
const MAX_DATAGRAM: usize = 2048;

/// Channel depth between the listeners and the ingest loop
const QUEUE_SIZE: usize = 1024;

/// One received datagram
#[derive(Debug, Clone)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub from: SocketAddr,
}

/// Listener setup errors
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind [{address}]:{port}: {source}")]
    Bind {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// The live set of listening sockets
pub struct ListenerSet {
    cancel: CancellationToken,
    rx: mpsc::Receiver<Datagram>,
    local_addrs: Vec<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl ListenerSet {
    /// Bind every configured listener and start its drain task
    pub fn spawn(listeners: &[ListenConfig]) -> Result<Self, ListenerError> {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(QUEUE_SIZE);
        let mut local_addrs = Vec::with_capacity(listeners.len());
        let mut tasks = Vec::with_capacity(listeners.len());

        for config in listeners {
            let addr = config
                .socket_addr()
                .map_err(|e| ListenerError::Bind {
                    address: config.address.clone(),
                    port: config.port,
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
                })?;

            let socket =
                bind_socket(addr, config.buffer_size).map_err(|source| ListenerError::Bind {
                    address: config.address.clone(),
                    port: config.port,
                    source,
                })?;

            let local = socket.local_addr().map_err(|source| ListenerError::Bind {
                address: config.address.clone(),
                port: config.port,
                source,
            })?;
            info!(listen = %local, "listening for NetFlow");
            local_addrs.push(local);

            tasks.push(tokio::spawn(drain_socket(
                socket,
                tx.clone(),
                cancel.clone(),
            )));
        }

        Ok(Self {
            cancel,
            rx,
            local_addrs,
            tasks,
        })
    }

    /// Addresses actually bound (resolves port 0)
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Next datagram from any listener; `None` once every task has exited
    pub async fn recv(&mut self) -> Option<Datagram> {
        self.rx.recv().await
    }

    /// Cancel the drain tasks and wait for them
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Build a UDP socket the tokio way: options first, then nonblocking
fn bind_socket(addr: SocketAddr, buffer_size: Option<usize>) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    if let Some(size) = buffer_size {
        if let Err(e) = socket.set_recv_buffer_size(size) {
            warn!(error = %e, requested = size, "failed to set SO_RCVBUF");
        }
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Forward datagrams until cancelled or the ingest side goes away
async fn drain_socket(socket: UdpSocket, tx: mpsc::Sender<Datagram>, cancel: CancellationToken) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            result = socket.recv_from(&mut buf) => match result {
                Ok((len, from)) => {
                    let datagram = Datagram {
                        payload: buf[..len].to_vec(),
                        from,
                    };
                    if tx.send(datagram).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    // Transient receive errors (ICMP-induced and the like)
                    // are not worth more than a debug line
                    debug!(error = %e, "recv error");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn loopback_listener() -> ListenConfig {
        ListenConfig {
            address: "127.0.0.1".into(),
            port: 0,
            buffer_size: None,
        }
    }

    #[tokio::test]
    async fn test_datagram_round_trip() {
        let mut set = ListenerSet::spawn(&[loopback_listener()]).unwrap();
        let target = set.local_addrs()[0];

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"hello flows", target).unwrap();

        let datagram = tokio::time::timeout(Duration::from_secs(5), set.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(datagram.payload, b"hello flows");
        assert_eq!(datagram.from.ip(), target.ip());

        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_multiple_listeners() {
        let mut set =
            ListenerSet::spawn(&[loopback_listener(), loopback_listener()]).unwrap();
        assert_eq!(set.local_addrs().len(), 2);
        let targets: Vec<_> = set.local_addrs().to_vec();

        let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"one", targets[0]).unwrap();
        sender.send_to(b"two", targets[1]).unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let d = tokio::time::timeout(Duration::from_secs(5), set.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(d.payload);
        }
        seen.sort();
        assert_eq!(seen, vec![b"one".to_vec(), b"two".to_vec()]);

        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_address_is_bind_error() {
        let config = ListenConfig {
            address: "not-an-ip".into(),
            port: 2055,
            buffer_size: None,
        };
        assert!(matches!(
            ListenerSet::spawn(&[config]),
            Err(ListenerError::Bind { .. })
        ));
    }
}
