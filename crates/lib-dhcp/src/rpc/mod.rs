use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use prost::Message as _;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

mod proto;

pub use proto::*;

/// Maximum payload carried in one frame; the 2-byte length leaves no room
/// for more.
pub const MAX_FRAME_LEN: usize = 65534;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEST_QUEUE_SIZE: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("RPC client is stopped")]
    Stopped,

    #[error("Connection to master lost")]
    ConnectionLost,

    #[error("Malformed reply from master")]
    BadReply,
}

/// The seam the request processor allocates through, mockable in tests.
#[async_trait]
pub trait AddressAllocator: Send + Sync {
    /// Submit a request and wait for the master's reply.
    async fn allocate(&self, request: LeaseRequest) -> Result<LeaseReply, RpcError>;

    /// Submit a fire-and-forget event (release, decline, conflict).
    async fn notify(&self, request: LeaseRequest);
}

struct RpcRecord {
    request: LeaseRequest,
    completion: Option<oneshot::Sender<Result<LeaseReply, RpcError>>>,
}

/// Cheap handle used by workers to submit requests to the RPC task.
#[derive(Clone)]
pub struct RpcHandle {
    tx: mpsc::Sender<RpcRecord>,
}

#[async_trait]
impl AddressAllocator for RpcHandle {
    async fn allocate(&self, request: LeaseRequest) -> Result<LeaseReply, RpcError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(RpcRecord {
                request,
                completion: Some(tx),
            })
            .await
            .map_err(|_| RpcError::Stopped)?;
        rx.await.map_err(|_| RpcError::Stopped)?
    }

    async fn notify(&self, request: LeaseRequest) {
        if self
            .tx
            .send(RpcRecord {
                request,
                completion: None,
            })
            .await
            .is_err()
        {
            warn!("dropping master notification, RPC client is stopped");
        }
    }
}

/// The allocation channel to the master: one persistent TCP connection,
/// 2-byte big-endian length framing, one outstanding request at a time.
/// Requests are serialized through an internal queue; on connection loss
/// the in-flight request fails and the connection is re-established after
/// a backoff.
pub struct RpcClient {
    master_addr: String,
    rx: mpsc::Receiver<RpcRecord>,
    cancel: CancellationToken,
    needs_backoff: bool,
}

type Connection = Framed<TcpStream, LengthDelimitedCodec>;

impl RpcClient {
    pub fn new(host: &str, port: u16, cancel: CancellationToken) -> (RpcHandle, RpcClient) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_SIZE);
        (
            RpcHandle { tx },
            RpcClient {
                master_addr: format!("{host}:{port}"),
                rx,
                cancel,
                needs_backoff: false,
            },
        )
    }

    /// Drive the connection until cancelled. Run on a dedicated task.
    pub async fn run(mut self) {
        let mut connection: Option<Connection> = None;

        loop {
            let record = tokio::select! {
                _ = self.cancel.cancelled() => break,
                record = self.rx.recv() => match record {
                    Some(record) => record,
                    None => break,
                },
            };

            self.process(record, &mut connection).await;
        }

        debug!("RPC client stopped");
    }

    async fn process(&mut self, record: RpcRecord, connection: &mut Option<Connection>) {
        let reply = self.exchange(&record.request, connection).await;

        if let Some(completion) = record.completion {
            // The requester may have given up; nothing to do then.
            let _ = completion.send(reply);
        }
    }

    async fn exchange(
        &mut self,
        request: &LeaseRequest,
        connection: &mut Option<Connection>,
    ) -> Result<LeaseReply, RpcError> {
        let mut conn = match self.take_connected(connection).await {
            Some(conn) => conn,
            None => return Err(RpcError::Stopped),
        };

        let payload = Bytes::from(request.encode_to_vec());
        if let Err(error) = conn.send(payload).await {
            error!(%error, "sending request to master failed");
            self.needs_backoff = true;
            return Err(RpcError::ConnectionLost);
        }

        match conn.next().await {
            Some(Ok(frame)) => {
                let reply = LeaseReply::decode(frame.as_ref()).map_err(|error| {
                    warn!(%error, "undecodable reply from master");
                    RpcError::BadReply
                });
                *connection = Some(conn);
                reply
            }
            Some(Err(error)) => {
                error!(%error, "reading reply from master failed");
                self.needs_backoff = true;
                Err(RpcError::ConnectionLost)
            }
            None => {
                error!("master closed the connection");
                self.needs_backoff = true;
                Err(RpcError::ConnectionLost)
            }
        }
    }

    /// Hand out the live connection, establishing one first if necessary.
    /// Connection attempts retry with a backoff; `None` means shutdown.
    async fn take_connected(&mut self, connection: &mut Option<Connection>) -> Option<Connection> {
        if let Some(conn) = connection.take() {
            return Some(conn);
        }

        loop {
            if self.needs_backoff {
                tokio::select! {
                    _ = self.cancel.cancelled() => return None,
                    _ = sleep(RECONNECT_DELAY) => {}
                }
            }

            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                attempt = TcpStream::connect(&self.master_addr) => attempt,
            };

            match attempt {
                Ok(stream) => {
                    debug!(addr = %self.master_addr, "connected to master");
                    self.needs_backoff = false;
                    return Some(framed(stream));
                }
                Err(error) => {
                    error!(addr = %self.master_addr, %error, "connect to master failed");
                    self.needs_backoff = true;
                }
            }
        }
    }
}

fn framed(stream: TcpStream) -> Connection {
    LengthDelimitedCodec::builder()
        .length_field_length(2)
        .max_frame_length(MAX_FRAME_LEN)
        .new_framed(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    async fn one_shot_master(reply: LeaseReply) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = framed(stream);

            let frame = framed.next().await.unwrap().unwrap();
            let request = LeaseRequest::decode(frame.as_ref()).unwrap();
            assert_eq!(request.request_type, RequestType::Discover as i32);

            framed
                .send(Bytes::from(reply.encode_to_vec()))
                .await
                .unwrap();
        });

        addr.to_string()
    }

    fn discover_request() -> LeaseRequest {
        LeaseRequest {
            request_type: RequestType::Discover as i32,
            subnet_id: 1,
            client_id: vec![],
            mac: vec![1, 2, 3, 4, 5, 6],
            hostname: String::new(),
            request_addr: 0,
        }
    }

    #[tokio::test]
    async fn allocate_round_trip() {
        let reply = LeaseReply {
            succeeded: true,
            addr: u32::from(Ipv4Addr::new(192, 0, 2, 100)),
            subnet_id: 1,
        };
        let addr = one_shot_master(reply).await;
        let (host, port) = addr.rsplit_once(':').unwrap();

        let cancel = CancellationToken::new();
        let (handle, client) = RpcClient::new(host, port.parse().unwrap(), cancel.clone());
        let client_task = tokio::spawn(client.run());

        let got = handle.allocate(discover_request()).await.unwrap();
        assert!(got.succeeded);
        assert_eq!(got.addr_v4(), Ipv4Addr::new(192, 0, 2, 100));

        cancel.cancel();
        client_task.await.unwrap();
    }

    #[tokio::test]
    async fn allocate_fails_when_master_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and immediately drop the connection.
            let _ = listener.accept().await.unwrap();
        });

        let cancel = CancellationToken::new();
        let (handle, client) = RpcClient::new("127.0.0.1", addr.port(), cancel.clone());
        let client_task = tokio::spawn(client.run());

        let got = handle.allocate(discover_request()).await;
        assert_eq!(got, Err(RpcError::ConnectionLost));

        cancel.cancel();
        client_task.await.unwrap();
    }
}
