use std::time::{Duration, Instant};

use bytes::Bytes;
use ed25519_dalek::SigningKey;
use futures::{SinkExt, StreamExt};
use mtp_observability::record_peer_query;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::{
    error::{PeerError, Result},
    proto::{Request, Response},
};

/// A connection that has been idle longer than this is re-established before
/// the next query; storage nodes drop quiet sessions aggressively.
const STALE_AFTER: Duration = Duration::from_secs(5);

/// Frames larger than this are rejected at the codec level. Torrent-info
/// answers are the largest legitimate payload.
const MAX_FRAME_SIZE: usize = 32 << 20;

/// Owns the node identity and opens authenticated connections to peers.
/// One gateway is cheap; the proof-check worker scopes one per provider so
/// sessions never outlive a tick.
pub struct Gateway {
    signing_key: SigningKey,
}

impl Gateway {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Dials `addr` and performs the hello exchange announcing our key and
    /// the server key we expect to talk to.
    pub async fn connect(&self, addr: &str, server_public_key: [u8; 32]) -> Result<PeerConnection> {
        let stream = TcpStream::connect(addr).await?;

        let mut framed = Framed::new(
            stream,
            LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_SIZE)
                .new_codec(),
        );

        let mut hello = Vec::with_capacity(64);
        hello.extend_from_slice(&self.public_key());
        hello.extend_from_slice(&server_public_key);
        framed.send(Bytes::from(hello)).await?;

        Ok(PeerConnection {
            framed,
            addr: addr.to_string(),
            server_public_key,
            client_public_key: self.public_key(),
            last_used: Instant::now(),
        })
    }
}

/// One framed session with a remote peer. Queries are strictly serial: the
/// registry never pipelines, which keeps request/response matching trivial.
pub struct PeerConnection {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    addr: String,
    server_public_key: [u8; 32],
    client_public_key: [u8; 32],
    last_used: Instant,
}

impl PeerConnection {
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_stale(&self) -> bool {
        self.last_used.elapsed() > STALE_AFTER
    }

    /// Re-dials the same endpoint, replacing the underlying stream.
    pub async fn reinit(&mut self) -> Result<()> {
        let stream = TcpStream::connect(&self.addr).await?;
        let mut framed = Framed::new(
            stream,
            LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_SIZE)
                .new_codec(),
        );

        let mut hello = Vec::with_capacity(64);
        hello.extend_from_slice(&self.client_public_key);
        hello.extend_from_slice(&self.server_public_key);
        framed.send(Bytes::from(hello)).await?;

        self.framed = framed;
        self.last_used = Instant::now();
        Ok(())
    }

    pub async fn ping(&mut self, timeout: Duration) -> Result<()> {
        let nonce = rand::random::<u64>();
        match self.query("ping", &Request::Ping { nonce }, timeout).await? {
            Response::Pong { nonce: answer } if answer == nonce => Ok(()),
            _ => Err(PeerError::UnexpectedResponse),
        }
    }

    /// Fetches the raw torrent-info bytes for the bag behind `overlay`.
    pub async fn get_torrent_info(
        &mut self,
        overlay: [u8; 32],
        timeout: Duration,
    ) -> Result<crate::proto::TorrentInfoContainer> {
        match self
            .query("get_torrent_info", &Request::GetTorrentInfo { overlay }, timeout)
            .await?
        {
            Response::TorrentInfo(container) => Ok(container),
            _ => Err(PeerError::UnexpectedResponse),
        }
    }

    /// Fetches one piece with its inclusion proof.
    pub async fn get_piece(
        &mut self,
        overlay: [u8; 32],
        piece_id: u64,
        timeout: Duration,
    ) -> Result<crate::proto::Piece> {
        match self
            .query("get_piece", &Request::GetPiece { overlay, piece_id }, timeout)
            .await?
        {
            Response::Piece(piece) => Ok(piece),
            _ => Err(PeerError::UnexpectedResponse),
        }
    }

    pub(crate) async fn query(
        &mut self,
        name: &'static str,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response> {
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, self.round_trip(request)).await;
        self.last_used = Instant::now();

        match result {
            Ok(Ok(response)) => {
                record_peer_query(name, "ok", started.elapsed());
                response.into_ok()
            }
            Ok(Err(err)) => {
                record_peer_query(name, "error", started.elapsed());
                Err(err)
            }
            Err(_) => {
                record_peer_query(name, "timeout", started.elapsed());
                Err(PeerError::Timeout)
            }
        }
    }

    async fn round_trip(&mut self, request: &Request) -> Result<Response> {
        let payload = bincode::serialize(request)?;
        self.framed.send(Bytes::from(payload)).await?;

        let frame = self.framed.next().await.ok_or(PeerError::Closed)??;
        if frame.len() > MAX_FRAME_SIZE {
            return Err(PeerError::Oversized(frame.len()));
        }

        Ok(bincode::deserialize(&frame)?)
    }
}
