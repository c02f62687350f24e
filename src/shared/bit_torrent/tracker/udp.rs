//! UDP tracker scrape client (BEP 15).
//!
//! One scrape is two request/response round trips on a fresh socket: a
//! connect request that yields a connection id, then the scrape request
//! itself. Every socket operation is bounded by the configured timeout.
use std::io::Cursor;
use std::net::Ipv4Addr;
use std::time::Duration;

use aquatic_udp_protocol::{ConnectRequest, Request, Response, ScrapeRequest, TransactionId};
use swarmwatch_primitives::info_hash::InfoHash;
use tokio::net::UdpSocket;
use tokio::time;
use tracing::debug;
use url::Url;

use super::Error;
use crate::core::scrape::TrackerScrape;

/// Maximum size of an incoming scrape response packet.
const MAX_PACKET_SIZE: usize = 8192;

/// UDP tracker scrape client.
pub struct Client {
    timeout: Duration,
    bind_port: u16,
}

impl Client {
    #[must_use]
    pub fn new(timeout: Duration, bind_port: u16) -> Self {
        Self { timeout, bind_port }
    }

    /// It scrapes one tracker for one swarm.
    ///
    /// # Errors
    ///
    /// Will return an error if the announce URL has no host or port, if the
    /// tracker cannot be reached within the timeout, or if it answers with
    /// anything other than a scrape response.
    pub async fn scrape(&self, info_hash: &InfoHash, announce: &Url) -> Result<TrackerScrape, Error> {
        let host = announce.host_str().ok_or_else(|| Error::UnscrapableAnnounce {
            reason: "no host in the announce URL".to_string(),
        })?;
        let port = announce.port().ok_or_else(|| Error::UnscrapableAnnounce {
            reason: "no port in the announce URL".to_string(),
        })?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.bind_port))
            .await
            .map_err(|source| Error::Io { source })?;
        socket
            .connect((host, port))
            .await
            .map_err(|source| Error::Io { source })?;

        let transaction_id = TransactionId(rand::random::<i32>().into());

        debug!("Connecting to UDP tracker {announce}");

        self.send(&socket, ConnectRequest { transaction_id }.into()).await?;

        let connect = match self.receive(&socket).await? {
            Response::Connect(connect) if connect.transaction_id == transaction_id => connect,
            Response::Error(error) => {
                return Err(Error::TrackerFailure {
                    reason: error.message.to_string(),
                })
            }
            _ => {
                return Err(Error::UnexpectedResponse {
                    reason: "expected a connect response".to_string(),
                })
            }
        };

        debug!("Scraping UDP tracker {announce}");

        let scrape_request = ScrapeRequest {
            connection_id: connect.connection_id,
            transaction_id,
            info_hashes: vec![aquatic_udp_protocol::InfoHash(info_hash.bytes())],
        };

        self.send(&socket, scrape_request.into()).await?;

        match self.receive(&socket).await? {
            Response::Scrape(scrape) => {
                let stats = scrape.torrent_stats.first().ok_or_else(|| Error::UnexpectedResponse {
                    reason: "empty scrape response".to_string(),
                })?;

                Ok(TrackerScrape {
                    seeders: i64::from(stats.seeders.0.get()),
                    leechers: i64::from(stats.leechers.0.get()),
                    completed: i64::from(stats.completed.0.get()),
                })
            }
            Response::Error(error) => Err(Error::TrackerFailure {
                reason: error.message.to_string(),
            }),
            _ => Err(Error::UnexpectedResponse {
                reason: "expected a scrape response".to_string(),
            }),
        }
    }

    async fn send(&self, socket: &UdpSocket, request: Request) -> Result<(), Error> {
        let request_buffer = vec![0u8; MAX_PACKET_SIZE];
        let mut cursor = Cursor::new(request_buffer);

        request.write_bytes(&mut cursor).map_err(|source| Error::Io { source })?;

        #[allow(clippy::cast_possible_truncation)]
        let position = cursor.position() as usize;
        let request_data = &cursor.get_ref()[..position];

        match time::timeout(self.timeout, socket.send(request_data)).await {
            Ok(sent) => {
                sent.map_err(|source| Error::Io { source })?;
                Ok(())
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn receive(&self, socket: &UdpSocket) -> Result<Response, Error> {
        let mut response_buffer = [0u8; MAX_PACKET_SIZE];

        let payload_size = match time::timeout(self.timeout, socket.recv(&mut response_buffer)).await {
            Ok(received) => received.map_err(|source| Error::Io { source })?,
            Err(_) => return Err(Error::Timeout),
        };

        Response::parse_bytes(&response_buffer[..payload_size], true).map_err(|err| Error::UnexpectedResponse {
            reason: format!("unparsable packet: {err}"),
        })
    }
}
