//! Mainline DHT peer lookup (BEP 5).
//!
//! The client runs a bounded iterative `get_peers` lookup: it queries the
//! configured bootstrap routers, follows the closer nodes they return for a
//! few rounds, and counts the distinct peer addresses reported for the
//! swarm. The whole lookup is bounded by the configured timeout; running
//! out of time or nodes simply ends the search with the peers seen so far.
//!
//! This is the production implementation of the core's
//! [`DhtSearcher`](crate::core::scrape::DhtSearcher) capability.
pub mod krpc;

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use swarmwatch_primitives::info_hash::InfoHash;
use tokio::net::{self, UdpSocket};
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use crate::core::scrape::{DhtScrape, DhtSearcher, ScrapeError};

/// Rounds of the iterative lookup: the routers plus up to three hops of
/// closer nodes.
const MAX_ROUNDS: usize = 4;

/// Nodes queried per round.
const NODES_PER_ROUND: usize = 16;

/// Maximum size of an incoming KRPC packet.
const MAX_PACKET_SIZE: usize = 2048;

/// Error returned by the DHT lookup client.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not bind a lookup socket: {source}")]
    Bind { source: std::io::Error },

    #[error("no DHT routers could be resolved")]
    NoRouters,
}

/// DHT peer lookup client.
pub struct Client {
    routers: Vec<String>,
    timeout: Duration,
    bind_port: u16,
}

impl Client {
    #[must_use]
    pub fn new(routers: Vec<String>, timeout: Duration, bind_port: u16) -> Self {
        Self {
            routers,
            timeout,
            bind_port,
        }
    }

    /// It counts the distinct peers reported for a swarm within one
    /// time-bounded lookup.
    ///
    /// # Errors
    ///
    /// Will return an error if no lookup socket can be bound or no router
    /// resolves. An exhausted timeout is not an error: the count seen so
    /// far is the result.
    pub async fn lookup(&self, info_hash: &InfoHash) -> Result<u64, Error> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.bind_port))
            .await
            .map_err(|source| Error::Bind { source })?;

        let mut frontier: Vec<SocketAddr> = Vec::new();
        for router in &self.routers {
            match net::lookup_host(router.as_str()).await {
                Ok(addrs) => frontier.extend(addrs.filter(SocketAddr::is_ipv4)),
                Err(err) => warn!("Could not resolve DHT router {router}: {err}"),
            }
        }

        if frontier.is_empty() {
            return Err(Error::NoRouters);
        }

        let node_id: [u8; 20] = rand::random();
        let mut transaction_id: u16 = rand::random();

        let deadline = Instant::now() + self.timeout;
        let round_window = self.timeout / MAX_ROUNDS as u32;

        let mut queried: HashSet<SocketAddr> = HashSet::new();
        let mut peers: HashSet<SocketAddrV4> = HashSet::new();

        for _round in 0..MAX_ROUNDS {
            let batch: Vec<SocketAddr> = frontier
                .iter()
                .copied()
                .filter(|addr| !queried.contains(addr))
                .take(NODES_PER_ROUND)
                .collect();
            frontier.clear();

            if batch.is_empty() || Instant::now() >= deadline {
                break;
            }

            for addr in batch {
                transaction_id = transaction_id.wrapping_add(1);
                let query = krpc::get_peers(&node_id, &info_hash.bytes(), transaction_id);

                match socket.send_to(&query, addr).await {
                    Ok(_) => {
                        queried.insert(addr);
                    }
                    Err(err) => debug!("Could not query DHT node {addr}: {err}"),
                }
            }

            let round_deadline = deadline.min(Instant::now() + round_window);
            self.collect_responses(&socket, round_deadline, &queried, &mut peers, &mut frontier)
                .await;
        }

        debug!("DHT lookup for {info_hash} found {} distinct peers", peers.len());

        Ok(peers.len() as u64)
    }

    async fn collect_responses(
        &self,
        socket: &UdpSocket,
        round_deadline: Instant,
        queried: &HashSet<SocketAddr>,
        peers: &mut HashSet<SocketAddrV4>,
        frontier: &mut Vec<SocketAddr>,
    ) {
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            let remaining = round_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }

            let received = match time::timeout(remaining, socket.recv_from(&mut buffer)).await {
                Ok(Ok((size, _from))) => size,
                Ok(Err(err)) => {
                    debug!("Lookup socket error: {err}");
                    return;
                }
                Err(_) => return,
            };

            let Ok(message) = krpc::parse_message(&buffer[..received]) else {
                continue;
            };

            let Some(body) = message.r else {
                continue;
            };

            if let Some(values) = &body.values {
                peers.extend(krpc::compact_peers(values));
            }

            if let Some(nodes) = &body.nodes {
                frontier.extend(
                    krpc::compact_nodes(nodes)
                        .into_iter()
                        .map(SocketAddr::V4)
                        .filter(|addr| !queried.contains(addr)),
                );
            }
        }
    }
}

#[async_trait]
impl DhtSearcher for Client {
    async fn count_peers(&self, info_hash: &InfoHash) -> Result<DhtScrape, ScrapeError> {
        let peers = self
            .lookup(info_hash)
            .await
            .map_err(|err| ScrapeError::new(err.to_string()))?;

        Ok(DhtScrape { peers })
    }
}
