//! The subset of the KRPC wire format (BEP 5) needed for `get_peers`
//! lookups: the outgoing query, the response envelope and the compact
//! address encodings. IPv4 only, like the rest of the lookup.
use std::net::{Ipv4Addr, SocketAddrV4};

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

#[derive(Serialize, Debug)]
struct GetPeersQuery {
    a: GetPeersArgs,
    q: String,
    t: ByteBuf,
    y: String,
}

#[derive(Serialize, Debug)]
struct GetPeersArgs {
    id: ByteBuf,
    info_hash: ByteBuf,
}

/// It encodes one `get_peers` query.
///
/// # Panics
///
/// Will panic if the message cannot be bencoded, which cannot happen for
/// this fixed shape.
#[must_use]
pub fn get_peers(node_id: &[u8; 20], info_hash: &[u8; 20], transaction_id: u16) -> Vec<u8> {
    let query = GetPeersQuery {
        a: GetPeersArgs {
            id: ByteBuf::from(node_id.to_vec()),
            info_hash: ByteBuf::from(info_hash.to_vec()),
        },
        q: "get_peers".to_string(),
        t: ByteBuf::from(transaction_id.to_be_bytes().to_vec()),
        y: "q".to_string(),
    };

    serde_bencode::to_bytes(&query).expect("a get_peers query should be bencodable")
}

/// An incoming KRPC message. Only the response body matters to the lookup;
/// queries and errors from other nodes read as messages without one.
#[derive(Deserialize, Debug)]
pub struct Message {
    #[serde(default)]
    pub r: Option<ResponseBody>,
}

/// The response body of a `get_peers` answer: peers for the swarm, closer
/// nodes to ask, or both.
#[derive(Deserialize, Debug)]
pub struct ResponseBody {
    #[serde(default)]
    pub values: Option<Vec<ByteBuf>>,
    #[serde(default)]
    pub nodes: Option<ByteBuf>,
}

/// It parses one incoming packet.
///
/// # Errors
///
/// Will return an error if the packet is not a bencoded dictionary.
pub fn parse_message(bytes: &[u8]) -> Result<Message, serde_bencode::Error> {
    serde_bencode::from_bytes(bytes)
}

/// It decodes the 6-byte compact peer entries of a `values` list, dropping
/// entries with the wrong length.
#[must_use]
pub fn compact_peers(values: &[ByteBuf]) -> Vec<SocketAddrV4> {
    values
        .iter()
        .filter(|value| value.len() == 6)
        .map(|value| decode_compact_addr(&value[..]))
        .collect()
}

/// It decodes the 26-byte compact node entries of a `nodes` string: a
/// 20-byte node id followed by a 6-byte address. A trailing partial entry is
/// dropped.
#[must_use]
pub fn compact_nodes(nodes: &[u8]) -> Vec<SocketAddrV4> {
    nodes.chunks_exact(26).map(|chunk| decode_compact_addr(&chunk[20..])).collect()
}

fn decode_compact_addr(bytes: &[u8]) -> SocketAddrV4 {
    SocketAddrV4::new(
        Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
        u16::from_be_bytes([bytes[4], bytes[5]]),
    )
}
