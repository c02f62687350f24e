use std::panic::Location;

use thiserror::Error;

/// `BitTorrent` Info Hash v1.
///
/// It identifies a swarm: the set of peers exchanging one torrent. It is the
/// primary key for every record kept by the monitor.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

pub const INFO_HASH_BYTES_LEN: usize = 20;

impl InfoHash {
    /// Returns the `InfoHash` internal byte array.
    #[must_use]
    pub fn bytes(&self) -> [u8; 20] {
        self.0
    }

    /// Returns the `InfoHash` as a lowercase hex string.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl std::str::FromStr for InfoHash {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 40 {
            return Err(ConversionError::InvalidLength {
                location: Location::caller(),
                message: format!("got {} characters, expected 40", s.len()),
            });
        }

        let mut hash = Self([0u8; INFO_HASH_BYTES_LEN]);
        for (i, pair) in s.as_bytes().chunks_exact(2).enumerate() {
            let high = hex_nibble(pair[0]);
            let low = hex_nibble(pair[1]);
            match (high, low) {
                (Some(high), Some(low)) => hash.0[i] = (high << 4) | low,
                _ => {
                    return Err(ConversionError::InvalidHexCharacter {
                        location: Location::caller(),
                        message: format!("near position {}", i * 2),
                    })
                }
            }
        }
        Ok(hash)
    }
}

impl std::convert::From<[u8; 20]> for InfoHash {
    fn from(val: [u8; 20]) -> Self {
        InfoHash(val)
    }
}

/// Errors that can occur when converting into an `InfoHash`.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// An infohash is 20 bytes, i.e. 40 hex characters.
    #[error("invalid infohash length: {message} {location}")]
    InvalidLength {
        location: &'static Location<'static>,
        message: String,
    },
    /// The string contains a non-hexadecimal character.
    #[error("invalid infohash character: {message} {location}")]
    InvalidHexCharacter {
        location: &'static Location<'static>,
        message: String,
    },
}

impl serde::ser::Serialize for InfoHash {
    fn serialize<S: serde::ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::de::Deserialize<'de> for InfoHash {
    fn deserialize<D: serde::de::Deserializer<'de>>(des: D) -> Result<Self, D::Error> {
        des.deserialize_str(InfoHashVisitor)
    }
}

struct InfoHashVisitor;

impl<'v> serde::de::Visitor<'v> for InfoHashVisitor {
    type Value = InfoHash;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "a 40 character long hash")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse::<InfoHash>().map_err(|_| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(v), &"a 40 character long hexadecimal string")
        })
    }
}
