//! The `meta` entry: a one-field protobuf version header.

use prost::Message;

/// Header version of packages whose database entry is `collection.anki21`.
pub const LEGACY_V2: i32 = 2;

/// The `meta` message. Field 1 holds the package version.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct PackageMetadata {
    /// Package format version.
    #[prost(int32, tag = "1")]
    pub version: i32,
}

impl PackageMetadata {
    /// The header written by this crate.
    #[must_use]
    pub const fn legacy_v2() -> Self {
        Self { version: LEGACY_V2 }
    }

    /// Decodes a header; an empty buffer decodes to version 0.
    ///
    /// # Errors
    ///
    /// Returns the protobuf decode error for malformed bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        Self::decode(bytes)
    }

    /// Encodes the header.
    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Returns true if this crate can read the package.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.version == LEGACY_V2
    }
}
