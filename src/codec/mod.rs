//! Wire encodings of the URL scheme.

/// MD5 checksums, their four-segment packing and reversed hex tokens.
pub mod checksum;
/// ISO-8859-1 label payloads carried as hex.
pub mod payload;
