//! Binary encoded-length model for conformance messages.
//!
//! Sizes follow proto3 binary encoding: implicit-presence scalars are omitted
//! when zero, explicit-presence fields are emitted whenever set, and every
//! length-delimited field costs `key + varint(len) + len`. Only lengths are
//! modelled here; encoding itself belongs to the wire codec.

/// Types whose binary encoded length is known.
pub trait EncodedLen {
    /// Number of bytes this message occupies when encoded.
    fn encoded_len(&self) -> usize;
}

/// Bytes needed to encode `value` as a varint.
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

#[must_use]
pub const fn key_len(tag: u32) -> usize {
    varint_len((tag as u64) << 3)
}

/// Cost of a length-delimited field whose body is `body_len` bytes.
#[must_use]
pub const fn delimited_len(tag: u32, body_len: usize) -> usize {
    key_len(tag) + varint_len(body_len as u64) + body_len
}

/// Implicit-presence bytes/string field.
#[must_use]
pub const fn bytes_len(tag: u32, value: &[u8]) -> usize {
    if value.is_empty() {
        0
    } else {
        delimited_len(tag, value.len())
    }
}

/// Explicit-presence bytes/string field (emitted even when empty).
#[must_use]
pub fn optional_bytes_len(tag: u32, value: Option<&[u8]>) -> usize {
    value.map_or(0, |bytes| delimited_len(tag, bytes.len()))
}

/// Implicit-presence unsigned varint field.
#[must_use]
pub const fn uint_len(tag: u32, value: u64) -> usize {
    if value == 0 {
        0
    } else {
        key_len(tag) + varint_len(value)
    }
}

/// Explicit-presence unsigned varint field.
#[must_use]
pub fn optional_uint_len(tag: u32, value: Option<u64>) -> usize {
    value.map_or(0, |v| key_len(tag) + varint_len(v))
}

#[must_use]
pub const fn bool_len(tag: u32, value: bool) -> usize {
    if value { key_len(tag) + 1 } else { 0 }
}

/// Enum field; negative values are never produced by this model.
#[must_use]
pub const fn enum_len(tag: u32, number: i32) -> usize {
    uint_len(tag, number as u64)
}

/// Singular sub-message field.
#[must_use]
pub fn message_len<M: EncodedLen>(tag: u32, value: Option<&M>) -> usize {
    value.map_or(0, |msg| delimited_len(tag, msg.encoded_len()))
}

/// Repeated sub-message field.
#[must_use]
pub fn repeated_message_len<M: EncodedLen>(tag: u32, values: &[M]) -> usize {
    values
        .iter()
        .map(|msg| delimited_len(tag, msg.encoded_len()))
        .sum()
}

/// Repeated bytes or string field; empty elements still cost a key and a length.
#[must_use]
pub fn repeated_bytes_len<T: AsRef<[u8]>>(tag: u32, values: &[T]) -> usize {
    values
        .iter()
        .map(|v| delimited_len(tag, v.as_ref().len()))
        .sum()
}

/// Length of a `google.protobuf.Any` wrapping a message of `value_len` bytes.
#[must_use]
pub const fn any_len(type_url: &str, value_len: usize) -> usize {
    let url = if type_url.is_empty() {
        0
    } else {
        delimited_len(1, type_url.len())
    };
    let value = if value_len == 0 {
        0
    } else {
        delimited_len(2, value_len)
    };
    url + value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(16_383), 2);
        assert_eq!(varint_len(16_384), 3);
        assert_eq!(varint_len(u64::MAX), 10);
    }

    #[test]
    fn delimited_field_grows_by_two_at_length_boundary() {
        // 127 -> 128 bytes of body pushes the length prefix from 1 to 2 bytes.
        assert_eq!(delimited_len(2, 127), 1 + 1 + 127);
        assert_eq!(delimited_len(2, 128), 1 + 2 + 128);
    }

    #[test]
    fn implicit_and_explicit_presence() {
        assert_eq!(bytes_len(1, b""), 0);
        assert_eq!(optional_bytes_len(1, Some(b"")), 2);
        assert_eq!(uint_len(3, 0), 0);
        assert_eq!(optional_uint_len(3, Some(0)), 2);
        assert_eq!(bool_len(2, true), 2);
    }

    fn encode_varint(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    proptest::proptest! {
        #[test]
        fn varint_len_matches_encoding(value in proptest::prelude::any::<u64>()) {
            proptest::prop_assert_eq!(varint_len(value), encode_varint(value).len());
        }

        #[test]
        fn delimited_len_is_monotonic(len in 0usize..1_000_000) {
            proptest::prop_assert!(delimited_len(2, len + 1) > delimited_len(2, len));
        }
    }
}
