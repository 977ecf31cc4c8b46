//! Dimension enums of the conformance matrix.
//!
//! Every enum carries its wire number, its canonical upper-snake name (used in
//! test case names and in JSON), and an `ALL` table of known values that
//! excludes the unspecified zero value.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! conformance_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            unspecified: $unspec:ident = $unspec_wire:literal,
            $( $variant:ident = $num:literal => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        $vis enum $name {
            #[default]
            #[serde(rename = $unspec_wire)]
            $unspec,
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every known value, in wire-number order, excluding the unspecified value.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire number of this value.
            #[must_use]
            pub const fn number(self) -> i32 {
                match self {
                    Self::$unspec => 0,
                    $(Self::$variant => $num,)+
                }
            }

            /// Canonical name, e.g. `PROTOCOL_CONNECT`.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    Self::$unspec => $unspec_wire,
                    $(Self::$variant => $wire,)+
                }
            }

            /// Whether this is the unspecified zero value.
            #[must_use]
            pub const fn is_unspecified(self) -> bool {
                matches!(self, Self::$unspec)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

conformance_enum! {
    /// RPC protocol spoken between client and server.
    pub enum Protocol {
        unspecified: Unspecified = "PROTOCOL_UNSPECIFIED",
        Connect = 1 => "PROTOCOL_CONNECT",
        Grpc = 2 => "PROTOCOL_GRPC",
        GrpcWeb = 3 => "PROTOCOL_GRPC_WEB",
    }
}

conformance_enum! {
    /// HTTP version used for the transport.
    pub enum HttpVersion {
        unspecified: Unspecified = "HTTP_VERSION_UNSPECIFIED",
        Http1 = 1 => "HTTP_VERSION_1",
        Http2 = 2 => "HTTP_VERSION_2",
        Http3 = 3 => "HTTP_VERSION_3",
    }
}

conformance_enum! {
    /// Message codec.
    pub enum Codec {
        unspecified: Unspecified = "CODEC_UNSPECIFIED",
        Proto = 1 => "CODEC_PROTO",
        Json = 2 => "CODEC_JSON",
        Text = 3 => "CODEC_TEXT",
    }
}

conformance_enum! {
    /// Message compression.
    pub enum Compression {
        unspecified: Unspecified = "COMPRESSION_UNSPECIFIED",
        Identity = 1 => "COMPRESSION_IDENTITY",
        Gzip = 2 => "COMPRESSION_GZIP",
        Brotli = 3 => "COMPRESSION_BR",
        Zstd = 4 => "COMPRESSION_ZSTD",
        Deflate = 5 => "COMPRESSION_DEFLATE",
        Snappy = 6 => "COMPRESSION_SNAPPY",
    }
}

conformance_enum! {
    /// Shape of an RPC.
    pub enum StreamType {
        unspecified: Unspecified = "STREAM_TYPE_UNSPECIFIED",
        Unary = 1 => "STREAM_TYPE_UNARY",
        ClientStream = 2 => "STREAM_TYPE_CLIENT_STREAM",
        ServerStream = 3 => "STREAM_TYPE_SERVER_STREAM",
        HalfDuplexBidiStream = 4 => "STREAM_TYPE_HALF_DUPLEX_BIDI_STREAM",
        FullDuplexBidiStream = 5 => "STREAM_TYPE_FULL_DUPLEX_BIDI_STREAM",
    }
}

conformance_enum! {
    /// Which side of the harness a suite is meant for.
    pub enum TestMode {
        unspecified: Unspecified = "TEST_MODE_UNSPECIFIED",
        Client = 1 => "TEST_MODE_CLIENT",
        Server = 2 => "TEST_MODE_SERVER",
    }
}

conformance_enum! {
    /// How a suite treats the Connect protocol version header/query param.
    pub enum ConnectVersionMode {
        unspecified: Unspecified = "CONNECT_VERSION_MODE_UNSPECIFIED",
        Require = 1 => "CONNECT_VERSION_MODE_REQUIRE",
        Ignore = 2 => "CONNECT_VERSION_MODE_IGNORE",
    }
}

conformance_enum! {
    /// RPC status code.
    pub enum Code {
        unspecified: Unspecified = "CODE_UNSPECIFIED",
        Canceled = 1 => "CODE_CANCELED",
        Unknown = 2 => "CODE_UNKNOWN",
        InvalidArgument = 3 => "CODE_INVALID_ARGUMENT",
        DeadlineExceeded = 4 => "CODE_DEADLINE_EXCEEDED",
        NotFound = 5 => "CODE_NOT_FOUND",
        AlreadyExists = 6 => "CODE_ALREADY_EXISTS",
        PermissionDenied = 7 => "CODE_PERMISSION_DENIED",
        ResourceExhausted = 8 => "CODE_RESOURCE_EXHAUSTED",
        FailedPrecondition = 9 => "CODE_FAILED_PRECONDITION",
        Aborted = 10 => "CODE_ABORTED",
        OutOfRange = 11 => "CODE_OUT_OF_RANGE",
        Unimplemented = 12 => "CODE_UNIMPLEMENTED",
        Internal = 13 => "CODE_INTERNAL",
        Unavailable = 14 => "CODE_UNAVAILABLE",
        DataLoss = 15 => "CODE_DATA_LOSS",
        Unauthenticated = 16 => "CODE_UNAUTHENTICATED",
    }
}

impl StreamType {
    /// Canonical method name on the conformance service for this stream type.
    ///
    /// Both bidi variants share the `BidiStream` method.
    #[must_use]
    pub const fn method_name(self) -> Option<&'static str> {
        match self {
            Self::Unary => Some("Unary"),
            Self::ClientStream => Some("ClientStream"),
            Self::ServerStream => Some("ServerStream"),
            Self::HalfDuplexBidiStream | Self::FullDuplexBidiStream => Some("BidiStream"),
            Self::Unspecified => None,
        }
    }
}
