//! # Packhorse Gateway
//!
//! Request-interception gateway standing between git/HTTP clients and the
//! upstream authorization backend. The gateway offloads the two
//! streaming-heavy workloads the backend cannot do efficiently itself:
//!
//! - **Git smart HTTP**: `info/refs` advertisement and stateless RPC are
//!   served by a local `git` subprocess after backend pre-authorization.
//! - **Upload interception**: large request bodies are persisted to
//!   scratch storage and digested, then the request is rewritten into
//!   lightweight metadata before travelling upstream.
//!
//! Every request is pre-authorized through the backend; denials are
//! relayed to the client byte for byte.

pub mod config;
pub mod observability;
pub mod proxy;
pub mod router;
pub mod upstream;
