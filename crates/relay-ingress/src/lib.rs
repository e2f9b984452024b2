//! HTTP ingress for webhook deliveries.
//!
//! Thin glue by design: decode, render, submit through the bridge, respond.
//! The one binding contract is the response policy: application-level
//! handling outcomes (unrecognized events, malformed payloads, delivery-state
//! errors) always answer 200 so webhook senders never retry them, and non-2xx
//! is reserved for the relay itself being broken.

pub mod ingress_routes;

pub use ingress_routes::{build_ingress_router, IngressState};
