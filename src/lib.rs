//! # gridlink_iec104
//!
//! IEC 60870-5-104 telecontrol protocol stack.
//!
//! The crate implements the protocol engine of IEC 104: APCI framing with
//! strict validation, a typed ASDU codec behind an extensible type registry,
//! the session state machine with the STARTDT/STOPDT/TESTFR handshakes and
//! the T0–T3 timer regime, and k/w flow control with cumulative
//! acknowledgement.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gridlink_iec104::{open_client, AllowAll, Asdu, SessionEvent, SessionParameters};
//!
//! #[tokio::main]
//! async fn main() -> gridlink_iec104::Result<()> {
//!     let addr = "192.168.1.100:2404".parse().unwrap();
//!     let mut session =
//!         open_client(addr, SessionParameters::default(), Arc::new(AllowAll)).await?;
//!
//!     // request a station interrogation
//!     session.submit(Asdu::interrogation_command(1, 20)).await?;
//!
//!     loop {
//!         match session.receive().await {
//!             SessionEvent::Asdu(asdu) => println!("{:?}", asdu),
//!             SessionEvent::Unhandled { type_id, .. } => println!("skipped type {type_id}"),
//!             SessionEvent::Terminated { error } => break Ok(error.map_or(Ok(()), Err)?),
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`codec`]: stateless frame codec (start octet, length, I/S/U control
//!   fields) for `tokio_util::codec::Framed`.
//! - [`registry`]: type-id keyed element codecs; decodes information objects
//!   with the exact-consumption discipline.
//! - [`session`]: one cooperative task per connection owning the windows and
//!   timers; callers talk to it through the [`Session`] handle.
//! - [`policy`]: synchronous admission hooks for deployments.
//!
//! Frames travel: bytes → frame codec → session task → registry → caller.
//! Outbound: [`Session::submit`] → registry → window admission → frame codec.

pub mod client;
pub mod codec;
pub mod error;
pub mod policy;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

pub use client::{open_client, open_client_with_registry, DEFAULT_PORT};
pub use codec::{Apdu, ApduCodec};
pub use error::{Error, Result};
pub use policy::{AllowAll, FrameKind, FrameMeta, IpAllowlist, SecurityPolicy};
pub use registry::{TypeHandler, TypeRegistry};
pub use server::{serve, serve_on, serve_with_registry};
pub use session::{
    AckPolicy, Session, SessionEvent, SessionParameters, SessionRole, SessionState,
};
pub use types::*;
