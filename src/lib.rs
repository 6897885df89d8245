//! A polling-mode implementation of the [Modbus](http://modbus.org/) protocol
//! for clients and servers.
//!
//! # Features
//!
//! * Panic-free parsing
//! * The full catalogue of public function codes (0x01–0x08, 0x0B, 0x0C,
//!   0x0F–0x11, 0x16–0x18), including exception responses
//! * Single-threaded cooperative scheduling: the entire engine is driven by
//!   repeated `process()` calls (server) or transaction helpers (client) and
//!   never blocks unless the underlying port does
//! * Works with blocking and non-blocking ports through the same API; a
//!   non-blocking port reports `Processing` and the caller simply polls again
//! * Multiple logical clients fairly sharing one port, with at most one
//!   in-flight transaction per port
//! * TCP server shell multiplexing many client sockets behind one device
//! * Observable lifecycle events (opened/closed/tx/rx/error/completed)
//!
//! # Supported modes
//!
//! The engine is transport-agnostic: serial, TCP socket, and TCP acceptor
//! drivers live behind the [`port::Port`] and [`server::Listener`] traits and
//! are supplied by the embedding application.
//!
//! # Example server tick loop
//!
//! ```no_run
//! use pollbus::prelude::*;
//!
//! struct Bench {
//!     holding: [u16; 16],
//! }
//!
//! impl Device for Bench {
//!     fn read_holding_registers(
//!         &mut self,
//!         _unit: u8,
//!         offset: u16,
//!         count: u16,
//!         values: &mut [u16],
//!     ) -> StatusCode {
//!         let start = offset as usize;
//!         let end = start + count as usize;
//!         match self.holding.get(start..end) {
//!             Some(regs) => {
//!                 values[..regs.len()].copy_from_slice(regs);
//!                 StatusCode::Good
//!             }
//!             None => StatusCode::BadIllegalDataAddress,
//!         }
//!     }
//! }
//!
//! fn run(port: Box<dyn Port>) {
//!     let device = Bench { holding: [0; 16] }.wrap();
//!     let mut server = ServerResource::new(port, device);
//!     loop {
//!         server.process();
//!     }
//! }
//! ```

#![deny(
    non_camel_case_types,
    non_shorthand_field_patterns,
    non_snake_case,
    non_upper_case_globals,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_comparisons,
    unused_import_braces,
    unused_qualifications,
    clippy::all
)]
#![forbid(unsafe_code, while_true, bare_trait_objects)]

/// client API: transaction helpers and the shared-port multiplexer
pub mod client;
/// public constant values related to the Modbus specification
pub mod constants;
/// control of how much decoded traffic is logged
pub mod decode;
/// application back-end invoked by the server for each request
pub mod device;
/// exception codes defined in the Modbus specification
pub mod exception;
/// framed (unit, function, body) storage used at the port boundary
pub mod frame;
/// abstract duplex byte port with step semantics
pub mod port;
/// prelude used to include all of the API types
pub mod prelude;
/// server API: per-connection state machine and the TCP server shell
pub mod server;
/// lifecycle signal subscription and delivery
pub mod signal;
/// universal status code returned by every engine operation
pub mod status;
/// small public types shared between client and server
pub mod types;
/// bitset selecting which unit ids a server accepts
pub mod unit_map;

// internal modules
mod codec;
mod util;
