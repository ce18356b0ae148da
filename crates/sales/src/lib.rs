//! Sales ledger domain module.
//!
//! This crate contains the immutable ticket aggregate and read-side sales
//! aggregation, implemented purely as deterministic domain logic (no IO, no
//! storage).

pub mod ticket;

pub use ticket::{NewTicket, Ticket, TicketLine, total_sales};
