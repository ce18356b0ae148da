//! Ledger repository: ticket persistence and reads over the document store.

use std::sync::Arc;

use tracing::info;

use bloomstock_core::{Entity, StoreResult, TicketId};
use bloomstock_sales::{NewTicket, Ticket};

use crate::allocator::{CounterAllocator, IdAllocator};
use crate::codec;
use crate::document::DocumentStore;

/// Collection holding one document per sale.
pub const TICKETS_COLLECTION: &str = "tickets";

/// Collection holding singleton counter documents.
pub const COUNTERS_COLLECTION: &str = "counters";

/// Key of the ticket-id counter document.
pub const TICKET_COUNTER_ID: &str = "ticketID";

/// Maps tickets to/from documents and appends to the sales ledger.
///
/// Ticket identifiers come from the atomic-counter policy only: the counter
/// document's increment-and-fetch is indivisible at the store, so the
/// sequence stays dense and ordered even across concurrent callers. Tickets
/// are never mutated or deleted here — the collection is append-only history.
pub struct TicketRepository {
    store: Arc<dyn DocumentStore>,
}

impl TicketRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn allocator(&self) -> CounterAllocator {
        CounterAllocator::new(self.store.clone(), COUNTERS_COLLECTION, TICKET_COUNTER_ID)
    }

    /// The next ticket identifier in the sequence.
    pub fn next_ticket_id(&self) -> StoreResult<TicketId> {
        Ok(TicketId::new(self.allocator().allocate_next()?))
    }

    /// The ticket with the maximum identifier, if any.
    pub fn last_ticket(&self) -> StoreResult<Option<Ticket>> {
        let tickets = self.all_tickets()?;
        Ok(tickets.into_iter().max_by_key(|t| *t.id()))
    }

    /// Persist one completed sale, assigning its ticket identifier.
    ///
    /// Line items are stored as flattened snapshots, not live references to
    /// catalog products; the caller-computed total is stored verbatim.
    pub fn new_ticket(&self, new_ticket: NewTicket) -> StoreResult<Ticket> {
        let id = self.next_ticket_id()?;
        let ticket = new_ticket.with_id(id);
        self.store
            .insert_one(TICKETS_COLLECTION, codec::encode_ticket(&ticket))?;
        info!(
            ticket_id = %id,
            lines = ticket.lines().len(),
            total = ticket.total_price(),
            "ticket recorded"
        );
        Ok(ticket)
    }

    /// All stored tickets, decoded in store order.
    pub fn all_tickets(&self) -> StoreResult<Vec<Ticket>> {
        let documents = self.store.find_all(TICKETS_COLLECTION)?;
        documents.iter().map(codec::decode_ticket).collect()
    }
}
