use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloomstock_catalog::{Product, ProductKey};
use bloomstock_core::{Entity, StoreError, StoreResult, TicketId};

/// One sold line: a flattened snapshot of the product at sale time.
///
/// Lines are keyed by the immutable `(name, attribute)` composite, never by
/// the live catalog entity, so later quantity/price updates in the catalog
/// cannot rewrite ledger history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketLine {
    key: ProductKey,
    quantity: u32,
    unit_price: f64,
}

impl TicketLine {
    /// Snapshot a catalog product at sale time.
    pub fn snapshot(product: &Product, sold: u32) -> Self {
        Self {
            key: product.key(),
            quantity: sold,
            unit_price: product.price(),
        }
    }

    /// Rebuild a line from storage.
    pub fn rehydrate(key: ProductKey, quantity: u32, unit_price: f64) -> Self {
        Self {
            key,
            quantity,
            unit_price,
        }
    }

    pub fn key(&self) -> &ProductKey {
        &self.key
    }

    /// Quantity sold — independent of the product's current catalog stock.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// An immutable sales record. Once persisted it is never mutated or deleted —
/// the ticket collection is an append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    date: DateTime<Utc>,
    lines: Vec<TicketLine>,
    total_price: f64,
}

impl Ticket {
    /// Rebuild a ticket from storage.
    pub fn rehydrate(
        id: TicketId,
        date: DateTime<Utc>,
        lines: Vec<TicketLine>,
        total_price: f64,
    ) -> Self {
        Self {
            id,
            date,
            lines,
            total_price,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn lines(&self) -> &[TicketLine] {
        &self.lines
    }

    /// The caller-computed total, stored verbatim (never recomputed from the
    /// lines by the persistence layer).
    pub fn total_price(&self) -> f64 {
        self.total_price
    }
}

impl Entity for Ticket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A sale that has not been persisted yet, and therefore has no id.
///
/// The repository allocates the ticket identifier on insert. The total is
/// supplied by the caller; [`NewTicket::computed_total`] is a convenience for
/// callers that want the straightforward sum.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    date: DateTime<Utc>,
    lines: Vec<TicketLine>,
    total_price: f64,
}

impl NewTicket {
    pub fn new(date: DateTime<Utc>, total_price: f64) -> Self {
        Self {
            date,
            lines: Vec::new(),
            total_price,
        }
    }

    /// Add a sold quantity of a catalog product.
    ///
    /// Lines with the same `(name, attribute)` key merge by summing the sold
    /// quantity; the first-seen unit price wins.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` for a zero sold quantity.
    pub fn add_line(&mut self, product: &Product, sold: u32) -> StoreResult<()> {
        if sold == 0 {
            return Err(StoreError::invalid_input("sold quantity must be positive"));
        }
        let key = product.key();
        if let Some(existing) = self.lines.iter_mut().find(|l| l.key == key) {
            existing.quantity += sold;
        } else {
            self.lines.push(TicketLine::snapshot(product, sold));
        }
        Ok(())
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn lines(&self) -> &[TicketLine] {
        &self.lines
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    /// Sum of `unit_price × quantity` across the current lines.
    pub fn computed_total(&self) -> f64 {
        self.lines.iter().map(TicketLine::line_total).sum()
    }

    /// Attach the allocated identifier, producing the persisted ticket.
    pub fn with_id(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            date: self.date,
            lines: self.lines,
            total_price: self.total_price,
        }
    }
}

/// Aggregate ticket totals.
///
/// Pure read-side aggregation over any ticket subset — a free function rather
/// than a repository method so it composes with filtered views as well.
pub fn total_sales(tickets: &[Ticket]) -> f64 {
    tickets.iter().map(Ticket::total_price).sum()
}
