//! Baseline inventory seeding.

use bloomstock_catalog::{Material, NewProduct};
use bloomstock_core::StoreResult;

/// Supplies the inventory loaded into an empty catalog at first run.
///
/// Injected into [`crate::ProductRepository::initialize`] so tests can seed
/// whatever they need (or nothing).
pub trait StockSeeder {
    fn initial_stock(&self) -> StoreResult<Vec<NewProduct>>;
}

/// The shop's default opening stock.
#[derive(Debug, Default)]
pub struct PrimaryStock;

impl StockSeeder for PrimaryStock {
    fn initial_stock(&self) -> StoreResult<Vec<NewProduct>> {
        Ok(vec![
            NewProduct::tree("Pine", 10, 20.0, 3.5)?,
            NewProduct::tree("Olive", 6, 45.0, 2.0)?,
            NewProduct::tree("Lemon", 4, 35.0, 1.5)?,
            NewProduct::flower("Rose", 50, 2.5, "red")?,
            NewProduct::flower("Tulip", 40, 1.8, "yellow")?,
            NewProduct::flower("Daisy", 60, 1.2, "white")?,
            NewProduct::decoration("Gnome", 12, 12.0, Material::Madera)?,
            NewProduct::decoration("Flamingo", 8, 9.5, Material::Plastico)?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomstock_catalog::ProductKind;

    #[test]
    fn primary_stock_covers_every_kind() {
        let stock = PrimaryStock.initial_stock().unwrap();
        for kind in [ProductKind::Tree, ProductKind::Flower, ProductKind::Decoration] {
            assert!(stock.iter().any(|p| p.kind() == kind));
        }
    }
}
