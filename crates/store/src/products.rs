//! Catalog repository: product CRUD and typed queries over the document
//! store.

use std::cmp::Reverse;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use bloomstock_catalog::{NewProduct, Product, ProductKey, ProductKind};
use bloomstock_core::{Entity, ProductId, StoreError, StoreResult};

use crate::allocator::{IdAllocator, ScanMaxAllocator};
use crate::codec::{
    self, FIELD_PRICE, FIELD_PRODUCT_ID, FIELD_QUANTITY,
};
use crate::document::{Document, DocumentStore, Filter};
use crate::seed::StockSeeder;

/// Collection holding one document per catalog line.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Maps catalog products to/from documents and performs CRUD against the
/// products collection.
///
/// Identifier assignment uses the scan-max policy: products are added rarely
/// relative to reads, so simplicity wins over throughput. See
/// [`ScanMaxAllocator`] for the single-writer caveat.
pub struct ProductRepository {
    store: Arc<dyn DocumentStore>,
}

impl ProductRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn allocator(&self) -> ScanMaxAllocator {
        ScanMaxAllocator::new(self.store.clone(), PRODUCTS_COLLECTION, FIELD_PRODUCT_ID)
    }

    /// Look up one product by exact identifier match.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no document carries the identifier.
    pub fn product(&self, id: ProductId) -> StoreResult<Product> {
        let mut filter = Filter::new();
        filter.insert(FIELD_PRODUCT_ID.to_string(), Value::from(id.value()));

        let document = self
            .store
            .find_one(PRODUCTS_COLLECTION, &filter)?
            .ok_or(StoreError::NotFound)?;
        codec::decode_product(&document)
    }

    /// The whole catalog: variants grouped in descending kind order
    /// (decorations, flowers, trees), oldest first within a group.
    pub fn all_products(&self) -> StoreResult<Vec<Product>> {
        let documents = self.store.find_all(PRODUCTS_COLLECTION)?;
        let mut products = documents
            .iter()
            .map(codec::decode_product)
            .collect::<StoreResult<Vec<Product>>>()?;
        products.sort_by_key(|p| (Reverse(p.kind()), *p.id()));
        Ok(products)
    }

    /// The product with the maximum identifier, if any.
    pub fn last_product(&self) -> StoreResult<Option<Product>> {
        let products = self.all_products()?;
        Ok(products.into_iter().max_by_key(|p| *p.id()))
    }

    pub fn trees(&self) -> StoreResult<Vec<Product>> {
        self.by_kind(ProductKind::Tree)
    }

    pub fn flowers(&self) -> StoreResult<Vec<Product>> {
        self.by_kind(ProductKind::Flower)
    }

    pub fn decorations(&self) -> StoreResult<Vec<Product>> {
        self.by_kind(ProductKind::Decoration)
    }

    fn by_kind(&self, kind: ProductKind) -> StoreResult<Vec<Product>> {
        let mut products = self.all_products()?;
        products.retain(|p| p.kind() == kind);
        Ok(products)
    }

    /// Persist a new catalog line, assigning the next identifier.
    ///
    /// Returns the persisted product carrying its allocated id.
    pub fn add_product(&self, new_product: NewProduct) -> StoreResult<Product> {
        let id = ProductId::new(self.allocator().allocate_next()?);
        let product = new_product.with_id(id);
        self.store
            .insert_one(PRODUCTS_COLLECTION, codec::encode_product(&product))?;
        info!(product_id = %id, name = product.name(), kind = %product.kind(), "product added");
        Ok(product)
    }

    /// Overwrite quantity and price on the stored document matching this
    /// product's `(name, attribute)` key. No other field is touched.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no document matches the key.
    pub fn update_product(&self, product: &Product) -> StoreResult<()> {
        let filter = codec::key_filter(&product.key());
        let mut set = Document::new();
        set.insert(FIELD_QUANTITY.to_string(), Value::from(product.quantity()));
        set.insert(FIELD_PRICE.to_string(), Value::from(product.price()));

        let matched = self.store.update_one(PRODUCTS_COLLECTION, &filter, &set)?;
        if !matched {
            return Err(StoreError::NotFound);
        }
        info!(name = product.name(), quantity = product.quantity(), "stock updated");
        Ok(())
    }

    /// Remove the stored document matching the `(name, attribute)` key.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no document matches the key.
    pub fn delete_product(&self, key: &ProductKey) -> StoreResult<()> {
        let filter = codec::key_filter(key);
        let matched = self.store.delete_one(PRODUCTS_COLLECTION, &filter)?;
        if !matched {
            return Err(StoreError::NotFound);
        }
        info!(name = key.name(), "product deleted");
        Ok(())
    }

    /// Seed baseline inventory, once: a no-op unless the collection is empty.
    pub fn initialize(&self, seeder: &dyn StockSeeder) -> StoreResult<()> {
        if !self.store.find_all(PRODUCTS_COLLECTION)?.is_empty() {
            debug!("catalog already populated, skipping seed");
            return Ok(());
        }
        let stock = seeder.initial_stock()?;
        let count = stock.len();
        for new_product in stock {
            self.add_product(new_product)?;
        }
        info!(count, "seeded baseline inventory");
        Ok(())
    }
}
