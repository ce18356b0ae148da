use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bloomstock_core::{Entity, ProductId, StoreError, StoreResult, ValueObject};

/// Product subtype discriminant.
///
/// The stored `type` tag is authoritative when rehydrating a document: the
/// decoder branches on it and a tag outside this set is a decode failure,
/// never a silent default.
///
/// Declaration order matters: catalog listings sort by *descending* kind
/// (decorations first, then flowers, then trees), ascending id within a kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductKind {
    Tree,
    Flower,
    Decoration,
}

impl ProductKind {
    /// The tag written into the document's `type` field.
    pub fn as_tag(&self) -> &'static str {
        match self {
            ProductKind::Tree => "TREE",
            ProductKind::Flower => "FLOWER",
            ProductKind::Decoration => "DECORATION",
        }
    }
}

impl core::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for ProductKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TREE" => Ok(ProductKind::Tree),
            "FLOWER" => Ok(ProductKind::Flower),
            "DECORATION" => Ok(ProductKind::Decoration),
            other => Err(StoreError::unknown_variant(format!("product type '{other}'"))),
        }
    }
}

/// Decoration material. The catalog only stocks these two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Madera,
    Plastico,
}

impl Material {
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Madera => "madera",
            Material::Plastico => "plastico",
        }
    }
}

impl core::fmt::Display for Material {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Material {
    type Err = StoreError;

    /// Case-insensitive at input time; stored typed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "madera" => Ok(Material::Madera),
            "plastico" => Ok(Material::Plastico),
            other => Err(StoreError::invalid_input(format!("unrecognized material '{other}'"))),
        }
    }
}

/// Variant-specific payload. The attribute alone determines the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    /// Tree height, in meters.
    Height(f64),
    /// Flower color.
    Color(String),
    /// Decoration material.
    Material(Material),
}

impl Attribute {
    pub fn kind(&self) -> ProductKind {
        match self {
            Attribute::Height(_) => ProductKind::Tree,
            Attribute::Color(_) => ProductKind::Flower,
            Attribute::Material(_) => ProductKind::Decoration,
        }
    }

    /// The flattened string form used in ticket line items (`Features`).
    pub fn features(&self) -> String {
        match self {
            Attribute::Height(h) => h.to_string(),
            Attribute::Color(c) => c.clone(),
            Attribute::Material(m) => m.as_str().to_string(),
        }
    }
}

impl ValueObject for Attribute {}

/// Immutable composite lookup key: `(name, attribute)`.
///
/// This is the key used for update/delete lookups and for ticket line
/// aggregation. It is deliberately a detached value object rather than the
/// entity itself, so that later quantity/price mutation cannot corrupt map
/// identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductKey {
    name: String,
    attribute: Attribute,
}

impl ProductKey {
    pub fn new(name: impl Into<String>, attribute: Attribute) -> Self {
        Self {
            name: name.into(),
            attribute,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn kind(&self) -> ProductKind {
        self.attribute.kind()
    }
}

impl ValueObject for ProductKey {}

/// One catalog line: a persisted product with its allocated identifier.
///
/// Construction paths:
/// - [`Product::rehydrate`] when decoding a stored document (the caller
///   supplies the id);
/// - [`NewProduct`] for new entries (the repository allocates the id before
///   persisting, so an unsaved product never carries one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    quantity: u32,
    price: f64,
    attribute: Attribute,
}

impl Product {
    /// Rebuild a product from storage. Field validation already happened at
    /// creation time; decode-level shape checking is the codec's job.
    pub fn rehydrate(
        id: ProductId,
        name: impl Into<String>,
        quantity: u32,
        price: f64,
        attribute: Attribute,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            price,
            attribute,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn kind(&self) -> ProductKind {
        self.attribute.kind()
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// The `(name, attribute)` lookup key for this catalog line.
    pub fn key(&self) -> ProductKey {
        ProductKey::new(self.name.clone(), self.attribute.clone())
    }

    /// Replace the stock quantity.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` for a zero quantity — a
    /// quantity-update request with a non-positive value never reaches the
    /// repository.
    pub fn set_quantity(&mut self, quantity: u32) -> StoreResult<()> {
        if quantity == 0 {
            return Err(StoreError::invalid_input("quantity update must be positive"));
        }
        self.quantity = quantity;
        Ok(())
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "#{} {} [{}] x{} @ {:.2}",
            self.id, self.name, self.kind(), self.quantity, self.price
        )?;
        match &self.attribute {
            Attribute::Height(h) => write!(f, ", height: {h}"),
            Attribute::Color(c) => write!(f, ", color: {c}"),
            Attribute::Material(m) => write!(f, ", material: {m}"),
        }
    }
}

/// A catalog entry that has not been persisted yet, and therefore has no id.
///
/// The repository allocates the identifier on insert and hands back the
/// persisted [`Product`], making the "caller-supplied ids are ignored"
/// contract impossible to misuse.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    name: String,
    quantity: u32,
    price: f64,
    attribute: Attribute,
}

impl NewProduct {
    fn validated(
        name: impl Into<String>,
        quantity: u32,
        price: f64,
        attribute: Attribute,
    ) -> StoreResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StoreError::invalid_input("product name must not be empty"));
        }
        Ok(Self {
            name,
            quantity,
            price,
            attribute,
        })
    }

    /// A new tree with its height in meters.
    pub fn tree(name: impl Into<String>, quantity: u32, price: f64, height: f64) -> StoreResult<Self> {
        Self::validated(name, quantity, price, Attribute::Height(height))
    }

    /// A new flower with its color.
    pub fn flower(
        name: impl Into<String>,
        quantity: u32,
        price: f64,
        color: impl Into<String>,
    ) -> StoreResult<Self> {
        Self::validated(name, quantity, price, Attribute::Color(color.into()))
    }

    /// A new decoration with its material.
    pub fn decoration(
        name: impl Into<String>,
        quantity: u32,
        price: f64,
        material: Material,
    ) -> StoreResult<Self> {
        Self::validated(name, quantity, price, Attribute::Material(material))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn kind(&self) -> ProductKind {
        self.attribute.kind()
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Attach the allocated identifier, producing the persisted entity.
    pub fn with_id(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            quantity: self.quantity,
            price: self.price,
            attribute: self.attribute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_order_lists_decorations_before_flowers_before_trees() {
        // Descending kind order is the catalog listing order.
        let mut kinds = vec![ProductKind::Tree, ProductKind::Decoration, ProductKind::Flower];
        kinds.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            kinds,
            vec![ProductKind::Decoration, ProductKind::Flower, ProductKind::Tree]
        );
    }

    #[test]
    fn kind_round_trips_through_its_tag() {
        for kind in [ProductKind::Tree, ProductKind::Flower, ProductKind::Decoration] {
            assert_eq!(kind.as_tag().parse::<ProductKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_tag_is_rejected() {
        let err = "ROCK".parse::<ProductKind>().unwrap_err();
        match err {
            StoreError::UnknownVariant(_) => {}
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }
    }

    #[test]
    fn material_parses_case_insensitively() {
        assert_eq!("MADERA".parse::<Material>().unwrap(), Material::Madera);
        assert_eq!("Plastico".parse::<Material>().unwrap(), Material::Plastico);
        assert_eq!(" madera ".parse::<Material>().unwrap(), Material::Madera);
    }

    #[test]
    fn unrecognized_material_is_invalid_input() {
        let err = "cristal".parse::<Material>().unwrap_err();
        match err {
            StoreError::InvalidInput(_) => {}
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn new_product_rejects_empty_name() {
        let err = NewProduct::tree("   ", 5, 20.0, 3.5).unwrap_err();
        match err {
            StoreError::InvalidInput(_) => {}
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn attribute_fixes_the_kind() {
        let flower = NewProduct::flower("Rose", 10, 2.5, "red").unwrap();
        assert_eq!(flower.kind(), ProductKind::Flower);

        let decoration = NewProduct::decoration("Gnome", 3, 12.0, Material::Plastico).unwrap();
        assert_eq!(decoration.kind(), ProductKind::Decoration);
    }

    #[test]
    fn set_quantity_rejects_zero() {
        let mut product = NewProduct::tree("Pine", 5, 20.0, 3.5)
            .unwrap()
            .with_id(ProductId::new(1));
        let err = product.set_quantity(0).unwrap_err();
        match err {
            StoreError::InvalidInput(_) => {}
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
        // Unchanged on rejection.
        assert_eq!(product.quantity(), 5);
    }

    #[test]
    fn key_is_stable_across_quantity_and_price_mutation() {
        let mut product = NewProduct::flower("Rose", 10, 2.5, "red")
            .unwrap()
            .with_id(ProductId::new(7));
        let key_before = product.key();

        product.set_quantity(99).unwrap();
        product.set_price(4.0);

        assert_eq!(product.key(), key_before);
    }

    #[test]
    fn display_includes_the_variant_attribute() {
        let tree = NewProduct::tree("Pine", 5, 20.0, 3.5)
            .unwrap()
            .with_id(ProductId::new(1));
        let rendered = tree.to_string();
        assert!(rendered.contains("Pine"));
        assert!(rendered.contains("height: 3.5"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: features() of a flower is exactly its color, and the
            /// key survives arbitrary quantity/price churn.
            #[test]
            fn flower_features_and_key_stability(
                name in "[A-Za-z][A-Za-z ]{0,30}",
                color in "[a-z]{1,12}",
                quantity in 0u32..10_000,
                price in 0.0f64..1_000.0,
                new_quantity in 1u32..10_000,
            ) {
                let flower = NewProduct::flower(name.clone(), quantity, price, color.clone())
                    .unwrap()
                    .with_id(ProductId::new(1));
                prop_assert_eq!(flower.attribute().features(), color);

                let mut churned = flower.clone();
                churned.set_quantity(new_quantity).unwrap();
                prop_assert_eq!(churned.key(), flower.key());
            }
        }
    }
}
