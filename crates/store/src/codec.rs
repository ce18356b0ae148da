//! Document ⇄ domain mapping.
//!
//! The document shapes are fixed by the historical schema (including the
//! capitalized ticket line-item keys), so encoding is explicit field-by-field
//! rather than derived. Decoding always reads the `type` discriminant first
//! and branches on it; a tag outside the known set is `UnknownVariant`, and a
//! stored attribute whose shape disagrees with the tag is corruption, also
//! surfaced as `UnknownVariant` — never coerced to a default.

use chrono::{DateTime, Utc};
use serde_json::Value;

use bloomstock_catalog::{Attribute, Product, ProductKey, ProductKind};
use bloomstock_core::{Entity, ProductId, StoreError, StoreResult, TicketId};
use bloomstock_sales::{Ticket, TicketLine};

use crate::document::{Document, Filter};

pub const FIELD_PRODUCT_ID: &str = "productId";
pub const FIELD_NAME: &str = "name";
pub const FIELD_QUANTITY: &str = "quantity";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_ATTRIBUTE: &str = "attribute";

pub const FIELD_TICKET_ID: &str = "ticketID";
pub const FIELD_DATE: &str = "date";
pub const FIELD_TOTAL_PRICE: &str = "totalPrice";
pub const FIELD_PRODUCTS: &str = "products";

// Ticket line items keep the historical capitalized keys.
pub const LINE_NAME: &str = "Name";
pub const LINE_TYPE: &str = "Type";
pub const LINE_FEATURES: &str = "Features";
pub const LINE_QUANTITY: &str = "Quantity";
pub const LINE_PRICE: &str = "Price";

/// The stored `attribute` value: a float for trees, a string otherwise.
pub fn encode_attribute(attribute: &Attribute) -> Value {
    match attribute {
        Attribute::Height(h) => Value::from(*h),
        Attribute::Color(c) => Value::from(c.as_str()),
        Attribute::Material(m) => Value::from(m.as_str()),
    }
}

/// Decode the variant payload from the stored `attribute` value.
pub fn decode_attribute(kind: ProductKind, value: &Value) -> StoreResult<Attribute> {
    match kind {
        ProductKind::Tree => value.as_f64().map(Attribute::Height).ok_or_else(|| {
            StoreError::unknown_variant(format!("TREE attribute must be a number, got {value}"))
        }),
        ProductKind::Flower => value
            .as_str()
            .map(|c| Attribute::Color(c.to_string()))
            .ok_or_else(|| {
                StoreError::unknown_variant(format!("FLOWER attribute must be a string, got {value}"))
            }),
        ProductKind::Decoration => {
            let material = value.as_str().ok_or_else(|| {
                StoreError::unknown_variant(format!(
                    "DECORATION attribute must be a string, got {value}"
                ))
            })?;
            decode_material(material)
        }
    }
}

/// Decode the variant payload from a flattened `Features` string.
///
/// This is the shared routine used for ticket line items, where every
/// attribute was stringified at sale time.
pub fn decode_attribute_features(kind: ProductKind, features: &str) -> StoreResult<Attribute> {
    match kind {
        ProductKind::Tree => features
            .parse::<f64>()
            .map(Attribute::Height)
            .map_err(|_| {
                StoreError::unknown_variant(format!("TREE features '{features}' is not a number"))
            }),
        ProductKind::Flower => Ok(Attribute::Color(features.to_string())),
        ProductKind::Decoration => decode_material(features),
    }
}

fn decode_material(material: &str) -> StoreResult<Attribute> {
    material
        .parse()
        .map(Attribute::Material)
        // An unrecognized stored material is corruption, not bad user input.
        .map_err(|_| StoreError::unknown_variant(format!("DECORATION material '{material}'")))
}

fn decode_kind(document: &Document, field: &str) -> StoreResult<ProductKind> {
    get_str(document, field)?.parse()
}

pub fn encode_product(product: &Product) -> Document {
    let mut doc = Document::new();
    doc.insert(FIELD_NAME.to_string(), Value::from(product.name()));
    doc.insert(FIELD_PRODUCT_ID.to_string(), Value::from(product.id().value()));
    doc.insert(FIELD_QUANTITY.to_string(), Value::from(product.quantity()));
    doc.insert(FIELD_PRICE.to_string(), Value::from(product.price()));
    doc.insert(FIELD_TYPE.to_string(), Value::from(product.kind().as_tag()));
    doc.insert(FIELD_ATTRIBUTE.to_string(), encode_attribute(product.attribute()));
    doc
}

pub fn decode_product(document: &Document) -> StoreResult<Product> {
    // Discriminant first; it drives the attribute branch.
    let kind = decode_kind(document, FIELD_TYPE)?;
    let attribute_value = document
        .get(FIELD_ATTRIBUTE)
        .ok_or_else(|| missing(FIELD_ATTRIBUTE))?;
    let attribute = decode_attribute(kind, attribute_value)?;

    let id = ProductId::new(get_i64(document, FIELD_PRODUCT_ID)?);
    let name = get_str(document, FIELD_NAME)?.to_string();
    let quantity = get_u32(document, FIELD_QUANTITY)?;
    let price = get_f64(document, FIELD_PRICE)?;

    Ok(Product::rehydrate(id, name, quantity, price, attribute))
}

/// The `(name, attribute)` lookup filter for update/delete.
pub fn key_filter(key: &ProductKey) -> Filter {
    let mut filter = Filter::new();
    filter.insert(FIELD_NAME.to_string(), Value::from(key.name()));
    filter.insert(FIELD_ATTRIBUTE.to_string(), encode_attribute(key.attribute()));
    filter
}

pub fn encode_ticket(ticket: &Ticket) -> Document {
    let lines: Vec<Value> = ticket.lines().iter().map(encode_line).collect();

    let mut doc = Document::new();
    doc.insert(FIELD_TICKET_ID.to_string(), Value::from(ticket.id().value()));
    doc.insert(FIELD_DATE.to_string(), Value::from(ticket.date().to_rfc3339()));
    doc.insert(FIELD_PRODUCTS.to_string(), Value::from(lines));
    doc.insert(FIELD_TOTAL_PRICE.to_string(), Value::from(ticket.total_price()));
    doc
}

fn encode_line(line: &TicketLine) -> Value {
    let mut doc = Document::new();
    doc.insert(LINE_NAME.to_string(), Value::from(line.key().name()));
    doc.insert(LINE_TYPE.to_string(), Value::from(line.key().kind().as_tag()));
    doc.insert(LINE_FEATURES.to_string(), Value::from(line.key().attribute().features()));
    doc.insert(LINE_QUANTITY.to_string(), Value::from(line.quantity()));
    doc.insert(LINE_PRICE.to_string(), Value::from(line.unit_price()));
    Value::Object(doc)
}

pub fn decode_ticket(document: &Document) -> StoreResult<Ticket> {
    let id = TicketId::new(get_i64(document, FIELD_TICKET_ID)?);
    let date = decode_date(document, FIELD_DATE)?;
    let total_price = get_f64(document, FIELD_TOTAL_PRICE)?;

    let raw_lines = document
        .get(FIELD_PRODUCTS)
        .and_then(Value::as_array)
        .ok_or_else(|| missing(FIELD_PRODUCTS))?;

    let lines = raw_lines
        .iter()
        .map(decode_line)
        .collect::<StoreResult<Vec<TicketLine>>>()?;

    Ok(Ticket::rehydrate(id, date, lines, total_price))
}

fn decode_line(value: &Value) -> StoreResult<TicketLine> {
    let document = value
        .as_object()
        .ok_or_else(|| StoreError::decode("ticket line is not an object"))?;

    // Same discriminant-first branch as the product decoder, over the
    // flattened snapshot fields.
    let kind = decode_kind(document, LINE_TYPE)?;
    let features = get_str(document, LINE_FEATURES)?;
    let attribute = decode_attribute_features(kind, features)?;

    let name = get_str(document, LINE_NAME)?.to_string();
    let quantity = get_u32(document, LINE_QUANTITY)?;
    let unit_price = get_f64(document, LINE_PRICE)?;

    Ok(TicketLine::rehydrate(
        ProductKey::new(name, attribute),
        quantity,
        unit_price,
    ))
}

fn missing(field: &str) -> StoreError {
    StoreError::decode(format!("missing field '{field}'"))
}

fn get_i64(document: &Document, field: &str) -> StoreResult<i64> {
    document
        .get(field)
        .ok_or_else(|| missing(field))?
        .as_i64()
        .ok_or_else(|| StoreError::decode(format!("field '{field}' is not an integer")))
}

fn get_u32(document: &Document, field: &str) -> StoreResult<u32> {
    let value = get_i64(document, field)?;
    u32::try_from(value)
        .map_err(|_| StoreError::decode(format!("field '{field}' is out of range: {value}")))
}

fn get_f64(document: &Document, field: &str) -> StoreResult<f64> {
    document
        .get(field)
        .ok_or_else(|| missing(field))?
        .as_f64()
        .ok_or_else(|| StoreError::decode(format!("field '{field}' is not a number")))
}

fn get_str<'a>(document: &'a Document, field: &str) -> StoreResult<&'a str> {
    document
        .get(field)
        .ok_or_else(|| missing(field))?
        .as_str()
        .ok_or_else(|| StoreError::decode(format!("field '{field}' is not a string")))
}

fn decode_date(document: &Document, field: &str) -> StoreResult<DateTime<Utc>> {
    let raw = get_str(document, field)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::decode(format!("field '{field}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomstock_catalog::{Material, NewProduct};
    use bloomstock_sales::NewTicket;

    fn tree() -> Product {
        NewProduct::tree("Pine", 5, 20.0, 3.5)
            .unwrap()
            .with_id(ProductId::new(1))
    }

    fn flower() -> Product {
        NewProduct::flower("Rose", 10, 2.5, "red")
            .unwrap()
            .with_id(ProductId::new(2))
    }

    fn decoration() -> Product {
        NewProduct::decoration("Gnome", 3, 12.0, Material::Madera)
            .unwrap()
            .with_id(ProductId::new(3))
    }

    #[test]
    fn product_round_trips_for_all_variants() {
        for product in [tree(), flower(), decoration()] {
            let decoded = decode_product(&encode_product(&product)).unwrap();
            assert_eq!(decoded, product);
        }
    }

    #[test]
    fn unknown_type_tag_fails_decode() {
        let mut doc = encode_product(&tree());
        doc.insert(FIELD_TYPE.to_string(), Value::from("ROCK"));

        let err = decode_product(&doc).unwrap_err();
        match err {
            StoreError::UnknownVariant(_) => {}
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }
    }

    #[test]
    fn attribute_shape_mismatch_fails_decode() {
        // A TREE document whose attribute is a string is corruption.
        let mut doc = encode_product(&tree());
        doc.insert(FIELD_ATTRIBUTE.to_string(), Value::from("tall"));

        let err = decode_product(&doc).unwrap_err();
        match err {
            StoreError::UnknownVariant(_) => {}
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_stored_material_fails_decode() {
        let mut doc = encode_product(&decoration());
        doc.insert(FIELD_ATTRIBUTE.to_string(), Value::from("cristal"));

        let err = decode_product(&doc).unwrap_err();
        match err {
            StoreError::UnknownVariant(_) => {}
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_fails_decode() {
        let mut doc = encode_product(&flower());
        doc.remove(FIELD_PRICE);

        let err = decode_product(&doc).unwrap_err();
        match err {
            StoreError::Decode(_) => {}
            other => panic!("Expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn negative_quantity_fails_decode() {
        let mut doc = encode_product(&flower());
        doc.insert(FIELD_QUANTITY.to_string(), Value::from(-1));

        let err = decode_product(&doc).unwrap_err();
        match err {
            StoreError::Decode(_) => {}
            other => panic!("Expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn ticket_round_trips_with_line_items() {
        let mut new_ticket = NewTicket::new(Utc::now(), 45.0);
        new_ticket.add_line(&tree(), 2).unwrap();
        new_ticket.add_line(&decoration(), 1).unwrap();
        let ticket = new_ticket.with_id(TicketId::new(1));

        let decoded = decode_ticket(&encode_ticket(&ticket)).unwrap();
        assert_eq!(decoded, ticket);
    }

    #[test]
    fn ticket_line_with_unknown_type_fails_decode() {
        let mut new_ticket = NewTicket::new(Utc::now(), 5.0);
        new_ticket.add_line(&flower(), 2).unwrap();
        let mut doc = encode_ticket(&new_ticket.with_id(TicketId::new(1)));

        let lines = doc.get_mut(FIELD_PRODUCTS).and_then(Value::as_array_mut).unwrap();
        lines[0]
            .as_object_mut()
            .unwrap()
            .insert(LINE_TYPE.to_string(), Value::from("ROCK"));

        let err = decode_ticket(&doc).unwrap_err();
        match err {
            StoreError::UnknownVariant(_) => {}
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_product() -> impl Strategy<Value = Product> {
            let name = "[A-Za-z][A-Za-z ]{0,20}";
            prop_oneof![
                (name, 0u32..1000, 0.0f64..500.0, 0.1f64..30.0).prop_map(
                    |(name, quantity, price, height)| {
                        NewProduct::tree(name, quantity, price, height)
                            .unwrap()
                            .with_id(ProductId::new(1))
                    }
                ),
                (name, 0u32..1000, 0.0f64..500.0, "[a-z]{1,10}").prop_map(
                    |(name, quantity, price, color)| {
                        NewProduct::flower(name, quantity, price, color)
                            .unwrap()
                            .with_id(ProductId::new(1))
                    }
                ),
                (
                    name,
                    0u32..1000,
                    0.0f64..500.0,
                    prop_oneof![Just(Material::Madera), Just(Material::Plastico)]
                )
                    .prop_map(|(name, quantity, price, material)| {
                        NewProduct::decoration(name, quantity, price, material)
                            .unwrap()
                            .with_id(ProductId::new(1))
                    }),
            ]
        }

        proptest! {
            /// Property: encode → decode is the identity for every variant.
            #[test]
            fn product_codec_round_trip(product in arbitrary_product()) {
                let decoded = decode_product(&encode_product(&product)).unwrap();
                prop_assert_eq!(decoded, product);
            }
        }
    }
}
