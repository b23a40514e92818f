use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db::schema::Row;
use crate::db::session::{QueryError, SqlSession};
use crate::db::sql;
use crate::db::sync::PRODUCTS_TABLE;

const TABLE: &str = PRODUCTS_TABLE.name;

/// An inventory product. Quantities are optional on intake; persistence runs
/// them through [`reconcile`] first, so stored rows always carry all three.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub auto_code: Option<String>,
    #[serde(deserialize_with = "lenient::price")]
    pub import_price: f64,
    #[serde(deserialize_with = "lenient::price")]
    pub sale_price: f64,
    #[serde(deserialize_with = "lenient::price")]
    pub discount_percent: f64,
    #[serde(deserialize_with = "lenient::price")]
    pub discount_amount: f64,
    pub thumbnail: Option<String>,
    pub product_images: Vec<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::quantity")]
    pub imported_quantity: Option<i64>,
    #[serde(deserialize_with = "lenient::quantity")]
    pub sold_quantity: Option<i64>,
    #[serde(deserialize_with = "lenient::quantity")]
    pub remaining_quantity: Option<i64>,
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("product id must not be empty")]
    MissingId,
    #[error("product '{id}' not found")]
    NotFound { id: String },
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Derive the missing quantity from whichever two were supplied, in fixed
/// priority order:
///
/// 1. imported + sold present: remaining := imported - sold. This branch
///    wins even when the caller also supplied a remaining value; the
///    supplied value is discarded and recomputed.
/// 2. imported + remaining present: sold := imported - remaining.
/// 3. sold + remaining present: imported := sold + remaining.
///
/// Anything still missing afterwards becomes 0. Negative results are passed
/// through unchanged.
pub fn reconcile(mut product: Product) -> Product {
    match (
        product.imported_quantity,
        product.sold_quantity,
        product.remaining_quantity,
    ) {
        (Some(imported), Some(sold), _) => {
            product.remaining_quantity = Some(imported - sold);
        }
        (Some(imported), None, Some(remaining)) => {
            product.sold_quantity = Some(imported - remaining);
        }
        (None, Some(sold), Some(remaining)) => {
            product.imported_quantity = Some(sold + remaining);
        }
        _ => {}
    }

    product.imported_quantity.get_or_insert(0);
    product.sold_quantity.get_or_insert(0);
    product.remaining_quantity.get_or_insert(0);
    product
}

/// Insert a product. The record is reconciled before it reaches the table;
/// the reconciled form is returned.
pub async fn insert(
    session: &mut dyn SqlSession,
    product: Product,
) -> Result<Product, ProductError> {
    if product.id.is_empty() {
        return Err(ProductError::MissingId);
    }
    let product = reconcile(product);
    let statement = sql::insert_sql(TABLE, &product_row(&product));
    log::debug!("executing: {}", statement);
    session.execute(&statement).await?;
    Ok(product)
}

/// Update a product by id, through the same reconciliation path as insert.
pub async fn update(
    session: &mut dyn SqlSession,
    product: Product,
) -> Result<Product, ProductError> {
    if product.id.is_empty() {
        return Err(ProductError::MissingId);
    }
    let product = reconcile(product);
    let statement = sql::update_sql(TABLE, &product_row(&product), &["id"]);
    log::debug!("executing: {}", statement);
    let affected = session.execute(&statement).await?;
    if affected == 0 {
        return Err(ProductError::NotFound {
            id: product.id.clone(),
        });
    }
    Ok(product)
}

/// Delete a product by id.
pub async fn delete_by_id(session: &mut dyn SqlSession, id: &str) -> Result<(), ProductError> {
    let statement = sql::delete_sql(TABLE, "id", &Value::String(id.to_string()));
    let affected = session.execute(&statement).await?;
    if affected == 0 {
        return Err(ProductError::NotFound { id: id.to_string() });
    }
    Ok(())
}

/// Fetch every product. Rows that no longer parse are skipped with a
/// warning rather than failing the whole listing.
pub async fn list(session: &mut dyn SqlSession) -> Result<Vec<Product>, ProductError> {
    let rows = session.query("SELECT * FROM Products").await?;
    Ok(rows.into_iter().filter_map(product_from_row).collect())
}

/// Lay the product out as a table row, image list serialized to JSON text
/// for its NVARCHAR(MAX) column.
fn product_row(product: &Product) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(product.id));
    row.insert("name".to_string(), json!(product.name));
    row.insert("code".to_string(), opt_text(&product.code));
    row.insert("autoCode".to_string(), opt_text(&product.auto_code));
    row.insert("importPrice".to_string(), json!(product.import_price));
    row.insert("salePrice".to_string(), json!(product.sale_price));
    row.insert("discountPercent".to_string(), json!(product.discount_percent));
    row.insert("discountAmount".to_string(), json!(product.discount_amount));
    row.insert("thumbnail".to_string(), opt_text(&product.thumbnail));
    row.insert("productImages".to_string(), images_text(&product.product_images));
    row.insert("description".to_string(), opt_text(&product.description));
    row.insert(
        "importedQuantity".to_string(),
        json!(product.imported_quantity.unwrap_or(0)),
    );
    row.insert(
        "soldQuantity".to_string(),
        json!(product.sold_quantity.unwrap_or(0)),
    );
    row.insert(
        "remainingQuantity".to_string(),
        json!(product.remaining_quantity.unwrap_or(0)),
    );
    row
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn images_text(images: &[String]) -> Value {
    match serde_json::to_string(images) {
        Ok(text) => Value::String(text),
        Err(_) => Value::Null,
    }
}

fn product_from_row(mut row: Row) -> Option<Product> {
    // The image list comes back as JSON text; unfold it before decoding.
    if let Some(images) = row.get_mut("productImages") {
        if let Value::String(text) = images {
            *images = serde_json::from_str::<Value>(text)
                .ok()
                .filter(Value::is_array)
                .unwrap_or(Value::Null);
        }
    }
    match serde_json::from_value(Value::Object(row)) {
        Ok(product) => Some(product),
        Err(err) => {
            log::warn!("skipping malformed product row: {}", err);
            None
        }
    }
}

mod lenient {
    //! Intake tolerance for numeric fields arriving from forms: numbers,
    //! numeric strings, or nothing. Anything else counts as missing.

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn quantity<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(parse_int))
    }

    pub fn price<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(parse_float).unwrap_or(0.0))
    }

    fn parse_int(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
            }
            _ => None,
        }
    }

    fn parse_float(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}
