//! Catalog and order records for tenant shops.
//!
//! Thin data access invoked from handler implementations; the dispatch core
//! never touches these directly.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Result, Row};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::db::DbConnection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub shop_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub shop_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub price_cents: i64,
    pub available: bool,
}

impl Product {
    /// Price formatted for user-visible copy, e.g. "12.50".
    pub fn price_display(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// One line of an order's `items` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    New,
    Confirmed,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub shop_id: i64,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

fn row_to_product(row: &Row<'_>) -> Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        shop_id: row.get(1)?,
        category_id: row.get(2)?,
        name: row.get(3)?,
        price_cents: row.get(4)?,
        available: row.get::<_, i64>(5)? != 0,
    })
}

fn row_to_order(row: &Row<'_>) -> Result<Order> {
    let status_raw: String = row.get(3)?;
    let items_raw: String = row.get(4)?;
    Ok(Order {
        id: row.get(0)?,
        shop_id: row.get(1)?,
        customer_id: row.get(2)?,
        status: status_raw.parse().unwrap_or(OrderStatus::New),
        items: serde_json::from_str(&items_raw).unwrap_or_default(),
        address: row.get(5)?,
        phone: row.get(6)?,
    })
}

const PRODUCT_COLUMNS: &str = "id, shop_id, category_id, name, price_cents, available";
const ORDER_COLUMNS: &str = "id, shop_id, customer_id, status, items, address, phone";

pub fn create_category(conn: &DbConnection, shop_id: i64, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO categories (shop_id, name) VALUES (?1, ?2)",
        params![shop_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_categories(conn: &DbConnection, shop_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, shop_id, name FROM categories WHERE shop_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![shop_id], |row| {
        Ok(Category {
            id: row.get(0)?,
            shop_id: row.get(1)?,
            name: row.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn create_product(
    conn: &DbConnection,
    shop_id: i64,
    category_id: Option<i64>,
    name: &str,
    price_cents: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO products (shop_id, category_id, name, price_cents, available)
         VALUES (?1, ?2, ?3, ?4, 1)",
        params![shop_id, category_id, name, price_cents],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_product(conn: &DbConnection, product_id: i64) -> Result<Option<Product>> {
    conn.query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        params![product_id],
        row_to_product,
    )
    .optional()
}

pub fn list_products(conn: &DbConnection, shop_id: i64) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ?1 AND available = 1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![shop_id], row_to_product)?;
    rows.collect()
}

pub fn list_products_in_category(conn: &DbConnection, shop_id: i64, category_id: i64) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE shop_id = ?1 AND category_id = ?2 AND available = 1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![shop_id, category_id], row_to_product)?;
    rows.collect()
}

/// Case-insensitive name search within one shop's catalog.
pub fn search_products(conn: &DbConnection, shop_id: i64, query: &str) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE shop_id = ?1 AND available = 1 AND name LIKE ?2 COLLATE NOCASE ORDER BY id"
    ))?;
    let pattern = format!("%{}%", query.replace('%', "\\%"));
    let rows = stmt.query_map(params![shop_id, pattern], row_to_product)?;
    rows.collect()
}

pub fn delete_product(conn: &DbConnection, product_id: i64) -> Result<()> {
    conn.execute("UPDATE products SET available = 0 WHERE id = ?1", params![product_id])?;
    Ok(())
}

pub fn create_order(
    conn: &DbConnection,
    shop_id: i64,
    customer_id: i64,
    items: &[OrderItem],
    address: Option<&str>,
    phone: Option<&str>,
) -> Result<i64> {
    let items_json = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO orders (shop_id, customer_id, status, items, address, phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            shop_id,
            customer_id,
            OrderStatus::New.to_string(),
            items_json,
            address,
            phone,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_order(conn: &DbConnection, order_id: i64) -> Result<Option<Order>> {
    conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
        params![order_id],
        row_to_order,
    )
    .optional()
}

pub fn list_orders_by_customer(conn: &DbConnection, shop_id: i64, customer_id: i64) -> Result<Vec<Order>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE shop_id = ?1 AND customer_id = ?2 ORDER BY id DESC"
    ))?;
    let rows = stmt.query_map(params![shop_id, customer_id], row_to_order)?;
    rows.collect()
}

pub fn set_order_status(conn: &DbConnection, order_id: i64, status: OrderStatus) -> Result<()> {
    conn.execute(
        "UPDATE orders SET status = ?2 WHERE id = ?1",
        params![order_id, status.to_string()],
    )?;
    Ok(())
}
