//! Owner and shop records: the data behind the tenant directory.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Result, Row};

use super::db::DbConnection;

/// A registered shop owner (admin-bot user who completed registration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub telegram_id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
}

/// One flower shop. The row also carries the shop bot's identity; an active
/// shop resolves as a tenant bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shop {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub bot_token: String,
    pub bot_username: Option<String>,
    pub address: Option<String>,
    pub working_hours: Option<String>,
    pub active: bool,
}

fn row_to_shop(row: &Row<'_>) -> Result<Shop> {
    Ok(Shop {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        bot_token: row.get(4)?,
        bot_username: row.get(5)?,
        address: row.get(6)?,
        working_hours: row.get(7)?,
        active: row.get::<_, i64>(8)? != 0,
    })
}

const SHOP_COLUMNS: &str = "id, owner_id, name, description, bot_token, bot_username, address, working_hours, active";

pub fn get_owner(conn: &DbConnection, telegram_id: i64) -> Result<Option<Owner>> {
    conn.query_row(
        "SELECT telegram_id, name, phone, email, city FROM owners WHERE telegram_id = ?1",
        params![telegram_id],
        |row| {
            Ok(Owner {
                telegram_id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                city: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn create_owner(conn: &DbConnection, owner: &Owner) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO owners (telegram_id, name, phone, email, city, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            owner.telegram_id,
            owner.name,
            owner.phone,
            owner.email,
            owner.city,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Inserts a shop and returns its new id.
pub fn create_shop(
    conn: &DbConnection,
    owner_id: i64,
    name: &str,
    description: Option<&str>,
    bot_token: &str,
    address: Option<&str>,
    working_hours: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO shops (owner_id, name, description, bot_token, address, working_hours, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
        params![
            owner_id,
            name,
            description,
            bot_token,
            address,
            working_hours,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_shop(conn: &DbConnection, shop_id: i64) -> Result<Option<Shop>> {
    conn.query_row(
        &format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = ?1"),
        params![shop_id],
        row_to_shop,
    )
    .optional()
}

pub fn get_shop_by_token(conn: &DbConnection, token: &str) -> Result<Option<Shop>> {
    conn.query_row(
        &format!("SELECT {SHOP_COLUMNS} FROM shops WHERE bot_token = ?1"),
        params![token],
        row_to_shop,
    )
    .optional()
}

pub fn get_shops_by_owner(conn: &DbConnection, owner_id: i64) -> Result<Vec<Shop>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops WHERE owner_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![owner_id], row_to_shop)?;
    rows.collect()
}

pub fn list_active_shops(conn: &DbConnection) -> Result<Vec<Shop>> {
    let mut stmt = conn.prepare(&format!("SELECT {SHOP_COLUMNS} FROM shops WHERE active = 1 ORDER BY id"))?;
    let rows = stmt.query_map([], row_to_shop)?;
    rows.collect()
}

pub fn set_shop_active(conn: &DbConnection, shop_id: i64, active: bool) -> Result<()> {
    conn.execute(
        "UPDATE shops SET active = ?2 WHERE id = ?1",
        params![shop_id, active as i64],
    )?;
    Ok(())
}

pub fn update_shop_name(conn: &DbConnection, shop_id: i64, name: &str) -> Result<()> {
    conn.execute("UPDATE shops SET name = ?2 WHERE id = ?1", params![shop_id, name])?;
    Ok(())
}

pub fn update_shop_description(conn: &DbConnection, shop_id: i64, description: &str) -> Result<()> {
    conn.execute(
        "UPDATE shops SET description = ?2 WHERE id = ?1",
        params![shop_id, description],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::create_pool;

    fn test_conn() -> (tempfile::NamedTempFile, DbConnection) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        let conn = pool.get().unwrap();
        (file, conn)
    }

    fn owner(id: i64) -> Owner {
        Owner {
            telegram_id: id,
            name: "Anna".into(),
            phone: "+79990001122".into(),
            email: "anna@example.com".into(),
            city: "Moscow".into(),
        }
    }

    #[test]
    fn owner_round_trip() {
        let (_file, conn) = test_conn();
        assert_eq!(get_owner(&conn, 10).unwrap(), None);

        create_owner(&conn, &owner(10)).unwrap();
        let loaded = get_owner(&conn, 10).unwrap().unwrap();
        assert_eq!(loaded, owner(10));
    }

    #[test]
    fn shop_lookup_by_token_and_owner() {
        let (_file, conn) = test_conn();
        create_owner(&conn, &owner(10)).unwrap();

        let id = create_shop(&conn, 10, "Roses & Co", Some("roses"), "111:token", None, None).unwrap();
        assert!(id >= 1);

        let by_token = get_shop_by_token(&conn, "111:token").unwrap().unwrap();
        assert_eq!(by_token.id, id);
        assert!(by_token.active);

        let owned = get_shops_by_owner(&conn, 10).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "Roses & Co");
    }

    #[test]
    fn deactivated_shop_leaves_active_list() {
        let (_file, conn) = test_conn();
        create_owner(&conn, &owner(10)).unwrap();
        let id = create_shop(&conn, 10, "Tulips", None, "222:token", None, None).unwrap();

        assert_eq!(list_active_shops(&conn).unwrap().len(), 1);
        set_shop_active(&conn, id, false).unwrap();
        assert!(list_active_shops(&conn).unwrap().is_empty());
    }
}
