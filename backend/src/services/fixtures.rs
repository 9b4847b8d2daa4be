//! Seed rows shared by the database-backed service tests

use shared::Role;
use sqlx::PgPool;

use crate::middleware::AuthUser;

pub(crate) struct Seed {
    pub warehouse_id: i64,
    pub other_warehouse_id: i64,
    pub supplier_id: i64,
    pub currency_id: i64,
    pub milk_id: i64,
    pub cheese_id: i64,
    pub admin: AuthUser,
    pub clerk: AuthUser,
}

async fn insert_id(db: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(db).await.unwrap()
}

async fn insert_employee(db: &PgPool, phone: &str, code: &str, role: Role, warehouse_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO employee
            (first_name, last_name, phone_number, unique_number, password_hash, warehouse_id, role)
        VALUES ('Test', 'Employee', $1, $2, 'x', $3, $4)
        RETURNING id
        "#,
    )
    .bind(phone)
    .bind(code)
    .bind(warehouse_id)
    .bind(role.as_str())
    .fetch_one(db)
    .await
    .unwrap()
}

/// Two warehouses, one supplier and currency, two products, an admin and a clerk of the first warehouse
pub(crate) async fn seed(db: &PgPool) -> Seed {
    let warehouse_id = insert_id(db, "INSERT INTO warehouse (name) VALUES ('Main store') RETURNING id").await;
    let other_warehouse_id =
        insert_id(db, "INSERT INTO warehouse (name) VALUES ('North store') RETURNING id").await;
    let supplier_id = insert_id(
        db,
        "INSERT INTO supplier (name, phone_number) VALUES ('Agro', '+998901112233') RETURNING id",
    )
    .await;
    let currency_id = insert_id(db, "INSERT INTO currency (name) VALUES ('UZS') RETURNING id").await;
    let measurement_id = insert_id(db, "INSERT INTO measurement (name) VALUES ('kg') RETURNING id").await;
    let category_id = insert_id(db, "INSERT INTO category (name) VALUES ('Dairy') RETURNING id").await;

    let mut product_ids = Vec::with_capacity(2);
    for (name, number) in [("Milk", 10_001), ("Cheese", 10_002)] {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO product (name, category_id, measurement_id, product_number)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(category_id)
        .bind(measurement_id)
        .bind(number)
        .fetch_one(db)
        .await
        .unwrap();
        product_ids.push(id);
    }

    let admin_phone = "+998901234567";
    let clerk_phone = "+998911234567";
    let admin_id = insert_employee(db, admin_phone, "Adm1n00001", Role::Admin, warehouse_id).await;
    let clerk_id = insert_employee(db, clerk_phone, "C1erk00001", Role::Employee, warehouse_id).await;

    Seed {
        warehouse_id,
        other_warehouse_id,
        supplier_id,
        currency_id,
        milk_id: product_ids[0],
        cheese_id: product_ids[1],
        admin: AuthUser {
            employee_id: admin_id,
            phone: admin_phone.to_string(),
            role: Role::Admin,
            warehouse_id: Some(warehouse_id),
        },
        clerk: AuthUser {
            employee_id: clerk_id,
            phone: clerk_phone.to_string(),
            role: Role::Employee,
            warehouse_id: Some(warehouse_id),
        },
    }
}

/// Stored quantity, `None` when the product never entered the warehouse
pub(crate) async fn quantity(db: &PgPool, warehouse_id: i64, product_id: i64) -> Option<i32> {
    sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM warehouse_products_balance WHERE warehouse_id = $1 AND product_id = $2",
    )
    .bind(warehouse_id)
    .bind(product_id)
    .fetch_optional(db)
    .await
    .unwrap()
}

pub(crate) async fn count_rows(db: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(db)
        .await
        .unwrap()
}
