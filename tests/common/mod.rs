#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use botica_stock::audit::InMemoryAuditSink;
use botica_stock::db::{establish_connection_with_config, run_migrations, DbConfig, DbPool};
use botica_stock::entities::{inventory_batch, location, product, warehouse};
use botica_stock::events::{Event, EventSender};
use botica_stock::{StockMovementService, TransferService};

/// Harness backed by an in-memory SQLite database with real migrations.
pub struct TestContext {
    pub db: Arc<DbPool>,
    pub movements: StockMovementService,
    pub transfers: TransferService,
    pub audit: Arc<InMemoryAuditSink>,
    pub actor_id: Uuid,
    _event_rx: mpsc::Receiver<Event>,
}

impl TestContext {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = Arc::new(
            establish_connection_with_config(&config)
                .await
                .expect("failed to create DB pool"),
        );
        run_migrations(db.as_ref())
            .await
            .expect("failed to run migrations");

        let (tx, rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(tx));
        let audit = Arc::new(InMemoryAuditSink::new());

        let movements =
            StockMovementService::new(db.clone(), event_sender.clone(), audit.clone());
        let transfers = TransferService::new(db.clone(), event_sender, audit.clone());

        Self {
            db,
            movements,
            transfers,
            audit,
            actor_id: Uuid::new_v4(),
            _event_rx: rx,
        }
    }
}

pub fn expiry(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub async fn seed_product(db: &DbPool, sku: &str, name: &str) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(name.to_string()),
        unit_cost: Set(dec!(2.50)),
        unit_price: Set(dec!(4.99)),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed product")
}

pub async fn seed_location(db: &DbPool, name: &str) -> location::Model {
    location::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        address: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed location")
}

pub async fn seed_warehouse(
    db: &DbPool,
    name: &str,
    location_id: Option<Uuid>,
) -> warehouse::Model {
    warehouse::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        location_id: Set(location_id),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed warehouse")
}

pub async fn seed_batch(
    db: &DbPool,
    product: &product::Model,
    warehouse: &warehouse::Model,
    lot_number: &str,
    expiry_date: NaiveDate,
    quantity: i32,
) -> inventory_batch::Model {
    seed_batch_with_economics(
        db,
        product,
        warehouse,
        lot_number,
        expiry_date,
        quantity,
        product.unit_cost,
        product.unit_price,
    )
    .await
}

pub async fn seed_batch_with_economics(
    db: &DbPool,
    product: &product::Model,
    warehouse: &warehouse::Model,
    lot_number: &str,
    expiry_date: NaiveDate,
    quantity: i32,
    unit_cost: Decimal,
    unit_price: Decimal,
) -> inventory_batch::Model {
    let now = Utc::now();
    inventory_batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        warehouse_id: Set(warehouse.id),
        location_id: Set(warehouse.location_id),
        sku: Set(product.sku.clone()),
        product_name: Set(product.name.clone()),
        lot_number: Set(lot_number.to_string()),
        expiry_date: Set(expiry_date),
        quantity: Set(quantity),
        unit_cost: Set(unit_cost),
        unit_price: Set(unit_price),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("failed to seed batch")
}
