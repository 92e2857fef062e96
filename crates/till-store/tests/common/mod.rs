//! Helpers shared by the scenario tests.

#![allow(dead_code)]

use tempfile::TempDir;
use till_store::till_core::{Money, Product, Role};
use till_store::{Session, Store, StoreConfig};

pub const ADMIN: &str = "admin";
pub const ADMIN_PW: &str = "admin-pw";

pub fn config(dir: &TempDir) -> StoreConfig {
    StoreConfig::new(dir.path())
        .bootstrap_admin(ADMIN, ADMIN_PW)
        .fast_hashing()
}

pub async fn open(dir: &TempDir) -> Store {
    Store::open(config(dir)).await.unwrap()
}

pub async fn admin(store: &Store) -> Session {
    store.sessions().login(ADMIN, ADMIN_PW).await.unwrap()
}

/// Creates a user and logs in as them.
pub async fn user(store: &Store, admin: &Session, name: &str, role: Role) -> Session {
    let password = format!("{name}-pw");
    store
        .credentials()
        .create_user(admin, name, &password, role)
        .await
        .unwrap();
    store.sessions().login(name, &password).await.unwrap()
}

pub async fn stock_product(store: &Store, admin: &Session, barcode: &str, cents: i64, stock: i64) {
    store
        .catalog()
        .upsert_product(
            admin,
            Product::new(barcode, format!("Product {barcode}"), Money::from_cents(cents), stock),
        )
        .await
        .unwrap();
}

/// Raw bytes of the catalog and both ledgers.
pub async fn snapshot(store: &Store) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let paths = store.paths();
    (
        tokio::fs::read(&paths.products).await.unwrap(),
        tokio::fs::read(&paths.sales).await.unwrap(),
        tokio::fs::read(&paths.cash_flow).await.unwrap(),
    )
}
