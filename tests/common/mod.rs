#![allow(dead_code)]

use order_desk::auth::Principal;
use order_desk::config::Config;
use order_desk::db::OnDelete;
use order_desk::lifecycle::OrderDesk;
use order_desk::model::{Order, Product, ProductCreate, ProductId, User, UserRegistration};
use rust_decimal::Decimal;
use std::time::Duration;

/// Development config with cheap password hashing.
pub fn test_config() -> Config {
    Config {
        password_hash_memory_kib: 1024,
        password_hash_iterations: 1,
        lock_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

pub fn start_desk() -> OrderDesk {
    OrderDesk::start(test_config()).expect("desk starts")
}

pub fn start_desk_with_product_policy(policy: OnDelete) -> OrderDesk {
    OrderDesk::start(Config {
        on_product_delete: policy,
        ..test_config()
    })
    .expect("desk starts")
}

pub async fn register(desk: &OrderDesk, name: &str) -> (User, Principal) {
    let user = desk
        .users()
        .register(UserRegistration {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "password123".to_string(),
        })
        .await
        .expect("registration succeeds");
    let principal = Principal {
        id: user.id,
        role: user.role,
    };
    (user, principal)
}

pub async fn add_product(desk: &OrderDesk, stock: u32) -> Product {
    desk.products()
        .create_product(ProductCreate {
            name: "Widget".to_string(),
            description: None,
            price: Decimal::new(1250, 2),
            stock,
        })
        .await
        .expect("product is valid")
}

/// Committed stock, including soft-deleted products.
pub async fn stock_of(desk: &OrderDesk, id: ProductId) -> u32 {
    desk.store()
        .session()
        .get::<Product>(id)
        .await
        .expect("store open")
        .expect("product exists")
        .stock
}

pub async fn order_count(desk: &OrderDesk) -> usize {
    desk.store().row_count::<Order>().await
}
