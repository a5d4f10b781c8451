//! # Mock Repository
//!
//! An [`OrderRepository`] driven by an ordered queue of expectations, for testing the service's
//! locking and rollback discipline without a store.
//!
//! Each call pops the next expectation; a call that does not match it panics. Products and orders
//! passed to `save_*` are recorded for later assertions.
//!
//! ```ignore
//! let mut mock = MockOrderRepository::new();
//! mock.expect_lock_product(ProductId(1)).return_ok(Some(product));
//! mock.expect_rollback();
//!
//! let mut service = OrderService::new(mock.clone());
//! // ...
//! mock.verify(); // Ensures all expectations were met
//! ```

use super::error::OrderError;
use super::repository::OrderRepository;
use crate::framework::StoreError;
use crate::model::{NewOrder, Order, OrderId, Product, ProductId, UserId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
enum Expectation {
    LockProduct {
        id: ProductId,
        response: Result<Option<Product>, StoreError>,
    },
    LockOrder {
        id: OrderId,
        response: Result<Option<Order>, StoreError>,
    },
    SaveProduct {
        response: Result<(), StoreError>,
    },
    SaveOrder {
        response: Result<(), StoreError>,
    },
    CreateOrder {
        response: Result<Order, StoreError>,
    },
    List {
        response: Result<Vec<Order>, StoreError>,
    },
    Commit {
        response: Result<(), StoreError>,
    },
    Rollback,
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    saved_products: Vec<Product>,
    saved_orders: Vec<Order>,
}

#[derive(Clone, Default)]
pub struct MockOrderRepository {
    state: Arc<Mutex<State>>,
}

impl MockOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, expectation: Expectation) {
        self.state.lock().unwrap().expectations.push_back(expectation);
    }

    fn next(&self, call: &str) -> Expectation {
        self.state
            .lock()
            .unwrap()
            .expectations
            .pop_front()
            .unwrap_or_else(|| panic!("Unexpected call: {call}"))
    }

    pub fn expect_lock_product(&mut self, id: ProductId) -> ResponseBuilder<'_, Option<Product>> {
        ResponseBuilder {
            mock: self,
            make: Box::new(move |response| Expectation::LockProduct { id, response }),
        }
    }

    pub fn expect_lock_order(&mut self, id: OrderId) -> ResponseBuilder<'_, Option<Order>> {
        ResponseBuilder {
            mock: self,
            make: Box::new(move |response| Expectation::LockOrder { id, response }),
        }
    }

    pub fn expect_save_product(&mut self) -> ResponseBuilder<'_, ()> {
        ResponseBuilder {
            mock: self,
            make: Box::new(|response| Expectation::SaveProduct { response }),
        }
    }

    pub fn expect_save_order(&mut self) -> ResponseBuilder<'_, ()> {
        ResponseBuilder {
            mock: self,
            make: Box::new(|response| Expectation::SaveOrder { response }),
        }
    }

    pub fn expect_create_order(&mut self) -> ResponseBuilder<'_, Order> {
        ResponseBuilder {
            mock: self,
            make: Box::new(|response| Expectation::CreateOrder { response }),
        }
    }

    /// Serves either `list_by_user` or `list_all`.
    pub fn expect_list(&mut self) -> ResponseBuilder<'_, Vec<Order>> {
        ResponseBuilder {
            mock: self,
            make: Box::new(|response| Expectation::List { response }),
        }
    }

    pub fn expect_commit(&mut self) -> ResponseBuilder<'_, ()> {
        ResponseBuilder {
            mock: self,
            make: Box::new(|response| Expectation::Commit { response }),
        }
    }

    pub fn expect_rollback(&mut self) {
        self.push(Expectation::Rollback);
    }

    pub fn saved_products(&self) -> Vec<Product> {
        self.state.lock().unwrap().saved_products.clone()
    }

    pub fn saved_orders(&self) -> Vec<Order> {
        self.state.lock().unwrap().saved_orders.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let state = self.state.lock().unwrap();
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                state.expectations.len(),
                state.expectations
            );
        }
    }
}

/// Finishes one expectation with the response the mock should give.
pub struct ResponseBuilder<'a, T> {
    mock: &'a MockOrderRepository,
    make: Box<dyn FnOnce(Result<T, StoreError>) -> Expectation>,
}

impl<T> ResponseBuilder<'_, T> {
    pub fn return_ok(self, value: T) {
        self.mock.push((self.make)(Ok(value)));
    }

    pub fn return_err(self, error: StoreError) {
        self.mock.push((self.make)(Err(error)));
    }
}

#[async_trait]
impl OrderRepository for MockOrderRepository {
    async fn lock_product_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        match self.next("lock_product_for_update") {
            Expectation::LockProduct { id: expected, response } => {
                assert_eq!(id, expected, "locked the wrong product");
                response
            }
            other => panic!("Expected {other:?}, got lock_product_for_update({id})"),
        }
    }

    async fn lock_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        match self.next("lock_order_for_update") {
            Expectation::LockOrder { id: expected, response } => {
                assert_eq!(id, expected, "locked the wrong order");
                response
            }
            other => panic!("Expected {other:?}, got lock_order_for_update({id})"),
        }
    }

    fn save_product(&mut self, product: Product) -> Result<(), StoreError> {
        match self.next("save_product") {
            Expectation::SaveProduct { response } => {
                self.state.lock().unwrap().saved_products.push(product);
                response
            }
            other => panic!("Expected {other:?}, got save_product"),
        }
    }

    fn save_order(&mut self, order: Order) -> Result<(), StoreError> {
        match self.next("save_order") {
            Expectation::SaveOrder { response } => {
                self.state.lock().unwrap().saved_orders.push(order);
                response
            }
            other => panic!("Expected {other:?}, got save_order"),
        }
    }

    async fn create_order(&mut self, params: NewOrder) -> Result<Order, OrderError> {
        match self.next("create_order") {
            Expectation::CreateOrder { response } => response.map_err(OrderError::from),
            other => panic!("Expected {other:?}, got create_order({params:?})"),
        }
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        match self.next("list_by_user") {
            Expectation::List { response } => response,
            other => panic!("Expected {other:?}, got list_by_user({user_id})"),
        }
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        match self.next("list_all") {
            Expectation::List { response } => response,
            other => panic!("Expected {other:?}, got list_all"),
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        match self.next("commit") {
            Expectation::Commit { response } => response,
            other => panic!("Expected {other:?}, got commit"),
        }
    }

    fn rollback(&mut self) {
        match self.next("rollback") {
            Expectation::Rollback => {}
            other => panic!("Expected {other:?}, got rollback"),
        }
    }
}
