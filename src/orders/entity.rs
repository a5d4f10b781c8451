//! [`Entity`] implementation for [`Order`].
//!
//! Orders have no patch: the quantity is fixed at creation and the status is only moved by the
//! order service.

use super::error::OrderError;
use crate::framework::Entity;
use crate::model::{NewOrder, Order, OrderId};
use std::convert::Infallible;

/// Orders must ask for at least one unit.
pub(crate) fn check_quantity(quantity: u32) -> Result<(), OrderError> {
    if quantity == 0 {
        return Err(OrderError::InvalidQuantity);
    }
    Ok(())
}

impl Entity for Order {
    type Id = OrderId;
    type Create = NewOrder;
    type Patch = Infallible;
    type Error = OrderError;
    const TABLE: &'static str = "orders";

    fn id(&self) -> OrderId {
        self.id
    }

    fn from_create_params(id: OrderId, params: NewOrder) -> Result<Self, OrderError> {
        check_quantity(params.quantity)?;
        Ok(Order::pending(id, params))
    }

    fn apply_patch(&mut self, patch: Infallible) -> Result<(), OrderError> {
        match patch {}
    }
}
