//! Stock adjustment helpers.
//!
//! These are the only two ways stock moves outside of an explicit admin patch. Both are plain
//! arithmetic on an already locked row: the caller is responsible for holding the product lock
//! from the read until the commit.

use super::error::ProductError;
use crate::model::Product;

impl Product {
    /// Takes `quantity` units out of stock.
    ///
    /// # Errors
    /// [`ProductError::InsufficientStock`] if fewer than `quantity` units are left; stock is unchanged.
    pub fn reserve(&mut self, quantity: u32) -> Result<(), ProductError> {
        match self.stock.checked_sub(quantity) {
            Some(left) => {
                self.stock = left;
                Ok(())
            }
            None => Err(ProductError::InsufficientStock {
                requested: quantity,
                available: self.stock,
            }),
        }
    }

    /// Puts `quantity` units back into stock.
    pub fn restock(&mut self, quantity: u32) -> Result<(), ProductError> {
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or(ProductError::StockOverflow {
                stock: self.stock,
                quantity,
            })?;
        Ok(())
    }
}
