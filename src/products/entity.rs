//! [`Entity`] implementation for [`Product`], including field validation.

use super::error::ProductError;
use crate::framework::Entity;
use crate::model::{Product, ProductCreate, ProductId, ProductPatch};
use rust_decimal::Decimal;

pub const NAME_MAX_CHARS: usize = 255;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

fn validate_name(name: &str) -> Result<(), ProductError> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(ProductError::Validation(format!(
            "name must be 1 to {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ProductError> {
    match description {
        Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => Err(ProductError::Validation(
            format!("description must be at most {DESCRIPTION_MAX_CHARS} characters"),
        )),
        _ => Ok(()),
    }
}

fn validate_price(price: Decimal) -> Result<(), ProductError> {
    if price <= Decimal::ZERO {
        return Err(ProductError::Validation(
            "price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

impl Entity for Product {
    type Id = ProductId;
    type Create = ProductCreate;
    type Patch = ProductPatch;
    type Error = ProductError;
    const TABLE: &'static str = "products";

    fn id(&self) -> ProductId {
        self.id
    }

    fn from_create_params(id: ProductId, params: ProductCreate) -> Result<Self, ProductError> {
        validate_name(&params.name)?;
        validate_description(params.description.as_deref())?;
        validate_price(params.price)?;
        Ok(Self {
            id,
            name: params.name,
            description: params.description,
            price: params.price,
            stock: params.stock,
            is_deleted: false,
        })
    }

    /// Validates every present field first, then applies them all.
    fn apply_patch(&mut self, patch: ProductPatch) -> Result<(), ProductError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        validate_description(patch.description.as_deref())?;
        if let Some(price) = patch.price {
            validate_price(price)?;
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        Ok(())
    }
}
