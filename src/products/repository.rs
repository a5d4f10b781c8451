//! Data access for products over one [`Session`].

use super::error::ProductError;
use crate::db::Session;
use crate::framework::Entity;
use crate::model::{Product, ProductCreate, ProductId};

pub struct ProductRepository {
    session: Session,
}

impl ProductRepository {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Inserts a validated product and commits.
    pub async fn create(&mut self, params: ProductCreate) -> Result<Product, ProductError> {
        let id = self.session.next_id::<Product>().await?;
        let product = Product::from_create_params(id, params)?;
        self.session.insert(product.clone())?;
        self.session.commit().await?;
        Ok(product)
    }

    /// Unlocked lookup.
    pub async fn get_by_id(
        &self,
        id: ProductId,
        include_deleted: bool,
    ) -> Result<Option<Product>, ProductError> {
        let product = self.session.get::<Product>(id).await?;
        Ok(product.filter(|p| include_deleted || !p.is_deleted))
    }

    /// Locked lookup. A soft-deleted row stays locked even when it is filtered out, until the
    /// transaction ends.
    pub async fn lock_by_id(
        &mut self,
        id: ProductId,
        include_deleted: bool,
    ) -> Result<Option<Product>, ProductError> {
        let product = self.session.lock::<Product>(id).await?;
        Ok(product.filter(|p| include_deleted || !p.is_deleted))
    }

    /// Non-deleted products whose name contains `search` (case-insensitive), newest first.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Product>, ProductError> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut products = self
            .session
            .scan::<Product>(|p| {
                !p.is_deleted
                    && needle
                        .as_deref()
                        .is_none_or(|n| p.name.to_lowercase().contains(n))
            })
            .await?;
        products.reverse();
        Ok(products)
    }

    pub fn save(&mut self, product: Product) -> Result<(), ProductError> {
        self.session.update(product)?;
        Ok(())
    }

    /// Hard delete, following the store's product delete policy for referencing orders.
    pub async fn purge(&mut self, id: ProductId) -> Result<bool, ProductError> {
        Ok(self.session.delete_product(id).await?)
    }

    pub async fn commit(&mut self) -> Result<(), ProductError> {
        self.session.commit().await?;
        Ok(())
    }

    pub fn rollback(&mut self) {
        self.session.rollback();
    }
}
