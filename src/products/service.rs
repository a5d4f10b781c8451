//! # Product Service
//!
//! Catalog CRUD with soft delete. Reads hide soft-deleted products; [`ProductService::restore_product`]
//! is the only operation that looks at them. Every mutation locks the row first and drops the
//! cached copy after the commit.

use super::error::ProductError;
use super::repository::ProductRepository;
use super::ProductCache;
use crate::api::{Page, PageParams};
use crate::cache::{Lookup, Ticket};
use crate::framework::Entity;
use crate::model::{Product, ProductCreate, ProductId, ProductPatch};
use tracing::{debug, info, warn};

pub struct ProductService {
    repo: ProductRepository,
    cache: Option<ProductCache>,
}

impl ProductService {
    pub fn new(repo: ProductRepository) -> Self {
        Self { repo, cache: None }
    }

    pub fn with_cache(mut self, cache: ProductCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[tracing::instrument(skip_all, fields(name = %params.name))]
    pub async fn create_product(&mut self, params: ProductCreate) -> Result<Product, ProductError> {
        let result = self.repo.create(params).await;
        match &result {
            Ok(product) => info!(product_id = %product.id, stock = product.stock, "Product created"),
            Err(e) => {
                warn!(error = %e, "Create product failed");
                self.repo.rollback();
            }
        }
        result
    }

    pub async fn list_products(
        &self,
        params: PageParams,
        search: Option<&str>,
    ) -> Result<Page<Product>, ProductError> {
        let products = self.repo.list(search).await?;
        Ok(Page::slice(products, params))
    }

    /// Cache-aside read of a non-deleted product.
    ///
    /// The write-back is skipped when a mutation invalidated the entry while the store was read.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ProductError> {
        let ticket = match self.cached(id).await {
            Some(Lookup::Hit(product)) => return Ok(product),
            Some(Lookup::Miss(ticket)) => Some(ticket),
            None => None,
        };
        let product = self
            .repo
            .get_by_id(id, false)
            .await?
            .ok_or(ProductError::NotFound(id))?;
        if let Some(ticket) = ticket {
            self.remember(&product, ticket).await;
        }
        Ok(product)
    }

    #[tracing::instrument(skip_all, fields(product_id = %id))]
    pub async fn update_product(
        &mut self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, ProductError> {
        debug!(?patch, "Update");
        let result = self.try_update(id, patch).await;
        self.finish(id, &result, "Product updated").await;
        result
    }

    async fn try_update(&mut self, id: ProductId, patch: ProductPatch) -> Result<Product, ProductError> {
        let mut product = self
            .repo
            .lock_by_id(id, false)
            .await?
            .ok_or(ProductError::NotFound(id))?;
        product.apply_patch(patch)?;
        self.repo.save(product.clone())?;
        self.repo.commit().await?;
        Ok(product)
    }

    /// Soft delete: the row stays, hidden from catalog reads.
    #[tracing::instrument(skip_all, fields(product_id = %id))]
    pub async fn delete_product(&mut self, id: ProductId) -> Result<(), ProductError> {
        let result = self.set_deleted(id, true).await.map(|_| ());
        self.finish(id, &result, "Product deleted").await;
        result
    }

    #[tracing::instrument(skip_all, fields(product_id = %id))]
    pub async fn restore_product(&mut self, id: ProductId) -> Result<Product, ProductError> {
        let result = self.set_deleted(id, false).await;
        self.finish(id, &result, "Product restored").await;
        result
    }

    async fn set_deleted(&mut self, id: ProductId, deleted: bool) -> Result<Product, ProductError> {
        // Restore must see deleted rows; delete only live ones.
        let mut product = self
            .repo
            .lock_by_id(id, !deleted)
            .await?
            .ok_or(ProductError::NotFound(id))?;
        if !deleted && !product.is_deleted {
            return Err(ProductError::NotDeleted(id));
        }
        product.is_deleted = deleted;
        self.repo.save(product.clone())?;
        self.repo.commit().await?;
        Ok(product)
    }

    /// Removes the row for good. Orders that reference it follow the store's product delete policy.
    #[tracing::instrument(skip_all, fields(product_id = %id))]
    pub async fn purge_product(&mut self, id: ProductId) -> Result<(), ProductError> {
        let result = self.try_purge(id).await;
        self.finish(id, &result, "Product purged").await;
        result
    }

    async fn try_purge(&mut self, id: ProductId) -> Result<(), ProductError> {
        if !self.repo.purge(id).await? {
            return Err(ProductError::NotFound(id));
        }
        self.repo.commit().await
    }

    async fn finish<T>(&mut self, id: ProductId, result: &Result<T, ProductError>, done: &str) {
        match result {
            Ok(_) => {
                info!(product_id = %id, "{done}");
                self.forget(id).await;
            }
            Err(e) => {
                warn!(product_id = %id, error = %e, "Product operation rejected");
                self.repo.rollback();
            }
        }
    }

    async fn cached(&self, id: ProductId) -> Option<Lookup<Product>> {
        let cache = self.cache.as_ref()?;
        match cache.lookup(id).await {
            Ok(lookup) => Some(lookup),
            Err(e) => {
                warn!(product_id = %id, error = %e, "Cache read failed, using store");
                None
            }
        }
    }

    async fn remember(&self, product: &Product, ticket: Ticket) {
        if let Some(cache) = &self.cache {
            match cache.fill(product.id, product.clone(), ticket).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(product_id = %product.id, "Product changed during read, not cached")
                }
                Err(e) => warn!(product_id = %product.id, error = %e, "Cache write failed"),
            }
        }
    }

    async fn forget(&self, id: ProductId) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(id).await {
                warn!(product_id = %id, error = %e, "Cache invalidation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheActor;
    use crate::db::{Store, StoreOptions};
    use rust_decimal::Decimal;
    use std::time::Duration;
    use tokio::sync::watch;

    fn service(store: &Store) -> ProductService {
        ProductService::new(ProductRepository::new(store.session()))
    }

    fn lamp(name: &str, stock: u32) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            stock,
        }
    }

    #[tokio::test]
    async fn test_soft_delete_hides_and_restore_brings_back() {
        let store = Store::open(StoreOptions::default());
        let mut products = service(&store);
        let lamp = products.create_product(lamp("Lamp", 3)).await.unwrap();

        products.delete_product(lamp.id).await.unwrap();
        assert_eq!(
            products.get_product(lamp.id).await.unwrap_err(),
            ProductError::NotFound(lamp.id)
        );
        assert_eq!(
            products.delete_product(lamp.id).await.unwrap_err(),
            ProductError::NotFound(lamp.id)
        );

        let restored = products.restore_product(lamp.id).await.unwrap();
        assert!(!restored.is_deleted);
        assert_eq!(
            products.restore_product(lamp.id).await.unwrap_err(),
            ProductError::NotDeleted(lamp.id)
        );
        assert_eq!(products.get_product(lamp.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_restore_missing_product() {
        let store = Store::open(StoreOptions::default());
        let mut products = service(&store);
        assert_eq!(
            products.restore_product(ProductId(42)).await.unwrap_err(),
            ProductError::NotFound(ProductId(42))
        );
    }

    #[tokio::test]
    async fn test_list_filters_searches_and_pages_newest_first() {
        let store = Store::open(StoreOptions::default());
        let mut products = service(&store);
        for name in ["Desk Lamp", "Chair", "Floor lamp", "LAMP shade"] {
            products.create_product(lamp(name, 1)).await.unwrap();
        }
        let hidden = products.create_product(lamp("Lamp post", 1)).await.unwrap();
        products.delete_product(hidden.id).await.unwrap();

        let page = products
            .list_products(PageParams::new(1, 2), Some("lamp"))
            .await
            .unwrap();
        let names: Vec<_> = page.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["LAMP shade", "Floor lamp"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);

        let all = products.list_products(PageParams::default(), None).await.unwrap();
        assert_eq!(all.total, 4);
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_copy() {
        let store = Store::open(StoreOptions::default());
        let (actor, cache) = CacheActor::new(8, Duration::from_secs(300));
        tokio::spawn(actor.run(watch::channel(false).1));
        let mut products = service(&store).with_cache(cache.clone());

        let lamp = products.create_product(lamp("Lamp", 3)).await.unwrap();
        products.get_product(lamp.id).await.unwrap();
        assert!(matches!(cache.lookup(lamp.id).await.unwrap(), Lookup::Hit(_)));

        let updated = products
            .update_product(
                lamp.id,
                ProductPatch {
                    stock: Some(9),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 9);
        assert!(matches!(cache.lookup(lamp.id).await.unwrap(), Lookup::Miss(_)));
        assert_eq!(products.get_product(lamp.id).await.unwrap().stock, 9);
    }

    #[tokio::test]
    async fn test_invalid_update_releases_row_lock() {
        let store = Store::open(StoreOptions {
            lock_timeout: Duration::from_millis(50),
            ..StoreOptions::default()
        });
        let mut products = service(&store);
        let lamp = products.create_product(lamp("Lamp", 3)).await.unwrap();

        let err = products
            .update_product(
                lamp.id,
                ProductPatch {
                    name: Some(String::new()),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::Validation(_)));

        let mut other = service(&store);
        other.delete_product(lamp.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_removes_row() {
        let store = Store::open(StoreOptions::default());
        let mut products = service(&store);
        let lamp = products.create_product(lamp("Lamp", 3)).await.unwrap();
        products.purge_product(lamp.id).await.unwrap();
        assert_eq!(store.row_count::<Product>().await, 0);
        assert_eq!(
            products.purge_product(lamp.id).await.unwrap_err(),
            ProductError::NotFound(lamp.id)
        );
    }
}
