//! Product catalog.

use common::ProductId;
use store::{NewProduct, Product, ProductUpdate, Store};

use crate::error::{ConstraintViolation, DomainError, Result};

/// Service for managing catalog products.
#[derive(Clone)]
pub struct ProductService<S> {
    store: S,
}

impl<S: Store> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        if product.name.trim().is_empty() {
            return Err(ConstraintViolation::MissingField("name").into());
        }

        let name = product.name.clone();
        let product = self
            .store
            .insert_product(product)
            .await
            .map_err(|e| DomainError::from_store("create product", name, e))?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .find_product(product_id)
            .await
            .map_err(|e| DomainError::from_store("get product", product_id, e))?
            .ok_or_else(|| DomainError::not_found("product", product_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.store
            .list_products()
            .await
            .map_err(|e| DomainError::from_store("list products", "all", e))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products_by_category(&self, category: &str) -> Result<Vec<Product>> {
        self.store
            .list_products_by_category(category)
            .await
            .map_err(|e| DomainError::from_store("list products in category", category, e))
    }

    /// Applies a partial update. An empty update returns the product unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ConstraintViolation::MissingField("name").into());
        }
        if update.is_empty() {
            return self.get_product(product_id).await;
        }

        self.store
            .update_product(product_id, update)
            .await
            .map_err(|e| DomainError::from_store("update product", product_id, e))?
            .ok_or_else(|| DomainError::not_found("product", product_id))
    }

    /// Deletes a product. Fails while any order still lists it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, product_id: ProductId) -> Result<Product> {
        let product = self
            .store
            .delete_product(product_id)
            .await
            .map_err(|e| {
                DomainError::from_store_on_delete(
                    "delete product",
                    "product",
                    "orders",
                    product_id,
                    e,
                )
            })?
            .ok_or_else(|| DomainError::not_found("product", product_id))?;

        tracing::info!(product_id = %product.id, "Product deleted");
        Ok(product)
    }
}
