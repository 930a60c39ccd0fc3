//! Order service: orders and their line items.

use common::{OrderId, OrderStatus, ProductId, Quantity, UserId};
use futures_util::future::try_join_all;
use store::{Order, OrderLineItem, Store};

use crate::error::{ConstraintViolation, DomainError, Result};

use super::OrderDetails;

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse::<OrderStatus>()
        .map_err(|e| ConstraintViolation::InvalidStatus(e.0).into())
}

/// Service for managing orders.
///
/// Owns the consistency rules between an order and its line items: one line
/// item per product, merge-on-add, the `active` status gate, and line items
/// removed before their order.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order for `owner_id` with a raw status string.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, status: &str, owner_id: UserId) -> Result<Order> {
        let status = parse_status(status)?;

        let order = self
            .store
            .insert_order(status, owner_id)
            .await
            .map_err(|e| DomainError::from_store("create order for owner", owner_id, e))?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, "Order created");
        Ok(order)
    }

    /// Loads an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .find_order(order_id)
            .await
            .map_err(|e| DomainError::from_store("get order", order_id, e))?
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }

    /// Lists every order in creation order.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.store
            .list_orders()
            .await
            .map_err(|e| DomainError::from_store("list orders", "all", e))
    }

    /// Overwrites the status of an order. Both directions are allowed.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, order_id: OrderId, status: &str) -> Result<Order> {
        let status = parse_status(status)?;

        let order = self
            .store
            .update_order_status(order_id, status)
            .await
            .map_err(|e| DomainError::from_store("update status of order", order_id, e))?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;

        metrics::counter!("order_status_updates_total").increment(1);
        tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
        Ok(order)
    }

    /// Deletes an order after removing all of its line items.
    ///
    /// The two steps are separate writes. If the order delete fails, the
    /// line items stay removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<Order> {
        let removed = self
            .store
            .delete_line_items(order_id)
            .await
            .map_err(|e| DomainError::from_store("delete line items of order", order_id, e))?;
        metrics::counter!("line_items_removed_total").increment(removed.len() as u64);

        let order = self
            .store
            .delete_order(order_id)
            .await
            .map_err(|e| {
                DomainError::from_store_on_delete("delete order", "order", "line items", order_id, e)
            })?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(order_id = %order.id, line_items = removed.len(), "Order deleted");
        Ok(order)
    }

    /// Loads an order together with its line items.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_details(&self, order_id: OrderId) -> Result<OrderDetails> {
        let order = self.get_order(order_id).await?;
        self.details_for(order).await
    }

    /// Loads the details of every order.
    #[tracing::instrument(skip(self))]
    pub async fn list_order_details(&self) -> Result<Vec<OrderDetails>> {
        let orders = self.list_orders().await?;
        try_join_all(orders.into_iter().map(|order| self.details_for(order))).await
    }

    /// Lists the line items of an order. Unknown orders have none.
    #[tracing::instrument(skip(self))]
    pub async fn list_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        self.store
            .list_line_items(order_id)
            .await
            .map_err(|e| DomainError::from_store("list line items of order", order_id, e))
    }

    /// Adds `quantity` of a product to an active order.
    ///
    /// If the product is already on the order its quantity grows by
    /// `quantity`; otherwise a new line item is created. Returns the line
    /// item as stored afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn add_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<OrderLineItem> {
        let order = self.get_order(order_id).await?;
        Self::ensure_modifiable(&order, "add products to")?;

        let item = self
            .store
            .merge_line_item(order_id, product_id, quantity)
            .await
            .map_err(|e| DomainError::from_store("add product to order", order_id, e))?;

        let outcome = if item.quantity == quantity {
            "inserted"
        } else {
            "merged"
        };
        metrics::counter!("line_items_merged_total", "outcome" => outcome).increment(1);
        tracing::debug!(%order_id, %product_id, quantity = %item.quantity, outcome, "Line item stored");
        Ok(item)
    }

    /// Replaces the quantity of a line item on an active order.
    #[tracing::instrument(skip(self))]
    pub async fn set_line_item_quantity(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<OrderLineItem> {
        let order = self.get_order(order_id).await?;
        Self::ensure_modifiable(&order, "change quantities on")?;

        self.store
            .set_line_item_quantity(order_id, product_id, quantity)
            .await
            .map_err(|e| DomainError::from_store("update quantity on order", order_id, e))?
            .ok_or_else(|| DomainError::not_found("product", line_item_key(order_id, product_id)))
    }

    /// Removes one product from an order.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<OrderLineItem> {
        let item = self
            .store
            .delete_line_item(order_id, product_id)
            .await
            .map_err(|e| DomainError::from_store("remove product from order", order_id, e))?
            .ok_or_else(|| {
                DomainError::not_found("product", line_item_key(order_id, product_id))
            })?;

        metrics::counter!("line_items_removed_total").increment(1);
        Ok(item)
    }

    /// Removes every product from an order and returns what was removed.
    #[tracing::instrument(skip(self))]
    pub async fn remove_all_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        let removed = self
            .store
            .delete_line_items(order_id)
            .await
            .map_err(|e| DomainError::from_store("remove products from order", order_id, e))?;

        metrics::counter!("line_items_removed_total").increment(removed.len() as u64);
        Ok(removed)
    }

    /// Lists the details of every order of an owner, optionally only those
    /// in `status`.
    ///
    /// Line items are fetched concurrently; the result keeps creation order.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderDetails>> {
        let orders = self
            .store
            .list_orders_by_owner(owner_id, status)
            .await
            .map_err(|e| DomainError::from_store("list orders of owner", owner_id, e))?;

        try_join_all(orders.into_iter().map(|order| self.details_for(order))).await
    }

    /// Deletes every order of an owner, optionally only those in `status`.
    ///
    /// Orders are deleted one after another. On failure the orders deleted
    /// so far stay deleted and the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn delete_orders_for_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let targets = self.list_orders_for_owner(owner_id, status).await?;

        let mut deleted = Vec::with_capacity(targets.len());
        for details in targets {
            match self.delete_order(details.order_id).await {
                Ok(order) => deleted.push(order),
                Err(e) => {
                    tracing::error!(
                        %owner_id,
                        order_id = %details.order_id,
                        already_deleted = deleted.len(),
                        error = %e,
                        "Batch order delete stopped"
                    );
                    return Err(e);
                }
            }
        }

        Ok(deleted)
    }

    async fn details_for(&self, order: Order) -> Result<OrderDetails> {
        let items = self.list_line_items(order.id).await?;
        Ok(OrderDetails::new(&order, items))
    }

    fn ensure_modifiable(order: &Order, action: &'static str) -> Result<()> {
        if order.status.can_modify_items() {
            Ok(())
        } else {
            Err(DomainError::InvalidState {
                order_id: order.id,
                status: order.status,
                action,
            })
        }
    }
}

fn line_item_key(order_id: OrderId, product_id: ProductId) -> String {
    format!("{product_id} on order {order_id}")
}

#[cfg(test)]
mod tests {
    use store::{InMemoryStore, NewProduct, NewUser, ProductRepository, UserRepository};

    use super::*;
    use crate::order::OrderProduct;

    async fn setup() -> (OrderService<InMemoryStore>, UserId, ProductId) {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(NewUser {
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                username: "john_doe".to_string(),
                email: "john@example.com".to_string(),
                password_digest: "digest".to_string(),
            })
            .await
            .unwrap();
        let product = store
            .insert_product(NewProduct {
                name: "Batteries".to_string(),
                price: "50".parse().unwrap(),
                category: None,
                description: None,
            })
            .await
            .unwrap();
        (OrderService::new(store), user.id, product.id)
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_create_order_rejects_invalid_status() {
        let (service, owner, _) = setup().await;

        let err = service.create_order("shipped", owner).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::ConstraintViolation(ConstraintViolation::InvalidStatus(ref s)) if s == "shipped"
        ));
        assert!(service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_with_unknown_owner() {
        let (service, _, _) = setup().await;

        let err = service
            .create_order("active", UserId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ConstraintViolation(ConstraintViolation::UnknownOwner)
        ));
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let (service, _, _) = setup().await;

        let err = service.get_order(OrderId::new(1)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "order", .. }));
    }

    #[tokio::test]
    async fn test_update_status_checks_status_before_lookup() {
        let (service, _, _) = setup().await;

        let err = service
            .update_status(OrderId::new(99), "done")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));

        let err = service
            .update_status(OrderId::new(99), "complete")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_quantity_replaces_and_is_gated() {
        let (service, owner, product) = setup().await;
        let order = service.create_order("active", owner).await.unwrap();

        let err = service
            .set_line_item_quantity(order.id, product, qty(3))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "product", .. }));

        service.add_line_item(order.id, product, qty(10)).await.unwrap();
        let item = service
            .set_line_item_quantity(order.id, product, qty(3))
            .await
            .unwrap();
        assert_eq!(item.quantity.get(), 3);

        service.update_status(order.id, "complete").await.unwrap();
        let err = service
            .set_line_item_quantity(order.id, product, qty(4))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_add_line_item_unknown_product() {
        let (service, owner, _) = setup().await;
        let order = service.create_order("active", owner).await.unwrap();

        let err = service
            .add_line_item(order.id, ProductId::new(77), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ConstraintViolation(ConstraintViolation::UnknownProduct)
        ));
    }

    #[tokio::test]
    async fn test_remove_line_item() {
        let (service, owner, product) = setup().await;
        let order = service.create_order("active", owner).await.unwrap();
        service.add_line_item(order.id, product, qty(2)).await.unwrap();

        let removed = service.remove_line_item(order.id, product).await.unwrap();
        assert_eq!(removed.quantity.get(), 2);

        let err = service
            .remove_line_item(order.id, product)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_remove_all_line_items_on_empty_order() {
        let (service, owner, _) = setup().await;
        let order = service.create_order("active", owner).await.unwrap();

        let removed = service.remove_all_line_items(order.id).await.unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn test_list_order_details() {
        let (service, owner, product) = setup().await;
        let first = service.create_order("active", owner).await.unwrap();
        let second = service.create_order("complete", owner).await.unwrap();
        service.add_line_item(first.id, product, qty(2)).await.unwrap();

        let details = service.list_order_details().await.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].order_id, first.id);
        assert_eq!(
            details[0].products,
            vec![OrderProduct {
                product_id: product,
                quantity: qty(2),
            }]
        );
        assert_eq!(details[1].order_id, second.id);
        assert!(details[1].products.is_empty());
    }
}
