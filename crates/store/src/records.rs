//! Rows as the store hands them out.

use common::{Money, OrderId, OrderStatus, ProductId, Quantity, UserId};
use serde::Serialize;

/// An order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    #[serde(rename = "user_id")]
    pub owner_id: UserId,
}

/// A product attached to an order, keyed by `(order_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A registered user. The password digest is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
}

/// Fields required to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_digest: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Fields required to insert a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Partial product update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl ProductUpdate {
    /// Returns true when no column would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.description.is_none()
    }

    /// Applies the update to a product in place.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(category) = &self.category {
            product.category = Some(category.clone());
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_omits_password_digest() {
        let user = User {
            id: UserId::new(1),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            username: "john_doe".to_string(),
            email: "john@example.com".to_string(),
            password_digest: "$argon2id$secret".to_string(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "john_doe");
        assert!(json.get("password_digest").is_none());
    }

    #[test]
    fn product_update_applies_only_present_fields() {
        let mut product = Product {
            id: ProductId::new(1),
            name: "Batteries".to_string(),
            price: Money::from_cents(5000).unwrap(),
            category: Some("Electronics".to_string()),
            description: None,
        };

        let update = ProductUpdate {
            price: Some(Money::from_cents(4500).unwrap()),
            description: Some(String::new()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut product);

        assert_eq!(product.name, "Batteries");
        assert_eq!(product.price.cents(), 4500);
        assert_eq!(product.category.as_deref(), Some("Electronics"));
        assert_eq!(product.description.as_deref(), Some(""));
    }
}
