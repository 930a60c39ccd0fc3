//! Domain error types.

use common::{OrderId, OrderStatus};
use store::{StoreError, constraints};
use thiserror::Error;

/// Input or referential rules rejected a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("Invalid order status: {0:?} (expected \"active\" or \"complete\")")]
    InvalidStatus(String),

    #[error("Owner does not exist")]
    UnknownOwner,

    #[error("Product does not exist")]
    UnknownProduct,

    #[error("Order does not exist")]
    UnknownOrder,

    #[error("The {field} is already taken")]
    Duplicate { field: &'static str },

    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Price must be a non-negative amount with at most two decimals")]
    InvalidPrice,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The row is still referenced and cannot be deleted.
    #[error("The {entity} is still referenced by {referenced_by}")]
    InUse {
        entity: &'static str,
        referenced_by: &'static str,
    },
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request broke an input or referential rule.
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),

    /// The addressed entity does not exist.
    #[error("Could not find {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// The order's status forbids the operation.
    #[error("Cannot {action} order {order_id}: order is {status}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        action: &'static str,
    },

    /// The password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Hashing a password, or reading a stored digest, failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// The store failed. Earlier steps of a multi-step operation stay committed.
    #[error("Could not {operation} {id}: {source}")]
    Persistence {
        operation: &'static str,
        id: String,
        #[source]
        source: StoreError,
    },
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Translates a store failure. Constraint-class errors become
    /// [`ConstraintViolation`]s, everything else is a [`DomainError::Persistence`].
    pub(crate) fn from_store(operation: &'static str, id: impl ToString, err: StoreError) -> Self {
        let violation = match &err {
            StoreError::UniqueViolation { constraint } => match constraint.as_str() {
                constraints::USERS_USERNAME_KEY => Some(ConstraintViolation::Duplicate {
                    field: "username",
                }),
                constraints::USERS_EMAIL_KEY => {
                    Some(ConstraintViolation::Duplicate { field: "email" })
                }
                _ => None,
            },
            StoreError::ForeignKeyViolation { constraint } => match constraint.as_str() {
                constraints::ORDERS_USER_ID_FKEY => Some(ConstraintViolation::UnknownOwner),
                constraints::ORDER_PRODUCTS_ORDER_ID_FKEY => {
                    Some(ConstraintViolation::UnknownOrder)
                }
                constraints::ORDER_PRODUCTS_PRODUCT_ID_FKEY => {
                    Some(ConstraintViolation::UnknownProduct)
                }
                _ => None,
            },
            StoreError::CheckViolation { constraint } => match constraint.as_str() {
                constraints::ORDER_PRODUCTS_QUANTITY_CHECK => {
                    Some(ConstraintViolation::InvalidQuantity)
                }
                constraints::PRODUCTS_PRICE_CHECK => Some(ConstraintViolation::InvalidPrice),
                _ => None,
            },
            StoreError::QuantityOutOfRange => Some(ConstraintViolation::InvalidQuantity),
            _ => None,
        };

        match violation {
            Some(violation) => DomainError::ConstraintViolation(violation),
            None => DomainError::Persistence {
                operation,
                id: id.to_string(),
                source: err,
            },
        }
    }

    /// Like [`DomainError::from_store`], but reports a foreign-key failure on
    /// delete as the row still being referenced.
    pub(crate) fn from_store_on_delete(
        operation: &'static str,
        entity: &'static str,
        referenced_by: &'static str,
        id: impl ToString,
        err: StoreError,
    ) -> Self {
        match err {
            StoreError::ForeignKeyViolation { .. } => {
                DomainError::ConstraintViolation(ConstraintViolation::InUse {
                    entity,
                    referenced_by,
                })
            }
            other => DomainError::from_store(operation, id, other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_name_the_field() {
        let err = DomainError::from_store(
            "create user",
            "jane",
            StoreError::UniqueViolation {
                constraint: constraints::USERS_EMAIL_KEY.to_string(),
            },
        );
        assert!(matches!(
            err,
            DomainError::ConstraintViolation(ConstraintViolation::Duplicate { field: "email" })
        ));
    }

    #[test]
    fn unknown_constraint_becomes_persistence() {
        let err = DomainError::from_store(
            "create order",
            1,
            StoreError::CheckViolation {
                constraint: "some_other_check".to_string(),
            },
        );
        match err {
            DomainError::Persistence { operation, id, .. } => {
                assert_eq!(operation, "create order");
                assert_eq!(id, "1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn foreign_key_on_delete_is_in_use() {
        let err = DomainError::from_store_on_delete(
            "delete user",
            "user",
            "orders",
            3,
            StoreError::ForeignKeyViolation {
                constraint: constraints::ORDERS_USER_ID_FKEY.to_string(),
            },
        );
        assert_eq!(err.to_string(), "The user is still referenced by orders");
    }

    #[test]
    fn persistence_message_carries_operation_and_id() {
        let err = DomainError::from_store("delete order", 7, StoreError::Corrupt("bad".into()));
        assert_eq!(err.to_string(), "Could not delete order 7: Corrupt row: bad");
    }
}
