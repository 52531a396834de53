//! Turning a validated cart into an order snapshot.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, UserId};

use super::{Order, OrderDetails, OrderItem, OrderStatus, PaymentStatus};
use crate::cart::CartItem;
use crate::catalog::Product;
use crate::error::DomainError;
use crate::money::Money;

/// The complete set of writes one checkout commits atomically.
///
/// Built from the buyer's cart rows joined with the products as read at
/// checkout time. Stores persist the order and items, decrement each
/// product by its item quantity (re-checking availability), and clear the
/// buyer's cart, all in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlacement {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderPlacement {
    /// Validates the cart and snapshots current prices into order items.
    ///
    /// Fails with [`DomainError::EmptyCart`] for an empty cart and with
    /// [`DomainError::InsufficientStock`] naming the first line whose quantity
    /// exceeds the product's availability. No partial placement is produced.
    pub fn from_cart(
        buyer_id: UserId,
        entries: &[(CartItem, Product)],
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if entries.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        let order_id = OrderId::new();
        let mut items = Vec::with_capacity(entries.len());
        for (cart_item, product) in entries {
            if cart_item.quantity == 0 || cart_item.quantity > product.available_quantity() {
                return Err(DomainError::InsufficientStock(product.id));
            }
            items.push(OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: product.id,
                quantity: cart_item.quantity,
                unit_price: product.price,
            });
        }

        let line_totals = items
            .iter()
            .map(OrderItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = Money::sum(line_totals)?;

        Ok(Self {
            order: Order {
                id: order_id,
                buyer_id,
                total_amount,
                order_status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                payment_intent_id: None,
                created_at: now,
                updated_at: now,
            },
            items,
        })
    }

    /// Items sorted by product id, the order in which stores lock product rows.
    pub fn items_in_lock_order(&self) -> Vec<&OrderItem> {
        let mut items: Vec<&OrderItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.product_id);
        items
    }

    pub fn into_details(self) -> OrderDetails {
        OrderDetails {
            order: self.order,
            items: self.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewProduct;

    fn product(price: &str, quantity: u32) -> Product {
        NewProduct {
            title: "Item".to_string(),
            description: String::new(),
            price: Money::parse(price).unwrap(),
            quantity_available: quantity,
            images: vec![],
            category: "misc".to_string(),
        }
        .into_product(UserId::new(), Utc::now())
        .unwrap()
    }

    fn entry(buyer: UserId, product: Product, quantity: u32) -> (CartItem, Product) {
        (
            CartItem {
                buyer_id: buyer,
                product_id: product.id,
                quantity,
                added_at: Utc::now(),
            },
            product,
        )
    }

    #[test]
    fn test_two_line_cart_totals_exactly() {
        let buyer = UserId::new();
        let a = product("10.00", 5);
        let b = product("5.00", 5);
        let entries = vec![entry(buyer, a.clone(), 2), entry(buyer, b.clone(), 1)];

        let placement = OrderPlacement::from_cart(buyer, &entries, Utc::now()).unwrap();

        assert_eq!(placement.order.total_amount, Money::parse("25.00").unwrap());
        assert_eq!(placement.order.order_status, OrderStatus::Pending);
        assert_eq!(placement.order.payment_status, PaymentStatus::Pending);
        assert_eq!(placement.items.len(), 2);
        assert!(placement.items.iter().all(|i| i.order_id == placement.order.id));

        let details = placement.into_details();
        assert!(details.is_consistent());
        assert!(details.contains_product(a.id));
        assert!(details.contains_product(b.id));
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = OrderPlacement::from_cart(UserId::new(), &[], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::EmptyCart);
    }

    #[test]
    fn test_line_over_availability_names_product() {
        let buyer = UserId::new();
        let ok = product("1.00", 10);
        let short = product("1.00", 3);
        let short_id = short.id;
        let entries = vec![entry(buyer, ok, 1), entry(buyer, short, 5)];

        let err = OrderPlacement::from_cart(buyer, &entries, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::InsufficientStock(short_id));
    }

    #[test]
    fn test_delisted_product_cannot_be_placed() {
        let buyer = UserId::new();
        let mut p = product("1.00", 10);
        p.active = false;
        let id = p.id;

        let err = OrderPlacement::from_cart(buyer, &[entry(buyer, p, 1)], Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::InsufficientStock(id));
    }

    #[test]
    fn test_snapshot_uses_price_at_checkout() {
        let buyer = UserId::new();
        let mut p = product("10.00", 10);
        p.price = Money::parse("12.00").unwrap();

        let placement =
            OrderPlacement::from_cart(buyer, &[entry(buyer, p, 3)], Utc::now()).unwrap();
        assert_eq!(placement.items[0].unit_price.to_string(), "12.00");
        assert_eq!(placement.order.total_amount.to_string(), "36.00");
    }

    #[test]
    fn test_items_in_lock_order_are_sorted() {
        let buyer = UserId::new();
        let entries: Vec<_> = (0..5).map(|_| entry(buyer, product("1.00", 9), 1)).collect();
        let placement = OrderPlacement::from_cart(buyer, &entries, Utc::now()).unwrap();

        let ids: Vec<_> = placement
            .items_in_lock_order()
            .iter()
            .map(|i| i.product_id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
