use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use log::trace;

use crate::db_types::OrderId;

/// Tracks the orders that currently have a chain operation running, so that a second approval, transfer or refund for
/// the same order cannot be started while the first one is outstanding.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    orders: Arc<Mutex<HashSet<OrderId>>>,
}

impl InFlightRegistry {
    /// Claims the order. Returns `None` if the order is already claimed. The claim is released when the guard drops.
    pub fn try_acquire(&self, order_id: &OrderId) -> Option<InFlightGuard> {
        let mut orders = self.orders.lock().unwrap_or_else(PoisonError::into_inner);
        if orders.insert(order_id.clone()) {
            trace!("🔒️ Order [{order_id}] claimed");
            Some(InFlightGuard { orders: Arc::clone(&self.orders), order_id: order_id.clone() })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, order_id: &OrderId) -> bool {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).contains(order_id)
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    orders: Arc<Mutex<HashSet<OrderId>>>,
    order_id: OrderId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.order_id);
        trace!("🔒️ Order [{}] released", self.order_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let registry = InFlightRegistry::default();
        let id = OrderId::from("inv_1");
        let guard = registry.try_acquire(&id).unwrap();
        assert!(registry.is_in_flight(&id));
        assert!(registry.try_acquire(&id).is_none());
        assert!(registry.clone().try_acquire(&OrderId::from("inv_2")).is_some());
        drop(guard);
        assert!(!registry.is_in_flight(&id));
        assert!(registry.try_acquire(&id).is_some());
    }
}
