// Document store collaborator for confirmed orders.
// The pipeline only needs "save this order"; the engine behind it is someone else's.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::order::Order;

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    // Persist a confirmed order. Implementations must tolerate concurrent callers.
    async fn save(&self, order: &Order) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub order: Order,
    pub stored_at: DateTime<Utc>,
}

/// Process-local store keyed by order id, handy for tests and single-node demos.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<String, StoredOrder>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_id: &str) -> Option<StoredOrder> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: &Order) -> anyhow::Result<()> {
        if order.id.is_empty() {
            anyhow::bail!("refusing to store an order without id");
        }
        self.orders.insert(
            order.id.clone(),
            StoredOrder {
                order: order.clone(),
                stored_at: Utc::now(),
            },
        );
        Ok(())
    }
}
