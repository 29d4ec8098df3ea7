//! Domain model for the channel synchronisation engine: the reducers
//! backing the Inventory Reconciler and the Order Ingestion Pipeline, plus
//! the shared value types (identifiers, money, the domain event envelope)
//! they're built from.

pub mod event;
pub mod ids;
pub mod inventory;
pub mod money;
pub mod order;

pub use event::DomainEvent;
pub use ids::{ChannelAccountId, ChannelId, OrderId, ProductId, Sku};
pub use inventory::{InventoryAction, InventoryEnvironment, InventoryReducer, InventoryState};
pub use money::{CurrencyCode, Money, MoneyError};
pub use order::{
    select_fulfilment_location, FulfilmentCandidate, FulfilmentRoutingPolicy, LineItem, OrderAction, OrderEnvironment,
    OrderReducer, OrderState, OrderStatus,
};
