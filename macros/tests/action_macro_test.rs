//! Tests for #[derive(Action)] macro

use syncengine_macros::Action;
use chrono::{DateTime, Utc};

#[derive(Action, Clone, Debug, PartialEq)]
enum InventoryAction {
    #[command]
    AdjustStock {
        sku: String,
        delta: i64,
    },

    #[command]
    ReserveStock,

    #[command]
    ReleaseReservation {
        order_id: String,
    },

    #[event]
    StockAdjusted {
        sku: String,
        delta: i64,
        timestamp: DateTime<Utc>,
    },

    #[event]
    StockReserved {
        quantity_reserved: u32,
        timestamp: DateTime<Utc>,
    },

    #[event]
    ReservationReleased {
        order_id: String,
        timestamp: DateTime<Utc>,
    },
}

#[test]
fn test_is_command() {
    let action = InventoryAction::AdjustStock {
        sku: "SKU-1".to_string(),
        delta: 5,
    };
    assert!(action.is_command());
    assert!(!action.is_event());
}

#[test]
fn test_is_event() {
    let action = InventoryAction::StockAdjusted {
        sku: "SKU-1".to_string(),
        delta: 5,
        timestamp: Utc::now(),
    };
    assert!(!action.is_command());
    assert!(action.is_event());
}

#[test]
fn test_event_type() {
    let action = InventoryAction::StockAdjusted {
        sku: "SKU-1".to_string(),
        delta: 5,
        timestamp: Utc::now(),
    };
    assert_eq!(action.event_type(), "StockAdjusted.v1");
}

#[test]
fn test_command_event_type() {
    let action = InventoryAction::AdjustStock {
        sku: "SKU-1".to_string(),
        delta: 5,
    };
    // Commands don't have event types
    assert_eq!(action.event_type(), "unknown");
}

#[test]
fn test_unit_command() {
    let action = InventoryAction::ReserveStock;
    assert!(action.is_command());
    assert!(!action.is_event());
}

#[test]
fn test_all_commands_identified() {
    let commands = vec![
        InventoryAction::AdjustStock {
            sku: "SKU-1".to_string(),
            delta: 5,
        },
        InventoryAction::ReserveStock,
        InventoryAction::ReleaseReservation {
            order_id: "order-1".to_string(),
        },
    ];

    for cmd in commands {
        assert!(cmd.is_command(), "Expected command: {cmd:?}");
        assert!(!cmd.is_event(), "Should not be event: {cmd:?}");
    }
}

#[test]
fn test_all_events_identified() {
    let events = vec![
        InventoryAction::StockAdjusted {
            sku: "SKU-1".to_string(),
            delta: 5,
            timestamp: Utc::now(),
        },
        InventoryAction::StockReserved {
            quantity_reserved: 3,
            timestamp: Utc::now(),
        },
        InventoryAction::ReservationReleased {
            order_id: "order-1".to_string(),
            timestamp: Utc::now(),
        },
    ];

    for event in events {
        assert!(!event.is_command(), "Should not be command: {event:?}");
        assert!(event.is_event(), "Expected event: {event:?}");
    }
}

#[test]
fn test_event_types_unique() {
    let events = vec![
        (
            InventoryAction::StockAdjusted {
                sku: "SKU-1".to_string(),
                delta: 5,
                timestamp: Utc::now(),
            },
            "StockAdjusted.v1",
        ),
        (
            InventoryAction::StockReserved {
                quantity_reserved: 3,
                timestamp: Utc::now(),
            },
            "StockReserved.v1",
        ),
        (
            InventoryAction::ReservationReleased {
                order_id: "order-1".to_string(),
                timestamp: Utc::now(),
            },
            "ReservationReleased.v1",
        ),
    ];

    for (event, expected_type) in events {
        assert_eq!(event.event_type(), expected_type);
    }
}
