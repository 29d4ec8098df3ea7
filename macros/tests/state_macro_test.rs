//! Tests for #[derive(State)] macro

use syncengine_macros::State;
use syncengine_core::stream::Version;

#[derive(State, Clone, Debug)]
struct InventoryState {
    pub sku: Option<String>,
    pub on_hand: i64,
    pub reserved: i64,
    #[version]
    pub version: Option<Version>,
}

#[derive(State, Clone, Debug)]
struct SimpleState {
    pub count: i32,
}

#[test]
fn test_version_accessor() {
    let state = InventoryState {
        sku: Some("SKU-1".to_string()),
        on_hand: 10,
        reserved: 0,
        version: Some(Version::new(5)),
    };

    assert_eq!(state.version(), Some(Version::new(5)));
}

#[test]
fn test_set_version() {
    let mut state = InventoryState {
        sku: Some("SKU-1".to_string()),
        on_hand: 10,
        reserved: 0,
        version: None,
    };

    assert_eq!(state.version(), None);

    state.set_version(Version::new(10));
    assert_eq!(state.version(), Some(Version::new(10)));
}

#[test]
fn test_version_none() {
    let state = InventoryState {
        sku: None,
        on_hand: 0,
        reserved: 0,
        version: None,
    };

    assert_eq!(state.version(), None);
}

#[test]
fn test_state_without_version() {
    // SimpleState doesn't have #[version], so it should compile
    // but not have version() and set_version() methods
    let _state = SimpleState { count: 0 };
}
