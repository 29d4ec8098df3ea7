//! Channel status vocabulary → canonical status mapping (spec §4.1, §4.4
//! stage 3): "unknown values map to `pending` (orders)... never to a
//! terminal status."

use syncengine_domain::OrderStatus;

/// Map a channel's raw order status string to the canonical [`OrderStatus`],
/// consulting `known` (the channel-specific vocabulary) first and falling
/// back to `Pending` for anything unrecognised.
#[must_use]
pub fn normalise_order_status(raw: &str, known: &[(&str, OrderStatus)]) -> OrderStatus {
    known
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(raw))
        .map_or(OrderStatus::Pending, |(_, status)| *status)
}
