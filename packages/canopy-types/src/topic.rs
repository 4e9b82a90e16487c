//! Bus topic names.
//!
//! Gateway-scoped topics embed the gateway's address in decimal; patterns use
//! a trailing `*` glob, which both the Redis bus and the in-memory test bus
//! understand.

use crate::address::Address;

pub const HELO_REQUEST: &str = "helo/request";
pub const GLOBAL_MOVEMENT: &str = "global/movement";
pub const GLOBAL_TEMPERATURE: &str = "global/temperature";
pub const GLOBAL_PATTERN: &str = "global/*";
pub const SNIFFER_PATTERN: &str = "sniffer/*";

/// Decoded packets from a gateway's radio bridge.
pub fn receive(gateway: Address) -> String {
    format!("receive/{}", gateway.value())
}

/// Replies from a gateway's decision engine, consumed by its bridge.
pub fn command(gateway: Address) -> String {
    format!("command/{}", gateway.value())
}

/// Coordinator verdicts addressed to one gateway.
pub fn helo_response(gateway: Address) -> String {
    format!("helo/response/{}", gateway.value())
}

/// Copies of packets that tripped an anomaly policy.
pub fn anomaly(kind: &str, gateway: Address) -> String {
    format!("anomaly/{}/{}", kind, gateway.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_topics_use_decimal_addresses() {
        let gw = Address(0x10);
        assert_eq!(receive(gw), "receive/16");
        assert_eq!(command(gw), "command/16");
        assert_eq!(helo_response(gw), "helo/response/16");
        assert_eq!(anomaly("air_temperature", gw), "anomaly/air_temperature/16");
    }
}
