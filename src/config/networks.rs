//! Wallet network table
//!
//! Networks the wallet provider can be asked to switch to. When the provider
//! does not know a chain, the same entry is used to add it.

use serde::{Deserialize, Serialize};

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const BASE: u64 = 8453;
    pub const BSC: u64 = 56;
    pub const POLYGON: u64 = 137;
}

/// Public RPC endpoints (rate limited)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const BASE: &str = "https://mainnet.base.org";
    pub const BSC: &str = "https://bsc-dataseed.binance.org";
    pub const POLYGON: &str = "https://polygon-rpc.com";
}

/// A network the wallet can be pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Stable identifier used by the UI (e.g. "ethereum")
    pub id: String,
    pub chain_id: u64,
    pub name: String,
    /// Native currency symbol
    pub symbol: String,
    pub rpc_url: String,
}

impl NetworkConfig {
    /// Chain id in the 0x-prefixed hex form wallet providers expect
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkTable {
    networks: Vec<NetworkConfig>,
}

impl NetworkTable {
    pub fn with_networks(networks: Vec<NetworkConfig>) -> Self {
        Self { networks }
    }

    pub fn get(&self, id: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.id == id)
    }

    pub fn by_chain_id(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.networks.iter()
    }
}

impl Default for NetworkTable {
    fn default() -> Self {
        let entry = |id: &str, chain_id, name: &str, symbol: &str, rpc: &str| NetworkConfig {
            id: id.to_string(),
            chain_id,
            name: name.to_string(),
            symbol: symbol.to_string(),
            rpc_url: rpc.to_string(),
        };

        Self {
            networks: vec![
                entry("ethereum", chains::ETHEREUM, "Ethereum", "ETH", public_rpcs::ETHEREUM),
                entry("base", chains::BASE, "Base", "ETH", public_rpcs::BASE),
                entry("bnb", chains::BSC, "BNB Chain", "BNB", public_rpcs::BSC),
                entry("polygon", chains::POLYGON, "Polygon", "POL", public_rpcs::POLYGON),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_hex_is_lowercase_prefixed() {
        let table = NetworkTable::default();
        let base = table.get("base").unwrap();
        assert_eq!(base.chain_id_hex(), "0x2105");
        assert_eq!(table.by_chain_id(56).unwrap().name, "BNB Chain");
        assert!(table.get("unknown").is_none());
    }
}
