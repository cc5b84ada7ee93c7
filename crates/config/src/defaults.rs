//! Default values and the reference instrument table.

use crate::InstrumentEntry;

/// Reference deployment instrument table: 57 pairs, ids 1..=57.
pub const REFERENCE_INSTRUMENTS: &[(i32, &str)] = &[
    (1, "BTC/USD"),
    (2, "ETH/USD"),
    (3, "FTM/USD"),
    (4, "SOL/USD"),
    (5, "DOGE/USD"),
    (6, "AVAX/USD"),
    (7, "BNB/USD"),
    (8, "ADA/USD"),
    (9, "LINK/USD"),
    (10, "ATOM/USD"),
    (11, "NEAR/USD"),
    (12, "ARB/USD"),
    (13, "OP/USD"),
    (14, "LTC/USD"),
    (15, "GMX/USD"),
    (16, "EUR/USD"),
    (17, "GBP/USD"),
    (18, "INJ/USD"),
    (19, "TIA/USD"),
    (20, "AERO/USD"),
    (21, "MERL/USD"),
    (22, "SAFE/USD"),
    (23, "OMNI/USD"),
    (24, "REZ/USD"),
    (25, "ETHFI/USD"),
    (26, "BOME/USD"),
    (27, "ORDI/USD"),
    (28, "DYM/USD"),
    (29, "TAO/USD"),
    (30, "WLD/USD"),
    (31, "POPCAT/USD"),
    (32, "ZRO/USD"),
    (33, "RUNE/USD"),
    (34, "MEW/USD"),
    (35, "BEAM/USD"),
    (36, "STRK/USD"),
    (37, "AAVE/USD"),
    (38, "XRP/USD"),
    (39, "TON/USD"),
    (40, "NOT/USD"),
    (41, "RLB/USD"),
    (42, "ALICE/USD"),
    (43, "APE/USD"),
    (44, "APT/USD"),
    (45, "AVAIL/USD"),
    (46, "DEGEN/USD"),
    (47, "RDNT/USD"),
    (48, "SUI/USD"),
    (49, "PEPE/USD"),
    (50, "EIGEN/USD"),
    (51, "XAU/USD"),
    (52, "XAG/USD"),
    (53, "GMCI30/USD"),
    (54, "GMCL2/USD"),
    (55, "GMMEME/USD"),
    (56, "QQQ/USD"),
    (57, "SPY/USD"),
];

pub fn default_instruments() -> Vec<InstrumentEntry> {
    REFERENCE_INSTRUMENTS
        .iter()
        .map(|(id, symbol)| InstrumentEntry {
            id: *id,
            symbol: (*symbol).to_string(),
        })
        .collect()
}

pub fn default_version() -> String {
    "0.1.0".to_string()
}

pub fn default_max_connections() -> u32 {
    5
}

pub fn default_interval_seconds() -> u64 {
    60
}

pub fn default_run_on_startup() -> bool {
    true
}

pub fn default_cycle_timeout_seconds() -> u64 {
    55
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    3000
}
