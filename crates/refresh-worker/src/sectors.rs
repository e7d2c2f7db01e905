use std::collections::HashMap;

/// NSE large caps refreshed when no symbol list is configured, with their sector.
pub const DEFAULT_UNIVERSE: &[(&str, &str)] = &[
    // Banking & financials
    ("HDFCBANK", "Banking"),
    ("ICICIBANK", "Banking"),
    ("SBIN", "Banking"),
    ("KOTAKBANK", "Banking"),
    ("AXISBANK", "Banking"),
    ("BAJFINANCE", "Financial Services"),
    // IT services
    ("TCS", "Information Technology"),
    ("INFY", "Information Technology"),
    ("WIPRO", "Information Technology"),
    ("TECHM", "Information Technology"),
    ("HCLTECH", "Information Technology"),
    // Energy & utilities
    ("RELIANCE", "Oil & Gas"),
    ("ONGC", "Oil & Gas"),
    ("COALINDIA", "Mining"),
    ("POWERGRID", "Power"),
    ("NTPC", "Power"),
    // Pharma
    ("SUNPHARMA", "Pharmaceuticals"),
    ("DRREDDY", "Pharmaceuticals"),
    ("CIPLA", "Pharmaceuticals"),
    // Consumer
    ("HINDUNILVR", "FMCG"),
    ("ITC", "FMCG"),
    ("TITAN", "Consumer Durables"),
    ("ASIANPAINT", "Consumer Durables"),
    // Auto
    ("MARUTI", "Automobile"),
    ("TATAMOTORS", "Automobile"),
    // Industrials & materials
    ("LT", "Capital Goods"),
    ("ADANIENT", "Capital Goods"),
    ("TATASTEEL", "Metals"),
    ("ULTRACEMCO", "Cement"),
    // Telecom
    ("BHARTIARTL", "Telecom"),
];

pub fn default_symbols() -> Vec<String> {
    DEFAULT_UNIVERSE.iter().map(|(symbol, _)| symbol.to_string()).collect()
}

pub fn default_sector_map() -> HashMap<String, String> {
    DEFAULT_UNIVERSE
        .iter()
        .map(|(symbol, sector)| (symbol.to_string(), sector.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_universe() {
        let symbols = default_symbols();
        assert_eq!(symbols.len(), 30);

        let unique: HashSet<&String> = symbols.iter().collect();
        assert_eq!(unique.len(), 30);

        let sectors = default_sector_map();
        assert_eq!(sectors.get("TCS").map(String::as_str), Some("Information Technology"));
        assert!(symbols.iter().all(|s| sectors.contains_key(s)));
    }
}
