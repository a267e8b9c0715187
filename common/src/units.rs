use alloy::primitives::{utils::format_units, U256};

pub const ETHER_DECIMALS: u8 = 18;

/// Formats a wei amount as an exact ETH decimal string, e.g. `1.5` or `0`.
pub fn format_ether(wei: U256) -> String {
    // 18 is always a valid unit
    format_token_amount(wei, ETHER_DECIMALS).unwrap_or_else(|_| wei.to_string())
}

/// Scales a raw token amount by `decimals` without going through floats.
///
/// Trailing fractional zeros are dropped and whole amounts have no decimal point.
pub fn format_token_amount(raw: U256, decimals: u8) -> crate::Result<String> {
    let formatted =
        format_units(raw, decimals).map_err(|_| crate::Error::InvalidDecimals(decimals))?;
    Ok(trim_fraction(formatted))
}

fn trim_fraction(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::ZERO), "0");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u128)), "1.5");
        assert_eq!(format_ether(U256::from(2_000_000_000_000_000_000u128)), "2");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(
            format_ether(U256::from(123_456_789_000_000_000_000u128)),
            "123.456789"
        );
    }

    #[test]
    fn test_format_token_amount() {
        assert_eq!(format_token_amount(U256::from(1_234_500u64), 6).unwrap(), "1.2345");
        assert_eq!(format_token_amount(U256::from(100u64), 2).unwrap(), "1");
        assert_eq!(format_token_amount(U256::from(1000u64), 0).unwrap(), "1000");
        assert!(format_token_amount(U256::from(1u64), 200).is_err());
    }
}
