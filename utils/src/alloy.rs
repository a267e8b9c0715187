use alloy::primitives::{Address, U256};

pub trait StringExt {
    fn parse_as_address(&self) -> crate::Result<Address>;

    /// Parses a JSON-RPC quantity such as `0x1b4` into a `u64`.
    fn parse_hex_u64(&self) -> crate::Result<u64>;

    fn parse_hex_u256(&self) -> crate::Result<U256>;
}

impl StringExt for str {
    fn parse_as_address(&self) -> crate::Result<Address> {
        let trimmed = self.trim();
        if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
            return Err(crate::Error::InvalidAddress(self.to_string()));
        }
        trimmed
            .parse::<Address>()
            .map_err(|_| crate::Error::InvalidAddress(self.to_string()))
    }

    fn parse_hex_u64(&self) -> crate::Result<u64> {
        let digits = hex_digits(self)?;
        u64::from_str_radix(digits, 16).map_err(|_| crate::Error::InvalidHexQuantity(self.to_string()))
    }

    fn parse_hex_u256(&self) -> crate::Result<U256> {
        let digits = hex_digits(self)?;
        U256::from_str_radix(digits, 16)
            .map_err(|_| crate::Error::InvalidHexQuantity(self.to_string()))
    }
}

impl StringExt for String {
    fn parse_as_address(&self) -> crate::Result<Address> {
        self.as_str().parse_as_address()
    }

    fn parse_hex_u64(&self) -> crate::Result<u64> {
        self.as_str().parse_hex_u64()
    }

    fn parse_hex_u256(&self) -> crate::Result<U256> {
        self.as_str().parse_hex_u256()
    }
}

fn hex_digits(s: &str) -> crate::Result<&str> {
    s.strip_prefix("0x")
        .filter(|digits| !digits.is_empty())
        .ok_or_else(|| crate::Error::InvalidHexQuantity(s.to_string()))
}
