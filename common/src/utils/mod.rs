/// Serialize `u128` amounts as decimal strings.
///
/// Balances above 2^53 lose precision in most JSON consumers, so every
/// amount crossing a JSON boundary (genesis documents, RPC results) is a string.
pub mod amount_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Coin {
        #[serde(with = "super::amount_string")]
        amount: u128,
    }

    #[test]
    fn test_amount_as_string() {
        let coin = Coin {
            amount: 200_000_000_000_000,
        };
        let json = serde_json::to_string(&coin).unwrap();
        assert_eq!(json, r#"{"amount":"200000000000000"}"#);
        assert_eq!(serde_json::from_str::<Coin>(&json).unwrap(), coin);
        assert!(serde_json::from_str::<Coin>(r#"{"amount":"-1"}"#).is_err());
    }
}
