// Coin - Denominated amounts
use super::primitives::Amount;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A single denominated amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_str")]
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinParseError;

    /// Parses `<amount><denom>`, e.g. `1000stake-atto`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '-'))
            .ok_or_else(|| CoinParseError::MissingDenom(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(CoinParseError::InvalidAmount(s.to_string()));
        }
        let amount = amount
            .parse::<Amount>()
            .map_err(|_| CoinParseError::InvalidAmount(s.to_string()))?;
        if !denom.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/') {
            return Err(CoinParseError::InvalidDenom(denom.to_string()));
        }
        Ok(Coin::new(denom, amount))
    }
}

/// Normalized coin list: sorted by denom, one entry per denom.
/// Zero and negative amounts are kept so validators can report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new(coins: Vec<Coin>) -> Self {
        let mut out: Vec<Coin> = Vec::with_capacity(coins.len());
        for coin in coins {
            match out.iter_mut().find(|c| c.denom == coin.denom) {
                Some(existing) => existing.amount = existing.amount.saturating_add(coin.amount),
                None => out.push(coin),
            }
        }
        out.sort_by(|a, b| a.denom.cmp(&b.denom));
        Coins(out)
    }

    pub fn empty() -> Self {
        Coins(Vec::new())
    }

    pub fn single(denom: impl Into<String>, amount: Amount) -> Self {
        Self::new(vec![Coin::new(denom, amount)])
    }

    /// True only for a list with no entries; `[0stake]` is not empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every entry is zero (including the empty list)
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|c| c.amount == 0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> Amount {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    pub fn plus(&self, other: &Coins) -> Coins {
        Coins::new(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// True when every denom in `required` is covered by at least that amount
    pub fn covers(&self, required: &Coins) -> bool {
        required.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for Coins {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Coins::empty());
        }
        let coins = s
            .split(',')
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Coins::new(coins))
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Coins::new(vec![coin])
    }
}

impl<'de> Deserialize<'de> for Coins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Coin>::deserialize(deserializer).map(Coins::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoinParseError {
    #[error("Missing denomination in '{0}'")]
    MissingDenom(String),

    #[error("Invalid amount in '{0}'")]
    InvalidAmount(String),

    #[error("Invalid denomination '{0}'")]
    InvalidDenom(String),
}

/// Amounts travel as decimal strings so i128 survives JSON
pub(crate) mod amount_str {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coins_normalize() {
        let coins = Coins::new(vec![
            Coin::new("b", 5),
            Coin::new("a", 1),
            Coin::new("b", 3),
            Coin::new("c", 0),
        ]);
        assert_eq!(coins.len(), 3);
        assert_eq!(coins.iter().next().unwrap().denom, "a");
        assert_eq!(coins.amount_of("b"), 8);
        assert_eq!(coins.amount_of("c"), 0);
    }

    #[test]
    fn test_zero_amounts_are_kept() {
        let zero = Coins::single("stake-atto", 0);
        assert!(!zero.is_empty());
        assert!(zero.is_zero());
        assert_eq!(zero.to_string(), "0stake-atto");

        let json: Coins = serde_json::from_str(r#"[{"denom":"stake-atto","amount":"0"}]"#).unwrap();
        assert_eq!(json, zero);
        assert!(Coins::empty().is_zero());
        assert!(!Coins::single("a", 1).is_zero());
    }

    #[test]
    fn test_coin_parse() {
        let coin: Coin = "1000stake-atto".parse().unwrap();
        assert_eq!(coin, Coin::new("stake-atto", 1000));

        let neg: Coin = "-5stake-atto".parse().unwrap();
        assert!(neg.is_negative());

        assert!(matches!("stake".parse::<Coin>(), Err(CoinParseError::InvalidAmount(_))));
        assert!(matches!("100".parse::<Coin>(), Err(CoinParseError::MissingDenom(_))));
    }

    #[test]
    fn test_coins_covers() {
        let have: Coins = "10a,20b".parse().unwrap();
        assert!(have.covers(&"10a".parse().unwrap()));
        assert!(have.covers(&"5a,20b".parse().unwrap()));
        assert!(!have.covers(&"11a".parse().unwrap()));
        assert!(!have.covers(&"1c".parse().unwrap()));
    }

    #[test]
    fn test_coins_json_uses_string_amounts() {
        let coins = Coins::single("stake-atto", 4_000_000_000_000_000_000_000);
        let json = serde_json::to_string(&coins).unwrap();
        assert_eq!(json, r#"[{"denom":"stake-atto","amount":"4000000000000000000000"}]"#);
        let back: Coins = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coins);
    }
}
