// 1.0: all the primitives live here. nothing in the engine works without these types.
// trader ids, asset types, prices, amounts, widths, payout percentages, timestamps.
// each is a newtype so the compiler catches type mixups.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraderId(pub u64);

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trader#{}", self.0)
    }
}

// 1.1: underlying instrument an orderbook tracks. one orderbook per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Btc,
    Eth,
    Bnb,
    Gmx,
}

impl AssetType {
    pub const ALL: [AssetType; 4] = [AssetType::Btc, AssetType::Eth, AssetType::Bnb, AssetType::Gmx];

    pub fn as_u8(&self) -> u8 {
        match self {
            AssetType::Btc => 0,
            AssetType::Eth => 1,
            AssetType::Bnb => 2,
            AssetType::Gmx => 3,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AssetType::Btc => "BTC",
            AssetType::Eth => "ETH",
            AssetType::Bnb => "BNB",
            AssetType::Gmx => "GMX",
        }
    }
}

impl TryFrom<u8> for AssetType {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(AssetType::Btc),
            1 => Ok(AssetType::Eth),
            2 => Ok(AssetType::Bnb),
            3 => Ok(AssetType::Gmx),
            other => Err(other),
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// 1.2: price in quote currency per unit of base. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: quote currency amount. stakes, balances, payouts all use this.
// fund movements go through the checked_* variants so an overflow aborts the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(&self, other: Quote) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Quote) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(&self, factor: Decimal) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    // floors at zero. used where a debit may never drive a balance negative.
    pub fn saturating_sub(&self, other: Quote) -> Self {
        if other.0 >= self.0 {
            Self::zero()
        } else {
            Self(self.0 - other.0)
        }
    }

    pub fn min(self, other: Quote) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Fixed-point scale used when a width is embedded in an order id.
pub const WIDTH_SCALE: i64 = 10_000;

// 1.4: band half-width as a percentage of base price. 5 = ±5%.
// strictly between 0 and 100 so a derived band is never empty or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WidthPct(Decimal);

impl WidthPct {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO && value < dec!(100) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        self.0 / dec!(100)
    }

    // 5% → 50_000. truncates anything finer than the scale.
    pub fn scaled(&self) -> i64 {
        (self.0 * Decimal::from(WIDTH_SCALE))
            .trunc()
            .to_i64()
            .unwrap_or(i64::MAX)
    }
}

impl fmt::Display for WidthPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// 1.5: share of a settled escrow paid to the position holder. 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PayoutPct(u8);

impl PayoutPct {
    pub const LOSS: PayoutPct = PayoutPct(0);
    pub const WIN: PayoutPct = PayoutPct(100);

    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        if value <= 100 {
            Some(Self(value))
        } else {
            None
        }
    }

    // clamps anything above 100 down to a full win
    pub fn clamped(value: u128) -> Self {
        Self(value.min(100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::from(self.0) / dec!(100)
    }
}

impl fmt::Display for PayoutPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// 1.6: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn checked_add_millis(&self, ms: i64) -> Option<Self> {
        self.0.checked_add(ms).map(Self)
    }

    // zero when other is earlier
    pub fn millis_until(&self, other: &Timestamp) -> i64 {
        other.0.saturating_sub(self.0).max(0)
    }
}
