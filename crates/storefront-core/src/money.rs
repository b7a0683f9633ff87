//! # Money Module
//!
//! Provides the `Money` and `Percentage` types for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Percentage coupons make it worse:                                      │
//! │    $33.33 × 15% = $4.9995 → which cent does the customer get?          │
//! │                                                                         │
//! │  OUR SOLUTION: Exact base-10 decimals (rust_decimal)                    │
//! │    33.33 × 15 / 100 = 4.9995 exactly, rounded only when displayed       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::{Money, Percentage};
//!
//! let price = Money::from_cents(1099);          // $10.99
//! let line = price * 3;                         // $32.97
//! let off = line.percent(Percentage::from_whole(10));
//! assert_eq!(off, "3.297".parse::<Money>().unwrap());
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the store currency, backed by an exact decimal.
///
/// ## Design Decisions
/// - **Decimal (not cents)**: percentage discounts produce sub-cent values
///   that must survive until the order total is known
/// - **Signed**: subtraction is allowed to go negative, callers clamp with
///   [`Money::clamp_non_negative`] where the domain requires it
/// - **Serialized as a string**: `"19.99"` never passes through a float
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► LineItem.unit_price ──► gross line amount            │
/// │                                                 │                       │
/// │  Coupon.value / max_discount / min_purchase ────┤                       │
/// │                                                 ▼                       │
/// │  DiscountBreakdown { subtotal, discount, total } ──► Payment amount     │
/// │                                                 │                       │
/// │                                                 ▼                       │
/// │  Order.subtotal / discount / total, OrderItem.line_total                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "$10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns `self * pct / 100` without any rounding.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::{Money, Percentage};
    ///
    /// let subtotal = Money::from_major(500);
    /// assert_eq!(subtotal.percent(Percentage::from_whole(20)), Money::from_major(100));
    /// ```
    #[inline]
    pub fn percent(&self, pct: Percentage) -> Money {
        Money(self.0 * pct.value() / Decimal::ONE_HUNDRED)
    }

    /// Floors the amount at zero.
    #[inline]
    pub fn clamp_non_negative(self) -> Money {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Rounds to whole cents using Bankers Rounding (round half to even).
    ///
    /// ## When To Use
    /// Display and reconciliation payloads only. Discount and total
    /// computation keep full precision until the very end.
    ///
    /// ```text
    /// 4.995 → 5.00   (9 is odd, round up to even 10)
    /// 4.985 → 4.98   (8 is even, stay)
    /// ```
    pub fn round_to_cents(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money rounded to cents, e.g. `$10.99` or `-$5.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.round_to_cents().0;
        let sign = if rounded < Decimal::ZERO { "-" } else { "" };
        write!(f, "{}${:.2}", sign, rounded.abs())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in whole-percent units: `Percentage::from_whole(20)` is 20%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(Decimal);

impl Percentage {
    /// Wraps a decimal percentage (`12.5` means 12.5%).
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Percentage(value)
    }

    /// Creates a percentage from a whole number.
    #[inline]
    pub fn from_whole(pct: i64) -> Self {
        Percentage(Decimal::from(pct))
    }

    /// Returns the percentage value (20 for 20%).
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Whether this is usable as a discount rate (0% to 100% inclusive).
    pub fn is_valid_discount(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE_HUNDRED
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percentage {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Percentage)
    }
}

impl From<Money> for Percentage {
    /// Coupons store their PERCENTAGE value in the same column as FIXED amounts.
    fn from(value: Money) -> Self {
        Percentage(value.amount())
    }
}

// =============================================================================
// SQLite TEXT encoding
// =============================================================================

/// Both decimal newtypes are stored as TEXT so no precision is lost in SQLite.
#[cfg(feature = "sqlx")]
macro_rules! impl_sqlite_text {
    ($ty:ident) => {
        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.to_string(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Sqlite>>::decode(value)?;
                Ok(text.parse::<$ty>()?)
            }
        }
    };
}

#[cfg(feature = "sqlx")]
impl_sqlite_text!(Money);
#[cfg(feature = "sqlx")]
impl_sqlite_text!(Percentage);

// =============================================================================
// Unit Tests
// =============================================================================
