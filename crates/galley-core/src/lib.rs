//! Core types and abstractions used in Galley.
//!
//! This crate contains the fixed-point arithmetic that every other Galley crate
//!     is built on: scaled numbers, glue, orders of infinity and the badness function.

use std::fmt::Write;

/// A fixed-point number in units of 2^-16 points.
///
/// Every dimension in Galley is one of these; there are no floats in the breakers.
/// The arithmetic follows part 7 of TeX (TeX.2021.99 onwards) so that
///     results agree with TeX to the scaled point.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scaled(pub i32);

impl Scaled {
    pub const ZERO: Scaled = Scaled(0);

    /// One point.
    pub const ONE: Scaled = Scaled(1 << 16);

    pub const TWO: Scaled = Scaled(1 << 17);

    /// The largest legal dimension, just under 16384pt (TeX.2021.421).
    ///
    /// The inner `i32` can hold twice this; the headroom keeps sums of two dimensions from overflowing.
    pub const MAX_DIMEN: Scaled = Scaled((1 << 30) - 1);

    /// A whole number of points; fails outside the open range `(-16384, 16384)`.
    pub fn from_integer(i: i32) -> Result<Scaled, OverflowError> {
        match i {
            -16383..=16383 => Ok(Scaled(i << 16)),
            _ => Err(OverflowError),
        }
    }

    /// Rounds the decimal fraction `0.d1d2d3...` to the nearest scaled number (TeX.2021.102).
    pub fn from_decimal_fraction(digits: &[u8]) -> Scaled {
        let doubled = digits
            .iter()
            .rev()
            .fold(0_i32, |acc, &d| (acc + i32::from(d) * Scaled::TWO.0) / 10);
        Scaled((doubled + 1) / 2)
    }

    /// Creates a scaled number from an integer part, decimal digits of a fractional part
    ///     and a unit.
    ///
    /// This is the conversion performed when scanning a dimension like `1.5in`.
    /// It follows TeX.2021.458: the integer and fractional parts are
    ///     converted separately and then recombined.
    pub fn new(
        integer: i32,
        fraction_digits: &[u8],
        unit: ScaledUnit,
    ) -> Result<Scaled, OverflowError> {
        let fraction = Scaled::from_decimal_fraction(fraction_digits);
        if unit == ScaledUnit::ScaledPoint {
            return Ok(Scaled(integer));
        }
        let (n, d) = unit.conversion_fraction();
        let (mut i, mut f) = (integer, fraction.0);
        if (n, d) != (1, 1) {
            let (whole, remainder) = Scaled(i).xn_over_d(n, d)?;
            i = whole.0;
            f = (n * f + (1 << 16) * remainder.0) / d;
            i += f / (1 << 16);
            f %= 1 << 16;
        }
        if i >= (1 << 14) {
            return Err(OverflowError);
        }
        Ok(Scaled(i * Scaled::ONE.0 + f))
    }

    /// Quotient and remainder of `self * n / d`, for `n` and `d` at most 2^16 (TeX.2021.107).
    ///
    /// The product is taken in 64 bits, so it cannot overflow.
    pub fn xn_over_d(&self, n: i32, d: i32) -> Result<(Scaled, Scaled), OverflowError> {
        debug_assert!(n <= 1 << 16 && d <= 1 << 16);
        let product = i64::from(self.0) * i64::from(n);
        let (quotient, remainder) = (product / i64::from(d), product % i64::from(d));
        if quotient.abs() > i64::from(Scaled::MAX_DIMEN.0) {
            return Err(OverflowError);
        }
        Ok((Scaled(quotient as i32), Scaled(remainder as i32)))
    }

    /// `n * self + y`, or an error if the result would exceed [Scaled::MAX_DIMEN] (TeX.2021.105).
    pub fn nx_plus_y(self, n: i32, y: Scaled) -> Result<Scaled, OverflowError> {
        let result = i64::from(self.0) * i64::from(n) + i64::from(y.0);
        if result.abs() > i64::from(Scaled::MAX_DIMEN.0) {
            return Err(OverflowError);
        }
        Ok(Scaled(result as i32))
    }

    pub fn integer_part(self) -> i32 {
        self.0 / Scaled::ONE.0
    }

    pub fn fractional_part(self) -> Scaled {
        self % Scaled::ONE.0
    }

    pub fn abs(self) -> Scaled {
        Scaled(self.0.abs())
    }

    /// The value of this number as a float, in points.
    ///
    /// Only used for glue ratios and human readable output.
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / Scaled::ONE.0 as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowError;

impl std::fmt::Display for OverflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dimension too large")
    }
}

impl std::error::Error for OverflowError {}

/// Prints the shortest decimal that reads back as the same number, like `\showthe` (TeX.2021.103).
impl std::fmt::Display for Scaled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 && self.integer_part() == 0 {
            f.write_char('-')?;
        }
        write!(f, "{}.", self.integer_part())?;
        let mut rest = self.abs().fractional_part().0 * 10 + 5;
        let mut precision = 10;
        loop {
            if precision > Scaled::ONE.0 {
                rest += (1 << 15) - 50000;
            }
            let digit = (rest >> 16).clamp(0, 9) as u32;
            f.write_char(char::from_digit(digit, 10).unwrap_or('0'))?;
            rest = (rest & 0xFFFF) * 10;
            precision *= 10;
            if rest <= precision {
                break;
            }
        }
        f.write_str("pt")
    }
}

impl std::ops::Add<Scaled> for Scaled {
    type Output = Scaled;
    fn add(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign<Scaled> for Scaled {
    fn add_assign(&mut self, rhs: Scaled) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub<Scaled> for Scaled {
    type Output = Scaled;
    fn sub(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign<Scaled> for Scaled {
    fn sub_assign(&mut self, rhs: Scaled) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul<i32> for Scaled {
    type Output = Scaled;
    fn mul(self, rhs: i32) -> Self::Output {
        Scaled(self.0 * rhs)
    }
}

impl std::ops::Div<i32> for Scaled {
    type Output = Scaled;
    fn div(self, rhs: i32) -> Self::Output {
        Scaled(self.0 / rhs)
    }
}

impl std::ops::Rem<i32> for Scaled {
    type Output = Scaled;
    fn rem(self, rhs: i32) -> Self::Output {
        Scaled(self.0 % rhs)
    }
}

impl std::ops::Neg for Scaled {
    type Output = Scaled;
    fn neg(self) -> Self::Output {
        Scaled(-self.0)
    }
}

impl std::iter::Sum for Scaled {
    fn sum<I: Iterator<Item = Scaled>>(iter: I) -> Self {
        iter.fold(Scaled::ZERO, |a, b| a + b)
    }
}

/// A physical unit that a dimension can be written in (TeX.2021.458).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaledUnit {
    Point,
    Pica,
    Inch,
    BigPoint,
    Centimeter,
    Millimeter,
    DidotPoint,
    Cicero,
    ScaledPoint,
}

impl ScaledUnit {
    /// Looks up a unit by its keyword, like `pc` for [ScaledUnit::Pica].
    pub fn parse(s: &str) -> Option<Self> {
        use ScaledUnit::*;
        Some(match s {
            "pt" => Point,
            "pc" => Pica,
            "in" => Inch,
            "bp" => BigPoint,
            "cm" => Centimeter,
            "mm" => Millimeter,
            "dd" => DidotPoint,
            "cc" => Cicero,
            "sp" => ScaledPoint,
            _ => return None,
        })
    }

    /// The ratio `(n, d)` such that one of this unit is `n/d` points.
    pub fn conversion_fraction(&self) -> (i32, i32) {
        use ScaledUnit::*;
        match self {
            Point => (1, 1),
            Pica => (12, 1),
            Inch => (7227, 100),
            BigPoint => (7227, 7200),
            Centimeter => (7227, 254),
            Millimeter => (7227, 2540),
            DidotPoint => (1238, 1157),
            Cicero => (14856, 1157),
            ScaledPoint => (1, 1 << 16),
        }
    }
}

/// A glue specification: natural width plus stretch and shrink (TeX.2021.150).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glue {
    pub width: Scaled,
    pub stretch: Scaled,
    pub stretch_order: GlueOrder,
    pub shrink: Scaled,
    pub shrink_order: GlueOrder,
}

impl Glue {
    /// Rigid glue of the given width.
    pub fn rigid(width: Scaled) -> Glue {
        Glue {
            width,
            ..Default::default()
        }
    }

    /// Glue with no natural width that stretches with first order infinity.
    ///
    /// This is the glue `\hfil` or `\vfil`.
    pub fn fil() -> Glue {
        Glue {
            stretch: Scaled::ONE,
            stretch_order: GlueOrder::Fil,
            ..Default::default()
        }
    }

    /// Compares two stretch (or shrink) components.
    ///
    /// Comparison is lexicographic on the order of infinity and then the magnitude,
    ///     so any amount of [GlueOrder::Fil] glue beats any finite amount.
    pub fn compare_components(
        a: (GlueOrder, Scaled),
        b: (GlueOrder, Scaled),
    ) -> std::cmp::Ordering {
        a.cmp(&b)
    }
}

/// How infinite a stretch or shrink component is.
///
/// When a list is set, only the glue of the highest order present stretches (or shrinks);
///     everything of a lower order keeps its natural width.
/// `\hfil` at both ends of a line centres it this way.
/// The derived ordering runs from weakest to strongest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlueOrder {
    #[default]
    Normal,
    Fil,
    Fill,
    Filll,
}

impl GlueOrder {
    /// All orders, weakest first.
    pub const ALL: [GlueOrder; 4] = [
        GlueOrder::Normal,
        GlueOrder::Fil,
        GlueOrder::Fill,
        GlueOrder::Filll,
    ];

    /// Parses an infinite glue order from a keyword.
    pub fn parse(s: &str) -> Option<Self> {
        use GlueOrder::*;
        Some(match s {
            "fil" => Fil,
            "fill" => Fill,
            "filll" => Filll,
            _ => return None,
        })
    }

    /// Index of this order in a per-order array of totals.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Running totals of glue, split by order of infinity.
///
/// TeX keeps these as the arrays `total_stretch` and `total_shrink` (TeX.2021.646).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GlueTotals {
    pub stretch: [Scaled; 4],
    pub shrink: [Scaled; 4],
}

impl GlueTotals {
    pub fn add(&mut self, glue: &Glue) {
        self.stretch[glue.stretch_order.index()] += glue.stretch;
        self.shrink[glue.shrink_order.index()] += glue.shrink;
    }

    /// The highest order with non-zero stretch.
    ///
    /// TeX.2021.659.
    pub fn stretch_order(&self) -> GlueOrder {
        highest_nonzero_order(&self.stretch)
    }

    /// The highest order with non-zero shrink.
    ///
    /// TeX.2021.665.
    pub fn shrink_order(&self) -> GlueOrder {
        highest_nonzero_order(&self.shrink)
    }
}

fn highest_nonzero_order(totals: &[Scaled; 4]) -> GlueOrder {
    for order in GlueOrder::ALL.into_iter().rev() {
        if totals[order.index()] != Scaled::ZERO {
            return order;
        }
    }
    GlueOrder::Normal
}

/// The badness value used to denote "infinitely bad".
///
/// Defined in TeX.2021.108.
pub const INF_BAD: i32 = 10000;

/// Computes the badness of a box with excess `t` and total stretch (or shrink) `s`.
///
/// This is an approximation to `100(t/s)^3` that uses only integer arithmetic
///     and therefore gives the same result on every machine.
/// The result is capped at [INF_BAD].
///
/// Defined in TeX.2021.108.
pub fn badness(t: Scaled, s: Scaled) -> i32 {
    let (t, s) = (t.0, s.0);
    if t == 0 {
        return 0;
    }
    if s <= 0 {
        return INF_BAD;
    }
    let r = if t <= 7230584 {
        (t * 297) / s
    } else if s >= 1663497 {
        t / (s / 297)
    } else {
        t
    };
    if r > 1290 {
        INF_BAD
    } else {
        (r * r * r + 0o400000) / 0o1000000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glue_fits_in_two_words() {
        assert_eq!(16, std::mem::size_of::<Glue>());
    }

    #[test]
    fn display_negative_and_rounded() {
        assert_eq!("-0.5pt", format!("{}", Scaled(-(1 << 15))));
        assert_eq!("0.33333pt", format!("{}", Scaled(21845)));
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(Err(OverflowError), Scaled::from_integer(16384));
        assert_eq!(Err(OverflowError), Scaled::MAX_DIMEN.nx_plus_y(2, Scaled::ZERO));
        assert_eq!(Ok(Scaled::ONE * 7), Scaled::ONE.nx_plus_y(3, Scaled::ONE * 4));
    }

    #[test]
    fn badness_zero_when_exact() {
        assert_eq!(0, badness(Scaled::ZERO, Scaled::ZERO));
        assert_eq!(0, badness(Scaled::ZERO, Scaled::ONE));
    }

    #[test]
    fn badness_infinite_without_stretch() {
        assert_eq!(INF_BAD, badness(Scaled::ONE, Scaled::ZERO));
    }

    #[test]
    fn badness_of_full_stretch_is_100() {
        assert_eq!(100, badness(Scaled::ONE * 3, Scaled::ONE * 3));
    }

    #[test]
    fn badness_of_half_stretch() {
        // 100 * (1/2)^3 = 12.5, rounded down by the approximation
        assert_eq!(12, badness(Scaled::ONE, Scaled::TWO));
    }

    #[test]
    fn badness_caps_at_inf_bad() {
        assert_eq!(INF_BAD, badness(Scaled::ONE * 100, Scaled::ONE));
    }

    #[test]
    fn glue_order_is_ordered_by_strength() {
        assert!(GlueOrder::Normal < GlueOrder::Fil);
        assert!(GlueOrder::Fil < GlueOrder::Fill);
        assert!(GlueOrder::Fill < GlueOrder::Filll);
    }

    #[test]
    fn glue_comparison_is_lexicographic() {
        use std::cmp::Ordering;
        let big_finite = (GlueOrder::Normal, Scaled::ONE * 1000);
        let small_infinite = (GlueOrder::Fil, Scaled(1));
        assert_eq!(
            Ordering::Less,
            Glue::compare_components(big_finite, small_infinite)
        );
        assert_eq!(
            Ordering::Greater,
            Glue::compare_components((GlueOrder::Fil, Scaled(2)), small_infinite)
        );
    }

    #[test]
    fn glue_totals_order() {
        let mut totals: GlueTotals = Default::default();
        totals.add(&Glue {
            stretch: Scaled::ONE,
            ..Default::default()
        });
        assert_eq!(GlueOrder::Normal, totals.stretch_order());
        totals.add(&Glue::fil());
        assert_eq!(GlueOrder::Fil, totals.stretch_order());
        assert_eq!(GlueOrder::Normal, totals.shrink_order());
    }

    #[test]
    fn new_from_parts() {
        assert_eq!(Ok(Scaled::ONE * 12), Scaled::new(1, &[], ScaledUnit::Pica));
        assert_eq!(
            Ok(Scaled::ONE + Scaled(1 << 15)),
            Scaled::new(1, &[5], ScaledUnit::Point)
        );
        assert_eq!(Ok(Scaled(7)), Scaled::new(7, &[], ScaledUnit::ScaledPoint));
    }

    #[test]
    fn display() {
        assert_eq!("1.0pt", format!("{}", Scaled::ONE));
        assert_eq!("1.5pt", format!("{}", Scaled::ONE + Scaled(1 << 15)));
    }
}
