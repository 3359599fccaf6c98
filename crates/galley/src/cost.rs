//! Badness and demerits arithmetic shared by the paragraph and page breakers.

use crate::node::Penalty;
use galley_core::INF_BAD;

/// Demerits of a path that is not allowed.
///
/// Defined in TeX.2021.833.
pub const AWFUL_BAD: i64 = 0o7777777777;

/// Cost of a page break whose badness is at least [INF_BAD].
///
/// Defined in TeX.2021.974.
pub const DEPLORABLE: i64 = 100000;

/// Fitness class of a line, based on how much its glue stretches or shrinks.
///
/// Defined in TeX.2021.817.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fitness {
    VeryLoose = 0,
    Loose = 1,
    Decent = 2,
    Tight = 3,
}

impl Fitness {
    pub const ALL: [Fitness; 4] = [
        Fitness::VeryLoose,
        Fitness::Loose,
        Fitness::Decent,
        Fitness::Tight,
    ];

    /// Fitness of a line whose glue stretches with the given badness.
    pub fn stretching(badness: i32) -> Fitness {
        if badness > 99 {
            Fitness::VeryLoose
        } else if badness > 12 {
            Fitness::Loose
        } else {
            Fitness::Decent
        }
    }

    /// Fitness of a line whose glue shrinks with the given badness.
    pub fn shrinking(badness: i32) -> Fitness {
        if badness > 12 {
            Fitness::Tight
        } else {
            Fitness::Decent
        }
    }

    /// Whether two adjacent lines differ by more than one class.
    pub fn is_jump(self, other: Fitness) -> bool {
        (self as i32 - other as i32).abs() > 1
    }
}

/// Demerits of a break with the given badness and penalty.
///
/// Defined in TeX.2021.859.
pub fn demerits(line_penalty: i32, badness: i32, penalty: i32) -> i64 {
    let d = (line_penalty as i64) + (badness.min(INF_BAD) as i64);
    let mut d = if d.abs() >= 10000 { 100000000 } else { d * d };
    let pi = penalty as i64;
    if penalty > 0 {
        d += pi * pi;
    } else if penalty > Penalty::EJECT && penalty < 0 {
        d -= pi * pi;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demerits_of_perfect_line() {
        assert_eq!(demerits(10, 0, 0), 100);
    }

    #[test]
    fn demerits_with_penalties() {
        assert_eq!(demerits(10, 0, 50), 100 + 2500);
        assert_eq!(demerits(10, 0, -50), 100 - 2500);
        assert_eq!(demerits(10, 0, Penalty::EJECT), 100);
    }

    #[test]
    fn demerits_saturate() {
        assert_eq!(demerits(10, 10000, 0), 100000000);
        assert_eq!(demerits(-10, 10000, 0), (9990i64 * 9990));
    }

    #[test]
    fn fitness_classes() {
        assert_eq!(Fitness::stretching(100), Fitness::VeryLoose);
        assert_eq!(Fitness::stretching(13), Fitness::Loose);
        assert_eq!(Fitness::stretching(12), Fitness::Decent);
        assert_eq!(Fitness::shrinking(13), Fitness::Tight);
        assert!(Fitness::VeryLoose.is_jump(Fitness::Decent));
        assert!(!Fitness::Loose.is_jump(Fitness::Decent));
    }
}
