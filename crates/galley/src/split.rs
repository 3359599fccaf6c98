//! Choosing where to divide an insertion that doesn't fit on the current page.
//!
//! The page breaker asks a [SplitStrategy] for the point at which to cut
//!     the vertical list of a splittable insertion.
//! The material before the cut goes on the current page;
//!     the rest is carried to the next page.

use crate::cost::{AWFUL_BAD, DEPLORABLE};
use crate::node::{Penalty, Vertical};
use galley_core::{badness, Scaled, INF_BAD};

/// Where to cut a vertical list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// Index of the node the list is cut at.
    ///
    /// The node belongs to the remainder.
    /// An index equal to the length of the list means the whole list fits.
    pub index: usize,
    /// Height plus depth of the material before the cut.
    pub height: Scaled,
    /// Penalty of the chosen breakpoint; zero for glue and kern breaks.
    pub penalty: i32,
}

/// A rule for cutting vertical lists.
pub trait SplitStrategy {
    /// Chooses where to cut `list` so that the first part has height at most `height`.
    ///
    /// The depth of the first part is limited to `max_depth`.
    /// When nothing fits the strategy still returns a cut; the caller decides what to do
    ///     with material that overflows.
    fn split(&self, list: &[Vertical], height: Scaled, max_depth: Scaled) -> Split;
}

/// TeX's `\vsplit` rule: the breakpoint with the least badness plus penalty.
///
/// TeX.2021.970.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestVerticalBreak;

/// The last legal breakpoint whose material fits.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyFit;

/// A legal breakpoint in a vertical list, with the totals of the material before it.
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    index: usize,
    penalty: i32,
    height: Scaled,
    depth: Scaled,
    stretch: [Scaled; 4],
    shrink: Scaled,
}

impl Breakpoint {
    fn split(&self) -> Split {
        Split {
            index: self.index,
            height: self.height + self.depth,
            penalty: self.penalty,
        }
    }
}

/// The penalty of breaking a vertical list at position `i`, if that is a legal breakpoint.
///
/// Glue is a legal breakpoint when it follows a non-discardable node,
///     a kern when glue follows it,
///     and a penalty always.
/// The end of the list is a breakpoint with an ejecting penalty.
pub(crate) fn legal_break(list: &[Vertical], i: usize) -> Option<i32> {
    match list.get(i) {
        None => Some(Penalty::EJECT),
        Some(Vertical::Glue(_)) => (i > 0 && list[i - 1].precedes_break()).then_some(0),
        Some(Vertical::Kern(_)) => matches!(list.get(i + 1), Some(Vertical::Glue(_))).then_some(0),
        Some(Vertical::Penalty(p)) => Some(p.value),
        _ => None,
    }
}

/// Visits the legal breakpoints of a list in order until `visit` returns false.
fn scan(list: &[Vertical], max_depth: Scaled, mut visit: impl FnMut(&Breakpoint) -> bool) {
    let mut height = Scaled::ZERO;
    let mut prev_depth = Scaled::ZERO;
    let mut stretch = [Scaled::ZERO; 4];
    let mut shrink = Scaled::ZERO;
    for i in 0..=list.len() {
        let node = list.get(i);
        if let Some(penalty) = legal_break(list, i) {
            if penalty < Penalty::INFINITE {
                let breakpoint = Breakpoint {
                    index: i,
                    penalty,
                    height,
                    depth: prev_depth,
                    stretch,
                    shrink,
                };
                if !visit(&breakpoint) {
                    return;
                }
            }
        }
        match node {
            Some(Vertical::Glue(g)) => {
                height += prev_depth + g.value.width;
                prev_depth = Scaled::ZERO;
                stretch[g.value.stretch_order.index()] += g.value.stretch;
                // Infinite shrink can't be handled when splitting; it is treated as finite.
                shrink += g.value.shrink;
            }
            Some(Vertical::Kern(k)) => {
                height += prev_depth + k.width;
                prev_depth = Scaled::ZERO;
            }
            Some(other) => {
                if let Some((h, d)) = other.box_dimensions() {
                    height += prev_depth + h;
                    prev_depth = d;
                }
            }
            None => {}
        }
        if prev_depth > max_depth {
            height += prev_depth - max_depth;
            prev_depth = max_depth;
        }
    }
}

impl SplitStrategy for BestVerticalBreak {
    fn split(&self, list: &[Vertical], height: Scaled, max_depth: Scaled) -> Split {
        let mut least_cost = AWFUL_BAD;
        let mut best = None;
        scan(list, max_depth, |b| {
            let bad = if b.height < height {
                if b.stretch[1..].iter().any(|s| *s != Scaled::ZERO) {
                    0
                } else {
                    badness(height - b.height, b.stretch[0]) as i64
                }
            } else if b.height - height > b.shrink {
                AWFUL_BAD
            } else {
                badness(b.height - height, b.shrink) as i64
            };
            let cost = if bad < AWFUL_BAD {
                if b.penalty <= Penalty::EJECT {
                    b.penalty as i64
                } else if bad < INF_BAD as i64 {
                    bad + b.penalty as i64
                } else {
                    DEPLORABLE
                }
            } else {
                bad
            };
            if cost <= least_cost {
                least_cost = cost;
                best = Some(b.split());
            }
            cost != AWFUL_BAD && b.penalty > Penalty::EJECT
        });
        log::trace!("best vertical break in {} nodes: {best:?}", list.len());
        best.unwrap_or_else(|| whole(list))
    }
}

impl SplitStrategy for GreedyFit {
    fn split(&self, list: &[Vertical], height: Scaled, max_depth: Scaled) -> Split {
        let mut last_fit = None;
        let mut first_over = None;
        scan(list, max_depth, |b| {
            if b.height <= height {
                last_fit = Some(b.split());
                b.penalty > Penalty::EJECT
            } else {
                first_over = Some(b.split());
                false
            }
        });
        last_fit.or(first_over).unwrap_or_else(|| whole(list))
    }
}

fn whole(list: &[Vertical]) -> Split {
    let (height, depth) = crate::pack::natural_height(list);
    Split {
        index: list.len(),
        height: height + depth,
        penalty: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::*;
    use galley_core::Glue as CoreGlue;

    fn pt(n: i32) -> Scaled {
        Scaled(n << 16)
    }

    fn line() -> Vertical {
        Vertical::HList(HList {
            height: pt(8),
            depth: pt(2),
            ..Default::default()
        })
    }

    fn skip(stretch: i32) -> Vertical {
        Vertical::Glue(Glue::new(CoreGlue {
            stretch: pt(stretch),
            ..Default::default()
        }))
    }

    fn penalty(value: i32) -> Vertical {
        Vertical::Penalty(Penalty { value })
    }

    /// `n` lines of height plus depth 10pt separated by glue that stretches 1pt.
    fn lines(n: usize) -> Vec<Vertical> {
        let mut list = vec![];
        for i in 0..n {
            if i > 0 {
                list.push(skip(1));
            }
            list.push(line());
        }
        list
    }

    #[test]
    fn best_break_fills_the_space_exactly() {
        let list = lines(10);
        let split = BestVerticalBreak.split(&list, pt(48), pt(2));
        // Five lines are 48pt plus 2pt of depth, which fits exactly.
        assert_eq!(split.index, 9);
        assert_eq!(split.height, pt(50));
        assert_eq!(split.penalty, 0);
    }

    #[test]
    fn best_break_whole_list_fits() {
        let list = lines(3);
        let split = BestVerticalBreak.split(&list, pt(100), pt(2));
        assert_eq!(split.index, 3 + 2);
        assert_eq!(split.height, pt(30));
    }

    #[test]
    fn best_break_prefers_bonus_penalty() {
        let fil = || Vertical::Glue(Glue::new(CoreGlue::fil()));
        let list = vec![
            line(),
            fil(),
            line(),
            penalty(-500),
            line(),
            fil(),
            line(),
            fil(),
            line(),
        ];
        // Breaks after two and three lines both have badness 0.
        let split = BestVerticalBreak.split(&list, pt(30), pt(2));
        assert_eq!(split.index, 3);
        assert_eq!(split.penalty, -500);
        assert_eq!(split.height, pt(20));
    }

    #[test]
    fn best_break_stops_at_forced_break() {
        let mut list = lines(4);
        list.insert(3, penalty(Penalty::EJECT));
        let split = BestVerticalBreak.split(&list, pt(1000), pt(2));
        assert_eq!(split.index, 3);
    }

    #[test]
    fn best_break_nothing_fits() {
        let list = lines(3);
        let split = BestVerticalBreak.split(&list, pt(5), pt(2));
        // The first legal break is after the first line.
        assert_eq!(split.index, 1);
        assert_eq!(split.height, pt(10));
    }

    #[test]
    fn greedy_takes_last_fit() {
        let list = lines(10);
        let split = GreedyFit.split(&list, pt(55), pt(2));
        assert_eq!(split.index, 9);
        assert_eq!(split.height, pt(50));
    }

    #[test]
    fn greedy_nothing_fits() {
        let list = lines(3);
        let split = GreedyFit.split(&list, pt(5), pt(2));
        assert_eq!(split.index, 1);
    }

    #[test]
    fn depth_is_limited() {
        let list = lines(3);
        let split = GreedyFit.split(&list, pt(100), pt(1));
        // Each line's excess 1pt of depth moves into the height.
        assert_eq!(split.height, pt(30));
        assert_eq!(split.index, 5);
    }
}
