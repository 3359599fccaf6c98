//! Packaging: building boxes with their glue set.
//!
//! These are the `hpack` and `vpack` routines of TeX.2021 part 33.

use crate::diagnostics::{report, BoxKind, Diagnostic};
use crate::node::*;
use crate::params::Params;
use galley_core::{badness, GlueOrder, GlueTotals, Scaled};

/// How the size of a packed box is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The box has exactly this size.
    Exactly(Scaled),
    /// The box has its natural size plus this amount.
    Additional(Scaled),
}

impl Target {
    fn resolve(self, natural: Scaled) -> Scaled {
        match self {
            Target::Exactly(w) => w,
            Target::Additional(w) => natural + w,
        }
    }
}

/// Packages a horizontal list into a box.
///
/// Overfull, tight, loose and underfull boxes are reported using the
///     `hbadness` and `hfuzz` parameters.
///
/// TeX.2021.649.
pub fn hpack(
    list: Vec<Horizontal>,
    target: Target,
    params: &Params,
    diagnostics: &mut Vec<Diagnostic>,
) -> HList {
    let mut w = Scaled::ZERO;
    let mut h = Scaled::ZERO;
    let mut d = Scaled::ZERO;
    let mut totals = GlueTotals::default();
    for node in &list {
        match node {
            Horizontal::Char(c) => {
                w += c.width;
                h = h.max(c.height);
                d = d.max(c.depth);
            }
            Horizontal::HList(b) => {
                w += b.width;
                h = h.max(b.height - b.shift_amount);
                d = d.max(b.depth + b.shift_amount);
            }
            Horizontal::VList(b) => {
                w += b.width;
                h = h.max(b.height - b.shift_amount);
                d = d.max(b.depth + b.shift_amount);
            }
            Horizontal::Rule(r) => {
                w += r.width_or_zero();
                h = h.max(r.height_or_zero());
                d = d.max(r.depth_or_zero());
            }
            Horizontal::Discretionary(disc) => {
                for node in &disc.no_break {
                    w += node.width();
                }
            }
            Horizontal::Glue(g) => {
                w += g.value.width;
                totals.add(&g.value);
            }
            Horizontal::Math(_) | Horizontal::Kern(_) => {
                w += node.width();
            }
            Horizontal::Mark(_)
            | Horizontal::Insertion(_)
            | Horizontal::Whatsit(_)
            | Horizontal::Penalty(_) => {}
        }
    }
    let width = target.resolve(w);
    let set = set_glue(
        width - w,
        &totals,
        !list.is_empty(),
        BoxKind::HBox,
        (params.hbadness, params.hfuzz),
        diagnostics,
    );
    HList {
        height: h,
        width,
        depth: d,
        shift_amount: Scaled::ZERO,
        list,
        glue_ratio: set.0,
        glue_sign: set.1,
        glue_order: set.2,
    }
}

/// Packages a vertical list into a box.
///
/// If the depth of the last box exceeds `max_depth` the excess is moved into the height.
///
/// TeX.2021.668.
pub fn vpack(
    list: Vec<Vertical>,
    target: Target,
    max_depth: Scaled,
    params: &Params,
    diagnostics: &mut Vec<Diagnostic>,
) -> VList {
    let mut w = Scaled::ZERO;
    let mut x = Scaled::ZERO;
    let mut d = Scaled::ZERO;
    let mut totals = GlueTotals::default();
    for node in &list {
        match node {
            Vertical::HList(b) => {
                x += d + b.height;
                d = b.depth;
                w = w.max(b.width + b.shift_amount);
            }
            Vertical::VList(b) => {
                x += d + b.height;
                d = b.depth;
                w = w.max(b.width + b.shift_amount);
            }
            Vertical::Rule(r) => {
                x += d + r.height_or_zero();
                d = r.depth_or_zero();
                w = w.max(r.width_or_zero());
            }
            Vertical::Glue(g) => {
                x += d;
                d = Scaled::ZERO;
                x += g.value.width;
                totals.add(&g.value);
            }
            Vertical::Kern(k) => {
                x += d + k.width;
                d = Scaled::ZERO;
            }
            Vertical::Mark(_)
            | Vertical::Insertion(_)
            | Vertical::Whatsit(_)
            | Vertical::Penalty(_)
            | Vertical::Float(_) => {}
        }
    }
    if d > max_depth {
        x += d - max_depth;
        d = max_depth;
    }
    let height = target.resolve(x);
    let set = set_glue(
        height - x,
        &totals,
        !list.is_empty(),
        BoxKind::VBox,
        (params.vbadness, params.vfuzz),
        diagnostics,
    );
    VList {
        height,
        width: w,
        depth: d,
        shift_amount: Scaled::ZERO,
        list,
        glue_ratio: set.0,
        glue_sign: set.1,
        glue_order: set.2,
    }
}

/// Natural height and depth of a vertical list, without a depth limit.
pub fn natural_height(list: &[Vertical]) -> (Scaled, Scaled) {
    let mut x = Scaled::ZERO;
    let mut d = Scaled::ZERO;
    for node in list {
        if let Some((height, depth)) = node.box_dimensions() {
            x += d + height;
            d = depth;
        } else {
            match node {
                Vertical::Glue(g) => {
                    x += d + g.value.width;
                    d = Scaled::ZERO;
                }
                Vertical::Kern(k) => {
                    x += d + k.width;
                    d = Scaled::ZERO;
                }
                _ => {}
            }
        }
    }
    (x, d)
}

/// Determines the glue setting for a list with excess `x`.
///
/// TeX.2021.656 and TeX.2021.664.
fn set_glue(
    x: Scaled,
    totals: &GlueTotals,
    non_empty: bool,
    kind: BoxKind,
    (bad_threshold, fuzz): (i32, Scaled),
    diagnostics: &mut Vec<Diagnostic>,
) -> (GlueRatio, GlueSign, GlueOrder) {
    if x == Scaled::ZERO {
        return (GlueRatio(0.0), GlueSign::Normal, GlueOrder::Normal);
    }
    if x > Scaled::ZERO {
        let o = totals.stretch_order();
        let total = totals.stretch[o.index()];
        let (ratio, sign) = if total != Scaled::ZERO {
            (GlueRatio(x.to_f32() / total.to_f32()), GlueSign::Stretching)
        } else {
            (GlueRatio(0.0), GlueSign::Normal)
        };
        if o == GlueOrder::Normal && non_empty {
            let b = badness(x, total);
            if b > bad_threshold {
                if b > 100 {
                    report(diagnostics, Diagnostic::Underfull { kind, badness: b });
                } else {
                    report(diagnostics, Diagnostic::Loose { kind, badness: b });
                }
            }
        }
        return (ratio, sign, o);
    }
    let o = totals.shrink_order();
    let total = totals.shrink[o.index()];
    let (mut ratio, sign) = if total != Scaled::ZERO {
        (GlueRatio(-x.to_f32() / total.to_f32()), GlueSign::Shrinking)
    } else {
        (GlueRatio(0.0), GlueSign::Normal)
    };
    if o == GlueOrder::Normal && non_empty {
        if total < -x {
            ratio = GlueRatio(1.0);
            let excess = -x - total;
            if excess > fuzz || bad_threshold < 100 {
                report(diagnostics, Diagnostic::Overfull { kind, excess });
            }
        } else {
            let b = badness(-x, total);
            if b > bad_threshold {
                report(diagnostics, Diagnostic::Tight { kind, badness: b });
            }
        }
    }
    (ratio, sign, o)
}

#[cfg(test)]
mod tests {
    use super::*;
    use galley_core::Glue as CoreGlue;

    fn pt(n: i32) -> Scaled {
        Scaled(n << 16)
    }

    fn char(width: i32) -> Horizontal {
        Horizontal::Char(Char {
            char: 'x',
            font: 0,
            width: pt(width),
            height: pt(7),
            depth: pt(2),
        })
    }

    fn glue(width: i32, stretch: i32, shrink: i32) -> Horizontal {
        Horizontal::Glue(Glue::new(CoreGlue {
            width: pt(width),
            stretch: pt(stretch),
            shrink: pt(shrink),
            ..Default::default()
        }))
    }

    #[test]
    fn hpack_natural() {
        let mut diagnostics = vec![];
        let b = hpack(
            vec![char(5), glue(3, 1, 1), char(5)],
            Target::Additional(Scaled::ZERO),
            &Params::default(),
            &mut diagnostics,
        );
        assert_eq!(b.width, pt(13));
        assert_eq!(b.height, pt(7));
        assert_eq!(b.depth, pt(2));
        assert_eq!(b.glue_sign, GlueSign::Normal);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn hpack_stretch() {
        let mut diagnostics = vec![];
        let b = hpack(
            vec![char(5), glue(3, 2, 1), char(5)],
            Target::Exactly(pt(14)),
            &Params::default(),
            &mut diagnostics,
        );
        assert_eq!(b.glue_sign, GlueSign::Stretching);
        assert_eq!(b.glue_ratio, GlueRatio(0.5));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn hpack_underfull() {
        let mut diagnostics = vec![];
        hpack(
            vec![char(5), glue(3, 1, 1), char(5)],
            Target::Exactly(pt(20)),
            &Params::default(),
            &mut diagnostics,
        );
        assert_eq!(
            diagnostics,
            vec![Diagnostic::Underfull {
                kind: BoxKind::HBox,
                badness: 10000
            }]
        );
    }

    #[test]
    fn hpack_overfull() {
        let mut diagnostics = vec![];
        let b = hpack(
            vec![char(5), glue(3, 1, 1), char(5)],
            Target::Exactly(pt(10)),
            &Params::default(),
            &mut diagnostics,
        );
        assert_eq!(b.glue_ratio, GlueRatio(1.0));
        assert_eq!(
            diagnostics,
            vec![Diagnostic::Overfull {
                kind: BoxKind::HBox,
                excess: pt(2)
            }]
        );
    }

    #[test]
    fn hpack_infinite_stretch_is_never_underfull() {
        let mut diagnostics = vec![];
        let b = hpack(
            vec![
                char(5),
                Horizontal::Glue(Glue::new(CoreGlue::fil())),
            ],
            Target::Exactly(pt(100)),
            &Params::default(),
            &mut diagnostics,
        );
        assert_eq!(b.glue_order, GlueOrder::Fil);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn vpack_moves_excess_depth() {
        let line = |depth: i32| {
            Vertical::HList(HList {
                height: pt(8),
                depth: pt(depth),
                ..Default::default()
            })
        };
        let mut diagnostics = vec![];
        let b = vpack(
            vec![line(2), Vertical::Glue(Glue::new(CoreGlue::rigid(pt(2)))), line(6)],
            Target::Additional(Scaled::ZERO),
            pt(4),
            &Params::default(),
            &mut diagnostics,
        );
        assert_eq!(b.height, pt(22));
        assert_eq!(b.depth, pt(4));
        assert_eq!(natural_height(&b.list), (pt(20), pt(6)));
    }
}
