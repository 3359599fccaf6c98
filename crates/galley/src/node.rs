//! Nodes of horizontal and vertical lists.
//!
//! The node kinds are those of TeX.2021 part 10, cut down to what the breakers look at.
//! [Float] is extra: plain TeX builds floats out of insertions and macros,
//!     while here they are first-class and placed by the page breaker.
use galley_core::GlueOrder;
use galley_core::Scaled;

/// A node in a horizontal list, the material of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Horizontal {
    Char(Char),
    HList(HList),
    VList(VList),
    Rule(Rule),
    Mark(Mark),
    Insertion(Insertion),
    Discretionary(Discretionary),
    Whatsit(Whatsit),
    Math(Math),
    Glue(Glue),
    Kern(Kern),
    Penalty(Penalty),
}

/// A node in a vertical list, the material of a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Vertical {
    HList(HList),
    VList(VList),
    Rule(Rule),
    Mark(Mark),
    Insertion(Insertion),
    Whatsit(Whatsit),
    Glue(Glue),
    Kern(Kern),
    Penalty(Penalty),
    Float(Float),
}

/// A character, with its dimensions already looked up in the font (TeX.2021.134).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Char {
    pub char: char,
    pub font: u32,
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
}

/// An `\hbox`: a packed horizontal list, such as a finished line (TeX.2021.135).
///
/// The default value is the empty box `\hbox{}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HList {
    pub height: Scaled,
    pub width: Scaled,
    pub depth: Scaled,
    /// Displacement perpendicular to the enclosing list: down in a horizontal list, right in a vertical one.
    pub shift_amount: Scaled,
    pub list: Vec<Horizontal>,
    pub glue_ratio: GlueRatio,
    pub glue_sign: GlueSign,
    pub glue_order: GlueOrder,
}

/// Fraction of the available stretch or shrink that the glue in a box was set to.
///
/// Only used for output; no breaking decision depends on it, so a float is fine.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GlueRatio(pub f32);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GlueSign {
    Stretching,
    Shrinking,
    #[default]
    Normal,
}

/// A `\vbox`: a packed vertical list, such as a finished page or insertion.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VList {
    pub height: Scaled,
    pub width: Scaled,
    pub depth: Scaled,
    pub shift_amount: Scaled,
    pub list: Vec<Vertical>,
    pub glue_ratio: GlueRatio,
    pub glue_sign: GlueSign,
    pub glue_order: GlueOrder,
}

/// A solid rectangle (TeX.2021.138).
///
/// A dimension equal to [Rule::RUNNING] extends to the edge of the enclosing box;
///     the breakers count it as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub height: Scaled,
    pub width: Scaled,
    pub depth: Scaled,
}

impl Rule {
    pub const RUNNING: Scaled = Scaled(-(1 << 30));

    /// A rule with every dimension running.
    pub fn new() -> Self {
        Self {
            height: Self::RUNNING,
            width: Self::RUNNING,
            depth: Self::RUNNING,
        }
    }

    pub(crate) fn height_or_zero(&self) -> Scaled {
        not_running(self.height)
    }

    pub(crate) fn depth_or_zero(&self) -> Scaled {
        not_running(self.depth)
    }

    pub(crate) fn width_or_zero(&self) -> Scaled {
        not_running(self.width)
    }
}

fn not_running(s: Scaled) -> Scaled {
    if s == Rule::RUNNING {
        Scaled::ZERO
    } else {
        s
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

/// How an insertion may be divided between pages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitPolicy {
    /// The insertion may be cut at any legal vertical breakpoint.
    #[default]
    Splittable,
    /// The insertion is placed whole or held over to the next page.
    Unsplittable,
}

/// Material for an insertion class, like a footnote, made by `\insert` (TeX.2021.140).
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    pub class: u8,
    /// Height plus depth of the list.
    pub height: Scaled,
    /// Depth limit for the first part when the insertion is split.
    pub split_max_depth: Scaled,
    /// Glue put above the remainder when the insertion is split.
    pub split_top_skip: galley_core::Glue,
    /// Charged when this insertion is held over because its class already split on the page.
    pub float_penalty: i32,
    pub split_policy: SplitPolicy,
    pub list: Vec<Vertical>,
}

impl Insertion {
    /// Creates an insertion of the given class, computing its height from the list.
    pub fn new(class: u8, list: Vec<Vertical>) -> Self {
        let (height, depth) = crate::pack::natural_height(&list);
        Self {
            class,
            height: height + depth,
            split_max_depth: Scaled::MAX_DIMEN,
            split_top_skip: galley_core::Glue::default(),
            float_penalty: 20000,
            split_policy: SplitPolicy::Splittable,
            list,
        }
    }
}

/// Expanded `\mark` text (TeX.2021.141).
///
/// Class 0 is plain TeX's `\mark`; other classes are independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub class: u8,
    pub payload: String,
}

/// A place where a line may break with different material on each side (TeX.2021.145).
///
/// The lists hold only characters, kerns, boxes and rules.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Discretionary {
    /// Ends the line when breaking here, usually a hyphen.
    pub pre_break: Vec<Horizontal>,
    /// Starts the next line when breaking here.
    pub post_break: Vec<Horizontal>,
    /// Used when the line doesn't break here.
    pub no_break: Vec<Horizontal>,
}

impl Discretionary {
    pub fn new() -> Self {
        Default::default()
    }

    /// A discretionary that breaks with a hyphen character.
    pub fn hyphen(hyphen: Char) -> Self {
        Self {
            pre_break: vec![Horizontal::Char(hyphen)],
            ..Default::default()
        }
    }
}

/// Extension material like `\special`, carried through the breakers untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whatsit(pub String);

/// Math-on or math-off (TeX.2021.147).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Math {
    pub kind: MathKind,
    /// The `\mathsurround` space.
    pub width: Scaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathKind {
    Before,
    After,
}

impl Horizontal {
    /// Whether glue right after this node is a legal breakpoint (TeX.2021.148).
    pub fn precedes_break(&self) -> bool {
        use Horizontal::*;
        matches!(
            self,
            Char(_)
                | HList(_)
                | VList(_)
                | Rule(_)
                | Mark(_)
                | Insertion(_)
                | Discretionary(_)
                | Whatsit(_)
        )
    }

    /// Whether this node is removed from the start of a line after a break.
    ///
    /// Only explicit kerns are discardable.
    ///
    /// Described in TeX.2021.879.
    pub fn is_discardable(&self) -> bool {
        match self {
            Horizontal::Glue(_) | Horizontal::Penalty(_) | Horizontal::Math(_) => true,
            Horizontal::Kern(kern) => kern.kind == KernKind::Explicit,
            _ => false,
        }
    }

    /// The natural width this node contributes to a line when no break happens at it.
    pub fn width(&self) -> Scaled {
        use Horizontal::*;
        match self {
            Char(c) => c.width,
            HList(b) => b.width,
            VList(b) => b.width,
            Rule(r) => r.width_or_zero(),
            Discretionary(d) => d.no_break.iter().map(Horizontal::width).sum(),
            Math(m) => m.width,
            Glue(g) => g.value.width,
            Kern(k) => k.width,
            Mark(_) | Insertion(_) | Whatsit(_) | Penalty(_) => Scaled::ZERO,
        }
    }
}

impl Vertical {
    /// Whether glue right after this node is a legal breakpoint.
    pub fn precedes_break(&self) -> bool {
        use Vertical::*;
        matches!(
            self,
            HList(_) | VList(_) | Rule(_) | Mark(_) | Insertion(_) | Whatsit(_) | Float(_)
        )
    }

    /// Whether this node is dropped from the top of a page or a split-off remainder.
    pub fn is_discardable(&self) -> bool {
        matches!(
            self,
            Vertical::Glue(_) | Vertical::Kern(_) | Vertical::Penalty(_)
        )
    }

    /// Height and depth of a box-like node.
    pub(crate) fn box_dimensions(&self) -> Option<(Scaled, Scaled)> {
        match self {
            Vertical::HList(b) => Some((b.height, b.depth)),
            Vertical::VList(b) => Some((b.height, b.depth)),
            Vertical::Rule(r) => Some((r.height_or_zero(), r.depth_or_zero())),
            _ => None,
        }
    }
}

/// A glue node: a glue specification plus where it came from (TeX.2021.149).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glue {
    pub kind: GlueKind,
    pub value: galley_core::Glue,
}

impl Glue {
    pub fn new(value: galley_core::Glue) -> Self {
        Self {
            kind: GlueKind::Normal,
            value,
        }
    }
}

/// Where a glue node came from.
///
/// Knuth records the glue parameter number in the subtype; here the kinds
///     the breakers insert themselves are named.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GlueKind {
    #[default]
    Normal,
    BaselineSkip,
    LineSkip,
    ParFillSkip,
    TopSkip,
    SplitTopSkip,
    FloatSeparation,
    InsertionSkip,
    /// The `\vfill` appended at the end of the document.
    Fill,
}

/// Fixed space (TeX.2021.155).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kern {
    pub kind: KernKind,
    pub width: Scaled,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KernKind {
    /// From the font, for example between a pair of letters.
    #[default]
    Normal,
    /// Written by the user with `\kern`; a break may follow it.
    Explicit,
}

/// The cost of breaking here (TeX.2021.157).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Penalty {
    pub value: i32,
}

impl Penalty {
    /// At or above this, a break is never taken.
    pub const INFINITE: i32 = 10000;

    /// At or below this, a break is always taken.
    pub const EJECT: i32 = -10000;
}

/// Where a float should be placed on the page that accepts it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Placement {
    #[default]
    Top,
    Bottom,
}

/// Material that floats to the top or bottom of the earliest page with room for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Float {
    pub placement: Placement,
    pub content: VList,
}

impl Float {
    /// Height plus depth of the float content.
    pub fn size(&self) -> Scaled {
        self.content.height + self.content.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_rule_has_zero_dimensions() {
        let rule = Rule::new();
        assert_eq!(rule.height_or_zero(), Scaled::ZERO);
        assert_eq!(Horizontal::Rule(rule).width(), Scaled::ZERO);
    }

    #[test]
    fn only_explicit_kerns_are_discardable() {
        let kern = |kind| {
            Horizontal::Kern(Kern {
                kind,
                width: Scaled::ONE,
            })
        };
        assert!(kern(KernKind::Explicit).is_discardable());
        assert!(!kern(KernKind::Normal).is_discardable());
    }

    #[test]
    fn discretionary_width_is_no_break_width() {
        let c = Char {
            char: 'f',
            font: 0,
            width: Scaled::TWO,
            height: Scaled::ZERO,
            depth: Scaled::ZERO,
        };
        let d = Discretionary {
            pre_break: vec![Horizontal::Char(c)],
            post_break: vec![],
            no_break: vec![Horizontal::Char(c), Horizontal::Char(c)],
        };
        assert_eq!(Horizontal::Discretionary(d).width(), Scaled(4 << 16));
    }
}
