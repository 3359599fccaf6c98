//! The paragraph breaker.
//!
//! This is the optimum-fit algorithm of Knuth and Plass as implemented in TeX.2021 parts 38 and 39.
//! Knuth threads the active breakpoints and the passive breakpoints through linked lists
//!     and keeps delta nodes between active breakpoints to track widths.
//! Here every breakpoint ever created lives in an arena and refers to its predecessor by index;
//!     the active set is a list of arena indices ordered by line number,
//!     and widths are computed from prefix sums over the paragraph.
//!
//! The breaker makes up to three passes over the paragraph:
//!
//! 1. With the `pretolerance` threshold (skipped when `pretolerance` is negative).
//! 1. With the `tolerance` threshold.
//! 1. With the `tolerance` threshold and `emergency_stretch` added to every line.
//!     This pass is only made when `emergency_stretch` is positive.
//!
//! The last pass made never fails: when the only remaining active breakpoint would be deactivated,
//!     an artificial break is made there instead and an
//!     [InfeasibleLine](Diagnostic::InfeasibleLine) diagnostic is attached to the paragraph.

use crate::cost::{demerits, Fitness, AWFUL_BAD};
use crate::diagnostics::{report, Diagnostic};
use crate::error::{check_budget, Result};
use crate::node::*;
use crate::pack::{hpack, Target};
use crate::params::{ParameterContext, Params};
use galley_core::{badness, Scaled, INF_BAD};

/// A paragraph broken into lines.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Paragraph {
    /// The lines, packed to their target widths.
    pub lines: Vec<HList>,
    /// The chosen breaks, one per line.
    pub breaks: Vec<BreakRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A chosen breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakRecord {
    /// Index of the node the break happens at.
    ///
    /// Indices refer to the paragraph list after the final
    ///     `\penalty10000\parfillskip\penalty-10000` has been appended,
    ///     so the last break is always at the final penalty.
    pub position: usize,
    /// Number of the line that ends at this break, starting from 1.
    pub line: usize,
    /// Badness of the line that ends at this break.
    pub badness: i32,
    pub fitness: Fitness,
    /// Total demerits of the paragraph up to this break.
    pub demerits: i64,
    /// Whether the break is at a discretionary.
    pub hyphenated: bool,
    /// Whether the break was forced because no feasible break existed.
    pub artificial: bool,
    /// Width the line ending at this break was measured against.
    pub width: Scaled,
}

/// Breaks a horizontal list into lines.
///
/// The list is consumed.
/// Its trailing glue is removed and `\penalty10000\parfillskip\penalty-10000` is appended.
/// An empty list produces a paragraph with no lines.
pub fn break_paragraph(
    mut list: Vec<Horizontal>,
    ctx: &mut dyn ParameterContext,
) -> Result<Paragraph> {
    ctx.params().validate()?;
    check_budget(list.len(), ctx.params().max_list_len)?;
    if list.is_empty() {
        return Ok(Default::default());
    }
    if matches!(list.last(), Some(Horizontal::Glue(_))) {
        list.pop();
    }
    list.push(Horizontal::Penalty(Penalty {
        value: Penalty::INFINITE,
    }));
    list.push(Horizontal::Glue(Glue {
        kind: GlueKind::ParFillSkip,
        value: ctx.params().par_fill_skip,
    }));
    list.push(Horizontal::Penalty(Penalty {
        value: Penalty::EJECT,
    }));

    let mut breaker = Breaker::new(&list);
    let params = ctx.params();
    let (mut pass, mut final_pass) = if params.pretolerance >= 0 {
        (Pass::First, false)
    } else {
        (Pass::Second, params.emergency_stretch <= Scaled::ZERO)
    };
    let best = loop {
        log::debug!("starting {pass:?} pass over a paragraph of {} nodes", list.len());
        if let Some(best) = breaker.run(ctx, pass, final_pass) {
            break Some(best);
        }
        if final_pass {
            break None;
        }
        (pass, final_pass) = match pass {
            Pass::First => (
                Pass::Second,
                ctx.params().emergency_stretch <= Scaled::ZERO,
            ),
            Pass::Second | Pass::Emergency => (Pass::Emergency, true),
        };
    };
    let chain = match best {
        Some(best) => breaker.backtrack(best),
        None => {
            // The last pass always keeps a breakpoint active, so this is unreachable in practice.
            log::debug!("no pass produced breakpoints; using a single line");
            vec![]
        }
    };
    let records = chain
        .iter()
        .enumerate()
        .map(|(i, &index)| breaker.record(index, i + 1))
        .collect::<Vec<_>>();
    let records = if records.is_empty() {
        vec![BreakRecord {
            position: list.len() - 1,
            line: 1,
            badness: INF_BAD,
            fitness: Fitness::Decent,
            demerits: AWFUL_BAD,
            hyphenated: false,
            artificial: true,
            width: ctx.params().line_width(1),
        }]
    } else {
        records
    };
    Ok(post_line_break(list, records, ctx.params()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    First,
    Second,
    Emergency,
}

/// Prefix sums of widths over the paragraph.
///
/// These are 64 bit so that long paragraphs can't overflow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Sums {
    width: i64,
    stretch: [i64; 4],
    shrink: [i64; 4],
}

impl Sums {
    fn add_node(&mut self, node: &Horizontal) {
        self.width += node.width().0 as i64;
        if let Horizontal::Glue(g) = node {
            self.stretch[g.value.stretch_order.index()] += g.value.stretch.0 as i64;
            self.shrink[g.value.shrink_order.index()] += g.value.shrink.0 as i64;
        }
    }

    fn of(list: &[Horizontal]) -> Sums {
        let mut sums: Sums = Default::default();
        for node in list {
            sums.add_node(node);
        }
        sums
    }
}

impl std::ops::Sub for Sums {
    type Output = Sums;
    fn sub(mut self, rhs: Sums) -> Sums {
        self.width -= rhs.width;
        for i in 0..4 {
            self.stretch[i] -= rhs.stretch[i];
            self.shrink[i] -= rhs.shrink[i];
        }
        self
    }
}

impl std::ops::Add for Sums {
    type Output = Sums;
    fn add(mut self, rhs: Sums) -> Sums {
        self.width += rhs.width;
        for i in 0..4 {
            self.stretch[i] += rhs.stretch[i];
            self.shrink[i] += rhs.shrink[i];
        }
        self
    }
}

fn clamp(v: i64) -> Scaled {
    let max = Scaled::MAX_DIMEN.0 as i64;
    Scaled(v.clamp(-max, max) as i32)
}

/// A feasible breakpoint.
///
/// Described in TeX.2021.819 (active nodes) and TeX.2021.821 (passive nodes).
#[derive(Debug, Clone)]
struct Breakpoint {
    /// None for the start of the paragraph.
    position: Option<usize>,
    /// Number of the line that begins after this break.
    line: usize,
    fitness: Fitness,
    hyphenated: bool,
    total_demerits: i64,
    badness: i32,
    artificial: bool,
    /// Width of the line that ends at this break.
    width: Scaled,
    previous: Option<usize>,
    /// Index of the first node of the line that begins after this break.
    start: usize,
    /// Width of discretionary post-break material that begins the next line.
    post_break: Sums,
}

/// The best way found so far, at the current position, of ending a line with each fitness class.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    demerits: i64,
    previous: usize,
    line: usize,
    badness: i32,
    artificial: bool,
    width: Scaled,
}

struct Breaker<'a> {
    list: &'a [Horizontal],
    sums: Vec<Sums>,
    arena: Vec<Breakpoint>,
    active: Vec<usize>,
    minimal: [Option<Candidate>; 4],
    minimum_demerits: i64,
}

impl<'a> Breaker<'a> {
    fn new(list: &'a [Horizontal]) -> Self {
        let mut sums = Vec::with_capacity(list.len() + 1);
        let mut running: Sums = Default::default();
        sums.push(running);
        for node in list {
            running.add_node(node);
            sums.push(running);
        }
        Breaker {
            list,
            sums,
            arena: vec![],
            active: vec![],
            minimal: [None; 4],
            minimum_demerits: AWFUL_BAD,
        }
    }

    /// Runs one pass and returns the best final breakpoint, if the pass succeeded.
    ///
    /// TeX.2021.863.
    fn run(&mut self, ctx: &mut dyn ParameterContext, pass: Pass, final_pass: bool) -> Option<usize> {
        self.arena.clear();
        self.arena.push(Breakpoint {
            position: None,
            line: 1,
            fitness: Fitness::Decent,
            hyphenated: false,
            total_demerits: 0,
            badness: 0,
            artificial: false,
            width: Scaled::ZERO,
            previous: None,
            start: 0,
            post_break: Default::default(),
        });
        self.active = vec![0];
        self.minimal = [None; 4];
        self.minimum_demerits = AWFUL_BAD;

        let list = self.list;
        let mut auto_breaking = true;
        for (p, node) in list.iter().enumerate() {
            let next_is_glue = matches!(list.get(p + 1), Some(Horizontal::Glue(_)));
            let legal = match node {
                Horizontal::Glue(_) if auto_breaking && p > 0 => {
                    let prev = &list[p - 1];
                    let after_kern =
                        matches!(prev, Horizontal::Kern(k) if k.kind != KernKind::Explicit);
                    prev.precedes_break() || after_kern
                }
                Horizontal::Kern(k) if k.kind == KernKind::Explicit => {
                    auto_breaking && next_is_glue
                }
                Horizontal::Math(m) => {
                    auto_breaking = m.kind == MathKind::After;
                    auto_breaking && next_is_glue
                }
                Horizontal::Penalty(_) | Horizontal::Discretionary(_) => true,
                _ => false,
            };
            if legal {
                ctx.before_breakpoint(p);
                let params = ctx.params();
                let (pi, hyphenated) = match node {
                    Horizontal::Penalty(penalty) => (penalty.value, false),
                    Horizontal::Discretionary(disc) if disc.pre_break.is_empty() => {
                        (params.ex_hyphen_penalty, true)
                    }
                    Horizontal::Discretionary(_) => (params.hyphen_penalty, true),
                    _ => (0, false),
                };
                self.try_break(p, pi, hyphenated, params, pass, final_pass);
            }
            if self.active.is_empty() {
                log::debug!("{pass:?} pass failed at position {p}");
                return None;
            }
        }
        self.choose(ctx.params(), final_pass)
    }

    /// Finds the best active breakpoint at the end of the paragraph, honouring looseness.
    ///
    /// TeX.2021.873 to TeX.2021.875.
    fn choose(&self, params: &Params, final_pass: bool) -> Option<usize> {
        let mut best = *self.active.first()?;
        for &r in &self.active {
            if self.arena[r].total_demerits < self.arena[best].total_demerits {
                best = r;
            }
        }
        let looseness = params.looseness as i64;
        if looseness == 0 {
            return Some(best);
        }
        let best_line = self.arena[best].line as i64;
        let mut actual_looseness = 0_i64;
        let mut fewest = self.arena[best].total_demerits;
        for &r in &self.active {
            let line_diff = self.arena[r].line as i64 - best_line;
            let total = self.arena[r].total_demerits;
            if (line_diff < actual_looseness && looseness <= line_diff)
                || (line_diff > actual_looseness && looseness >= line_diff)
            {
                best = r;
                actual_looseness = line_diff;
                fewest = total;
            } else if line_diff == actual_looseness && total < fewest {
                best = r;
                fewest = total;
            }
        }
        log::debug!("looseness {looseness} requested, {actual_looseness} achieved");
        if actual_looseness == looseness || final_pass {
            Some(best)
        } else {
            None
        }
    }

    /// Index of the first node of the line that begins after a break at `p`,
    ///     and the width of the post-break material that precedes it.
    ///
    /// TeX.2021.837.
    fn line_start(&self, p: usize) -> (usize, Sums) {
        let skip = |mut i: usize| {
            while i < self.list.len() && self.list[i].is_discardable() {
                i += 1;
            }
            i
        };
        match &self.list[p] {
            Horizontal::Discretionary(disc) => {
                if disc.post_break.is_empty() {
                    (skip(p + 1), Default::default())
                } else {
                    (p + 1, Sums::of(&disc.post_break))
                }
            }
            _ => (skip(p), Default::default()),
        }
    }

    /// Tries a break at position `p`, creating new active breakpoints and deactivating old ones.
    ///
    /// TeX.2021.829.
    fn try_break(
        &mut self,
        p: usize,
        pi: i32,
        hyphenated: bool,
        params: &Params,
        pass: Pass,
        final_pass: bool,
    ) {
        let is_final = p + 1 == self.list.len();
        if pi >= params.forbidding_threshold && !is_final {
            return;
        }
        let forced = pi <= Penalty::EJECT;
        let threshold = match pass {
            Pass::First => params.pretolerance,
            Pass::Second | Pass::Emergency => params.tolerance,
        }
        .min(INF_BAD);
        let background_stretch = match pass {
            Pass::Emergency => params.emergency_stretch.0 as i64,
            _ => 0,
        };
        let easy_line = if params.looseness == 0 {
            params.line_widths.len().saturating_sub(1)
        } else {
            usize::MAX
        };
        let pre_break = match &self.list[p] {
            Horizontal::Discretionary(disc) => Sums::of(&disc.pre_break),
            _ => Default::default(),
        };

        let actives = std::mem::take(&mut self.active);
        let mut next_active = Vec::with_capacity(actives.len() + 4);
        let mut old_l = 0_usize;
        let mut line_width = 0_i64;
        let mut i = 0;
        loop {
            let r = actives.get(i).copied();
            let l = r.map(|r| self.arena[r].line).unwrap_or(usize::MAX);
            if l > old_l {
                if self.minimum_demerits < AWFUL_BAD && (old_l != easy_line || r.is_none()) {
                    self.create_breakpoints(p, hyphenated, params, &mut next_active);
                }
                if r.is_none() {
                    break;
                }
                old_l = if l > easy_line { usize::MAX - 1 } else { l };
                line_width = params.line_width(l).0 as i64;
            }
            let Some(r) = r else { break };
            let a = &self.arena[r];

            // When discardables after the previous break extend past p this is negative, as in TeX.
            let natural = self.sums[p] - self.sums[a.start] + a.post_break + pre_break;
            let (b, fit) = line_badness(line_width - natural.width, &natural, background_stretch);

            let mut artificial = false;
            let stays;
            if b > INF_BAD || forced {
                if final_pass
                    && self.minimum_demerits == AWFUL_BAD
                    && i + 1 == actives.len()
                    && next_active.is_empty()
                {
                    artificial = true;
                } else if b > threshold {
                    i += 1;
                    continue;
                }
                stays = false;
            } else {
                if b > threshold {
                    next_active.push(r);
                    i += 1;
                    continue;
                }
                stays = true;
            }

            let mut d = 0;
            if !artificial {
                d = demerits(params.line_penalty, b, pi);
                if a.hyphenated && (hyphenated || is_final) {
                    d += if is_final {
                        params.final_hyphen_demerits as i64
                    } else {
                        params.double_hyphen_demerits as i64
                    };
                }
                if fit.is_jump(a.fitness) {
                    d += params.adj_demerits as i64;
                }
            }
            d += a.total_demerits;
            let slot = &mut self.minimal[fit as usize];
            if slot.map_or(true, |c| d <= c.demerits) {
                *slot = Some(Candidate {
                    demerits: d,
                    previous: r,
                    line: l,
                    badness: b,
                    artificial,
                    width: Scaled(line_width as i32),
                });
                self.minimum_demerits = self.minimum_demerits.min(d);
            }
            if stays {
                next_active.push(r);
            }
            i += 1;
        }
        self.active = next_active;
    }

    /// Creates new active breakpoints at `p` for the fitness classes that are good enough.
    ///
    /// TeX.2021.836 and TeX.2021.845.
    fn create_breakpoints(
        &mut self,
        p: usize,
        hyphenated: bool,
        params: &Params,
        next_active: &mut Vec<usize>,
    ) {
        let limit = self
            .minimum_demerits
            .saturating_add((params.adj_demerits as i64).abs());
        let (start, post_break) = self.line_start(p);
        for fitness in Fitness::ALL {
            let Some(candidate) = self.minimal[fitness as usize].take() else {
                continue;
            };
            if candidate.demerits > limit {
                continue;
            }
            log::trace!(
                "@@{}: line {}.{} t={} -> @@{}",
                self.arena.len(),
                candidate.line,
                fitness as u8,
                candidate.demerits,
                candidate.previous,
            );
            next_active.push(self.arena.len());
            self.arena.push(Breakpoint {
                position: Some(p),
                line: candidate.line + 1,
                fitness,
                hyphenated,
                total_demerits: candidate.demerits,
                badness: candidate.badness,
                artificial: candidate.artificial,
                width: candidate.width,
                previous: Some(candidate.previous),
                start,
                post_break,
            });
        }
        self.minimum_demerits = AWFUL_BAD;
    }

    fn backtrack(&self, best: usize) -> Vec<usize> {
        let mut chain = vec![];
        let mut current = Some(best);
        while let Some(index) = current {
            let breakpoint = &self.arena[index];
            if breakpoint.position.is_none() {
                break;
            }
            chain.push(index);
            current = breakpoint.previous;
        }
        chain.reverse();
        chain
    }

    fn record(&self, index: usize, line: usize) -> BreakRecord {
        let b = &self.arena[index];
        BreakRecord {
            position: b.position.unwrap_or_default(),
            line,
            badness: b.badness,
            fitness: b.fitness,
            demerits: b.total_demerits,
            hyphenated: b.hyphenated,
            artificial: b.artificial,
            width: b.width,
        }
    }
}

/// Badness and fitness class of a line with the given shortfall.
///
/// TeX.2021.852 and TeX.2021.853.
fn line_badness(shortfall: i64, natural: &Sums, background_stretch: i64) -> (i32, Fitness) {
    if shortfall > 0 {
        let stretch = natural.stretch[0] + background_stretch;
        if natural.stretch[1..].iter().any(|s| *s != 0) {
            (0, Fitness::Decent)
        } else if shortfall > 7230584 && stretch < 1663497 {
            (INF_BAD, Fitness::VeryLoose)
        } else {
            let b = badness(clamp(shortfall), clamp(stretch));
            (b, Fitness::stretching(b))
        }
    } else {
        let shrink = natural.shrink[0];
        if natural.shrink[1..].iter().any(|s| *s != 0) {
            (0, Fitness::Decent)
        } else if -shortfall > shrink {
            (INF_BAD + 1, Fitness::Tight)
        } else {
            let b = badness(clamp(-shortfall), clamp(shrink));
            (b, Fitness::shrinking(b))
        }
    }
}

/// Splits the paragraph at the chosen breaks and packs the lines.
///
/// TeX.2021.877 to TeX.2021.881.
fn post_line_break(list: Vec<Horizontal>, breaks: Vec<BreakRecord>, params: &Params) -> Paragraph {
    let mut diagnostics = vec![];
    let mut lines = Vec::with_capacity(breaks.len());
    let mut current: Vec<Horizontal> = vec![];
    let mut prune = false;
    let mut k = 0;
    for (i, node) in list.into_iter().enumerate() {
        if breaks.get(k).map(|b| b.position) == Some(i) {
            let mut next_line = vec![];
            match node {
                Horizontal::Discretionary(disc) => {
                    current.extend(disc.pre_break);
                    next_line = disc.post_break;
                }
                Horizontal::Math(math) => current.push(Horizontal::Math(Math {
                    width: Scaled::ZERO,
                    ..math
                })),
                Horizontal::Kern(kern) => current.push(Horizontal::Kern(Kern {
                    width: Scaled::ZERO,
                    ..kern
                })),
                _ => {}
            }
            let line = k + 1;
            if breaks[k].artificial {
                report(&mut diagnostics, Diagnostic::InfeasibleLine { line });
            }
            let content = std::mem::replace(&mut current, next_line);
            lines.push(hpack(
                content,
                Target::Exactly(breaks[k].width),
                params,
                &mut diagnostics,
            ));
            prune = current.is_empty();
            k += 1;
            continue;
        }
        if prune {
            if node.is_discardable() {
                continue;
            }
            prune = false;
        }
        current.push(node);
    }
    Paragraph {
        lines,
        breaks,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WithHook;
    use galley_core::Glue as CoreGlue;

    fn pt(n: i32) -> Scaled {
        Scaled(n << 16)
    }

    fn word(width: i32) -> Horizontal {
        Horizontal::HList(HList {
            width: pt(width),
            height: pt(7),
            ..Default::default()
        })
    }

    fn space(width: i32, stretch: i32, shrink: i32) -> Horizontal {
        Horizontal::Glue(Glue::new(CoreGlue {
            width: pt(width),
            stretch: pt(stretch),
            shrink: pt(shrink),
            ..Default::default()
        }))
    }

    fn hyphen() -> Horizontal {
        Horizontal::Discretionary(Discretionary {
            pre_break: vec![word(1)],
            ..Default::default()
        })
    }

    fn params(width: i32) -> Params {
        Params {
            line_widths: vec![pt(width)],
            par_fill_skip: CoreGlue::fil(),
            ..Default::default()
        }
    }

    /// Words of the given widths separated by 2pt spaces.
    fn words(widths: &[i32]) -> Vec<Horizontal> {
        let mut list = vec![];
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                list.push(space(2, 1, 1));
            }
            list.push(word(*w));
        }
        list
    }

    fn line_widths(paragraph: &Paragraph) -> Vec<Scaled> {
        paragraph.lines.iter().map(|l| l.width).collect()
    }

    #[test]
    fn empty_paragraph() {
        let paragraph = break_paragraph(vec![], &mut params(100)).unwrap();
        assert!(paragraph.lines.is_empty());
        assert!(paragraph.breaks.is_empty());
    }

    #[test]
    fn single_line() {
        let paragraph = break_paragraph(words(&[10, 10]), &mut params(100)).unwrap();
        assert_eq!(paragraph.lines.len(), 1);
        assert_eq!(paragraph.breaks[0].position, 5);
        assert_eq!(paragraph.breaks[0].badness, 0);
        assert!(paragraph.diagnostics.is_empty());
    }

    #[test]
    fn exact_widths_have_zero_badness() {
        // Each line is exactly 22pt: word, space, word.
        let paragraph = break_paragraph(words(&[10, 10, 10, 10, 10, 10]), &mut params(22)).unwrap();
        assert_eq!(paragraph.lines.len(), 3);
        for record in &paragraph.breaks {
            assert_eq!(record.badness, 0, "{record:?}");
            assert_eq!(record.fitness, Fitness::Decent);
        }
        assert_eq!(line_widths(&paragraph), vec![pt(22); 3]);
        assert!(paragraph.diagnostics.is_empty());
    }

    #[test]
    fn glue_at_break_is_discarded() {
        let paragraph = break_paragraph(words(&[10, 10, 10, 10]), &mut params(22)).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert!(matches!(
            paragraph.lines[1].list.first(),
            Some(Horizontal::HList(_))
        ));
        assert_eq!(paragraph.lines[0].list.len(), 3);
    }

    #[test]
    fn breaks_are_deterministic() {
        let list = words(&[7, 3, 12, 5, 9, 4, 11, 6, 8, 2, 10]);
        let first = break_paragraph(list.clone(), &mut params(30)).unwrap();
        let second = break_paragraph(list, &mut params(30)).unwrap();
        assert_eq!(first.breaks, second.breaks);
    }

    #[test]
    fn fitness_of_loose_and_tight_lines() {
        let list = || vec![word(10), space(2, 1, 1), word(10), space(2, 1, 1), word(10)];

        // 22pt stretched to 23pt with 1pt of stretch.
        let paragraph = break_paragraph(list(), &mut params(23)).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert_eq!(paragraph.breaks[0].badness, 100);
        assert_eq!(paragraph.breaks[0].fitness, Fitness::VeryLoose);
        // The last line is set with \parfillskip so it is decent.
        assert_eq!(paragraph.breaks[1].fitness, Fitness::Decent);

        // 22pt shrunk to 21pt with 1pt of shrink.
        let paragraph = break_paragraph(list(), &mut params(21)).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert_eq!(paragraph.breaks[0].badness, 100);
        assert_eq!(paragraph.breaks[0].fitness, Fitness::Tight);
    }

    #[test]
    fn fitness_jump_adds_adj_demerits() {
        let list = || vec![word(10), space(2, 1, 1), word(10), space(2, 1, 1), word(10)];
        let paragraph = break_paragraph(list(), &mut params(23)).unwrap();
        // (10+100)^2 for the first line, (10+0)^2 for the second, plus the jump.
        assert_eq!(paragraph.breaks[0].demerits, 12100);
        assert_eq!(paragraph.breaks[1].demerits, 12100 + 100 + 10000);

        let mut p = params(23);
        p.adj_demerits = 0;
        let paragraph = break_paragraph(list(), &mut p).unwrap();
        assert_eq!(paragraph.breaks[1].demerits, 12100 + 100);
    }

    #[test]
    fn forced_break() {
        let mut list = words(&[10, 10]);
        list.insert(
            1,
            Horizontal::Penalty(Penalty {
                value: Penalty::EJECT,
            }),
        );
        let paragraph = break_paragraph(list, &mut params(100)).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert_eq!(paragraph.breaks[0].position, 1);
    }

    #[test]
    fn infinite_penalty_prevents_break() {
        let mut list = words(&[10, 10, 10, 10]);
        // Forbid the break at the middle space.
        list.insert(
            3,
            Horizontal::Penalty(Penalty {
                value: Penalty::INFINITE,
            }),
        );
        let mut p = params(22);
        p.tolerance = 10000;
        let paragraph = break_paragraph(list, &mut p).unwrap();
        for record in &paragraph.breaks {
            assert_ne!(record.position, 4);
        }
    }

    #[test]
    fn overfull_line_is_forced() {
        let mut p = params(5);
        p.pretolerance = -1;
        let paragraph = break_paragraph(words(&[10, 10]), &mut p).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert!(paragraph
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::InfeasibleLine { line: 1 })));
        assert!(paragraph
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Overfull { .. })));
    }

    #[test]
    fn emergency_stretch_pass() {
        let list = vec![word(10), space(2, 1, 1), word(10), space(2, 1, 1), word(10)];
        let mut p = params(30);
        p.pretolerance = -1;
        p.tolerance = 200;
        p.emergency_stretch = pt(20);
        let paragraph = break_paragraph(list, &mut p).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert!(!paragraph.breaks.iter().any(|b| b.artificial));
        assert!(!paragraph
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::InfeasibleLine { .. })));
    }

    #[test]
    fn hyphenation_break() {
        // Only fits by breaking inside the second word.
        let list = vec![
            word(10),
            space(2, 1, 1),
            word(5),
            hyphen(),
            word(5),
            space(2, 1, 1),
            word(10),
        ];
        let mut p = params(18);
        p.tolerance = 10000;
        p.pretolerance = -1;
        let paragraph = break_paragraph(list, &mut p).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert!(paragraph.breaks[0].hyphenated);
        assert_eq!(paragraph.breaks[0].position, 3);
        assert_eq!(paragraph.lines[0].width, pt(18));
        // word, space, word, pre-break
        assert_eq!(paragraph.lines[0].list.len(), 4);
    }

    #[test]
    fn explicit_kern_followed_by_glue_is_breakpoint() {
        let list = vec![
            word(10),
            Horizontal::Kern(Kern {
                kind: KernKind::Explicit,
                width: pt(2),
            }),
            space(0, 1, 0),
            word(10),
        ];
        let mut p = params(10);
        p.tolerance = 10000;
        let paragraph = break_paragraph(list, &mut p).unwrap();
        assert_eq!(paragraph.breaks[0].position, 1);
        // The kern stays at the end of the line with its width zeroed.
        assert_eq!(
            paragraph.lines[0].list.last(),
            Some(&Horizontal::Kern(Kern {
                kind: KernKind::Explicit,
                width: Scaled::ZERO,
            }))
        );
        assert_eq!(paragraph.lines[0].list.len(), 2);
    }

    #[test]
    fn glue_in_math_is_not_a_breakpoint() {
        let list = vec![
            word(10),
            Horizontal::Math(Math {
                kind: MathKind::Before,
                width: Scaled::ZERO,
            }),
            word(5),
            space(2, 1, 1),
            word(5),
            Horizontal::Math(Math {
                kind: MathKind::After,
                width: Scaled::ZERO,
            }),
            space(2, 1, 1),
            word(10),
        ];
        let mut p = params(12);
        p.tolerance = 10000;
        p.pretolerance = -1;
        let paragraph = break_paragraph(list, &mut p).unwrap();
        for record in &paragraph.breaks {
            assert_ne!(record.position, 3);
        }
    }

    #[test]
    fn looseness() {
        let list = words(&[10, 10, 10, 10, 10, 10]);
        let mut p = params(34);
        p.tolerance = 10000;
        let tight = break_paragraph(list.clone(), &mut p).unwrap();
        p.looseness = 1;
        let loose = break_paragraph(list, &mut p).unwrap();
        assert_eq!(loose.lines.len(), tight.lines.len() + 1);
    }

    #[test]
    fn varying_line_widths() {
        let mut p = params(22);
        p.line_widths = vec![pt(10), pt(22)];
        let paragraph = break_paragraph(words(&[10, 10, 10, 10, 10]), &mut p).unwrap();
        assert_eq!(paragraph.lines[0].width, pt(10));
        assert_eq!(paragraph.lines[1].width, pt(22));
        assert_eq!(paragraph.lines.len(), 3);
    }

    #[test]
    fn parameters_are_read_at_each_breakpoint() {
        let list = words(&[10, 10, 10, 10]);
        let mut seen = vec![];
        let mut ctx = WithHook::new(params(22), |position, _: &mut Params| {
            seen.push(position);
        });
        let paragraph = break_paragraph(list.clone(), &mut ctx).unwrap();
        assert_eq!(paragraph.lines.len(), 2);
        assert_eq!(seen, vec![1, 3, 5, 7, 9]);

        // Forbidding breaks from position 3 onwards leaves only the end of the paragraph.
        let mut ctx = WithHook::new(params(22), |position, params: &mut Params| {
            if position >= 3 {
                params.forbidding_threshold = -20000;
            }
        });
        let paragraph = break_paragraph(list, &mut ctx).unwrap();
        assert_eq!(paragraph.lines.len(), 1);
        assert!(paragraph.breaks[0].artificial);
    }

    #[test]
    fn line_width_change_applies_from_the_next_breakpoint() {
        // The first line is chosen at 22pt; from position 7 onwards lines are 34pt.
        let list = words(&[10, 10, 10, 10, 10, 10]);
        let mut ctx = WithHook::new(params(22), |position, params: &mut Params| {
            params.line_widths = vec![if position >= 7 { pt(34) } else { pt(22) }];
        });
        let paragraph = break_paragraph(list, &mut ctx).unwrap();
        let positions: Vec<usize> = paragraph.breaks.iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![3, 9, 13]);
        let widths: Vec<Scaled> = paragraph.breaks.iter().map(|b| b.width).collect();
        assert_eq!(widths, vec![pt(22), pt(34), pt(34)]);
        assert_eq!(line_widths(&paragraph), vec![pt(22), pt(34), pt(34)]);
        assert!(paragraph.diagnostics.is_empty());
    }

    #[test]
    fn budget_exceeded() {
        let mut p = params(22);
        p.max_list_len = 3;
        assert_eq!(
            break_paragraph(words(&[1, 1, 1]), &mut p),
            Err(crate::Error::NodeBudgetExceeded { len: 5, max: 3 })
        );
    }
}
