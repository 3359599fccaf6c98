//! The page breaker.
//!
//! TeX's page builder (TeX.2021 part 45) is greedy: it fills one page at a time
//!     and fires the output routine at the best break seen so far.
//! This breaker instead makes a single forward pass over the vertical list
//!     and keeps every page that could still end well alive at once,
//!     like the paragraph breaker does for lines.
//!
//! Every live page carries its own running state:
//!     the height and glue accumulated so far, its goal,
//!     the insertions and floats it has accepted,
//!     and the material it has pushed to the next page.
//! Two pages that started at different breaks can therefore disagree about
//!     how much room is left, even at the same position in the list.
//! When a page can end at a breakpoint, a new breakpoint is recorded
//!     with the total cost of the pages before it.
//! Breakpoints at the same position are merged when they carry the same material
//!     to the next page.
//!
//! A live page is dropped only when no further stretch or shrink can rescue it:
//!     its material is taller than the goal plus all of its shrink,
//!     or its insertion penalties reached 10000.
//! If every live page is dropped before a new breakpoint is found,
//!     the breaker forces a break at the least bad place on the most recently started page
//!     and attaches an [InfeasiblePage](Diagnostic::InfeasiblePage) diagnostic.
//!
//! The end of the list behaves like `\vfill\penalty-10000`.
//! When floats or insertion remainders are still pending at the end,
//!     further pages are produced until everything has been placed.

use crate::cost::{demerits, AWFUL_BAD, DEPLORABLE};
use crate::diagnostics::{report, Diagnostic};
use crate::error::{check_budget, Result};
use crate::node::*;
use crate::pack::{natural_height, vpack, Target};
use crate::params::{ParameterContext, Params};
use crate::split::{legal_break, SplitStrategy};
use galley_core::{badness, Scaled, INF_BAD};
use std::collections::{BTreeMap, BTreeSet};

/// A finished page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The main content, packed to the goal height of the page.
    pub content: VList,
    pub floats_top: Vec<VList>,
    pub floats_bottom: Vec<VList>,
    /// The insertion material of each class that was drained onto this page.
    pub insertions: BTreeMap<u8, VList>,
    /// The marks of each class that has had a mark so far.
    pub marks: BTreeMap<u8, MarkTriple>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The `\topmark`, `\firstmark` and `\botmark` of a page for one mark class.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkTriple {
    /// The last mark before the page began.
    pub top: Option<String>,
    /// The first mark on the page, or the top mark if the page has none.
    pub first: Option<String>,
    /// The last mark on the page, or the top mark if the page has none.
    pub bot: Option<String>,
}

/// Breaks a vertical list into pages.
///
/// The list is consumed.
/// An empty list produces no pages.
pub fn break_pages(
    list: Vec<Vertical>,
    ctx: &mut dyn ParameterContext,
    strategy: &dyn SplitStrategy,
) -> Result<Vec<Page>> {
    ctx.params().validate()?;
    check_budget(list.len(), ctx.params().max_list_len)?;
    let states = {
        let mut breaker = Breaker::new(Scanner {
            list: &list,
            strategy,
        });
        breaker.run(ctx)
    };
    log::debug!("broke {} nodes into {} pages", list.len(), states.len());
    Ok(build(list, states, ctx.params()))
}

/// A reference to the unplaced part of an insertion node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct InsertRef {
    /// Index of the insertion node in the vertical list.
    node: usize,
    /// Index in the insertion's own list where the unplaced part begins.
    /// Zero means the insertion has not been split.
    offset: usize,
}

/// Material a page pushes to the next page.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Carry {
    /// Deferred floats, in order.
    floats: Vec<usize>,
    /// Held-over insertions and the remainders of split insertions.
    inserts: Vec<InsertRef>,
}

impl Carry {
    fn is_empty(&self) -> bool {
        self.floats.is_empty() && self.inserts.is_empty()
    }
}

/// Insertion material placed on a page: the first `len` nodes of a [Remainder].
#[derive(Debug, Clone, Copy)]
struct Piece {
    class: u8,
    source: InsertRef,
    len: usize,
}

/// The unplaced part of an insertion, ready to be measured and split.
///
/// After a split the remainder starts at its first non-discardable node
///     and `\splittopskip` glue is inserted before its first box.
struct Remainder {
    list: Vec<Vertical>,
    first: usize,
    glue: Option<usize>,
}

impl Remainder {
    fn new(insertion: &Insertion, offset: usize) -> Remainder {
        if offset == 0 {
            return Remainder {
                list: insertion.list.clone(),
                first: 0,
                glue: None,
            };
        }
        let rest = insertion.list.get(offset..).unwrap_or_default();
        let first = offset + rest.iter().take_while(|n| n.is_discardable()).count();
        let mut list = insertion.list.get(first..).unwrap_or_default().to_vec();
        let top_box = list
            .iter()
            .enumerate()
            .find_map(|(i, n)| n.box_dimensions().map(|(h, _)| (i, h)));
        let glue = top_box.map(|(i, height)| {
            let skip = insertion.split_top_skip;
            let width = (skip.width - height).max(Scaled::ZERO);
            list.insert(
                i,
                Vertical::Glue(Glue {
                    kind: GlueKind::SplitTopSkip,
                    value: galley_core::Glue { width, ..skip },
                }),
            );
            i
        });
        Remainder { list, first, glue }
    }

    /// Index in the insertion's list of the node at index `k` of the remainder.
    fn original(&self, k: usize) -> usize {
        match self.glue {
            Some(g) if k > g => self.first + k - 1,
            _ => self.first + k,
        }
    }

    fn first_box(&self) -> Option<usize> {
        self.list.iter().position(|n| n.box_dimensions().is_some())
    }
}

/// Read-only inputs shared by all page states.
struct Scanner<'a> {
    list: &'a [Vertical],
    strategy: &'a dyn SplitStrategy,
}

impl<'a> Scanner<'a> {
    fn insertion(&self, node: usize) -> Option<&'a Insertion> {
        match self.list.get(node) {
            Some(Vertical::Insertion(insertion)) => Some(insertion),
            _ => None,
        }
    }

    fn float(&self, node: usize) -> Option<&'a Float> {
        match self.list.get(node) {
            Some(Vertical::Float(float)) => Some(float),
            _ => None,
        }
    }
}

/// The running state of a page, from its first node up to the current position.
///
/// This plays the role of TeX's `\pagegoal`, `\pagetotal` and friends (TeX.2021.982),
///     plus the insertion bookkeeping of TeX.2021.981.
#[derive(Debug, Clone)]
struct PageState {
    /// Position of the break the page starts at.
    start: usize,
    /// Position of the break the page ends at; only meaningful once the page has ended.
    end: usize,
    /// `page_goal` and `max_depth` as of the last breakpoint or node seen.
    page_goal: Scaled,
    max_depth: Scaled,
    /// Space taken from the goal by insertions, their skips and floats.
    reserved: Scaled,
    top_skip: galley_core::Glue,
    height: Scaled,
    /// Depth of the last box, before `max_depth` is applied.
    depth: Scaled,
    stretch: [Scaled; 4],
    shrink: Scaled,
    /// Index of the first box and the width of the `\topskip` glue placed before it.
    first_box: Option<(usize, Scaled)>,
    /// Whether the page holds marks, whatsits, insertions or floats.
    material: bool,
    accounts: BTreeMap<u8, Scaled>,
    split_classes: BTreeSet<u8>,
    insert_penalties: i64,
    pieces: Vec<Piece>,
    floats: Vec<usize>,
    deferring: bool,
    carry: Carry,
    forced: bool,
    diagnostics: Vec<Diagnostic>,
}

impl PageState {
    fn new(start: usize, params: &Params) -> PageState {
        PageState {
            start,
            end: start,
            page_goal: params.page_goal,
            max_depth: params.max_depth,
            reserved: Scaled::ZERO,
            top_skip: params.top_skip,
            height: Scaled::ZERO,
            depth: Scaled::ZERO,
            stretch: [Scaled::ZERO; 4],
            shrink: Scaled::ZERO,
            first_box: None,
            material: false,
            accounts: BTreeMap::new(),
            split_classes: BTreeSet::new(),
            insert_penalties: 0,
            pieces: vec![],
            floats: vec![],
            deferring: false,
            carry: Default::default(),
            forced: false,
            diagnostics: vec![],
        }
    }

    fn refresh(&mut self, params: &Params) {
        self.page_goal = params.page_goal;
        self.max_depth = params.max_depth;
    }

    fn goal(&self) -> Scaled {
        self.page_goal - self.reserved
    }

    /// Height with the depth beyond `max_depth` moved into it (TeX.2021.1003).
    fn total_height(&self) -> Scaled {
        self.height + (self.depth - self.max_depth).max(Scaled::ZERO)
    }

    fn started(&self) -> bool {
        self.first_box.is_some()
    }

    /// Whether nothing has been put on the page yet.
    ///
    /// Material that can't fit on a fresh page is placed anyway so that
    ///     breaking always makes progress.
    fn fresh(&self) -> bool {
        !self.started() && self.pieces.is_empty() && self.floats.is_empty()
    }

    fn has_content(&self) -> bool {
        self.started() || self.material || !self.carry.is_empty()
    }

    fn add_glue(&mut self, glue: &galley_core::Glue) {
        self.height += self.depth + glue.width;
        self.depth = Scaled::ZERO;
        self.stretch[glue.stretch_order.index()] += glue.stretch;
        self.shrink += glue.shrink;
    }

    /// Puts the material carried from the previous page at the top of this page.
    fn load(&mut self, carry: &Carry, scanner: &Scanner, params: &Params) {
        self.refresh(params);
        for &i in &carry.floats {
            if let Some(float) = scanner.float(i) {
                self.float(i, float, params);
            }
        }
        for &source in &carry.inserts {
            self.insert(source, scanner, params);
        }
    }

    /// Adds the node at position `i` to the page.
    ///
    /// TeX.2021.1000 to TeX.2021.1004.
    fn absorb(&mut self, i: usize, scanner: &Scanner, params: &Params) {
        self.refresh(params);
        let node = &scanner.list[i];
        if let Some((height, depth)) = node.box_dimensions() {
            if self.first_box.is_none() {
                self.top_skip = params.top_skip;
                let width = (self.top_skip.width - height).max(Scaled::ZERO);
                self.first_box = Some((i, width));
                let skip = galley_core::Glue {
                    width,
                    ..self.top_skip
                };
                self.add_glue(&skip);
            }
            self.height += self.depth + height;
            self.depth = depth;
            return;
        }
        match node {
            Vertical::Glue(glue) if self.started() => self.add_glue(&glue.value),
            Vertical::Kern(kern) if self.started() => {
                self.height += self.depth + kern.width;
                self.depth = Scaled::ZERO;
            }
            Vertical::Mark(_) | Vertical::Whatsit(_) => self.material = true,
            Vertical::Insertion(_) => {
                self.insert(InsertRef { node: i, offset: 0 }, scanner, params)
            }
            Vertical::Float(float) => self.float(i, float, params),
            _ => {}
        }
    }

    /// Places a float, or defers it to the next page.
    ///
    /// A float is deferred when it doesn't fit or when an earlier float was deferred.
    fn float(&mut self, i: usize, float: &Float, params: &Params) {
        self.material = true;
        let size = float.size() + params.float_separation;
        let room = self.goal() - self.height - self.depth;
        if !self.deferring && size <= room {
            self.reserved += size;
            self.floats.push(i);
        } else if self.fresh() {
            self.reserved += size;
            self.floats.push(i);
            self.diagnostics.push(Diagnostic::FloatOverflow {
                excess: size - room,
            });
        } else {
            self.deferring = true;
            self.carry.floats.push(i);
        }
    }

    /// Places an insertion, splits it, or holds it over to the next page.
    ///
    /// TeX.2021.1008 to TeX.2021.1010.
    fn insert(&mut self, source: InsertRef, scanner: &Scanner, params: &Params) {
        let Some(insertion) = scanner.insertion(source.node) else {
            return;
        };
        let class = insertion.class;
        let fresh = self.fresh();
        self.material = true;
        if !self.accounts.contains_key(&class) {
            let skip = params.insertion_skip(class);
            self.reserved += skip.width;
            self.stretch[skip.stretch_order.index()] += skip.stretch;
            self.shrink += skip.shrink;
            self.accounts.insert(class, Scaled::ZERO);
        }
        if self.split_classes.contains(&class) {
            self.insert_penalties += insertion.float_penalty as i64;
            self.carry.inserts.push(source);
            return;
        }

        let remainder = Remainder::new(insertion, source.offset);
        let (height, depth) = natural_height(&remainder.list);
        let size = height + depth;
        let account = self.accounts.get(&class).copied().unwrap_or_default();
        let max = params.insertion_max(class);
        let delta = self.goal() - self.height - self.depth + self.shrink;
        if (size <= Scaled::ZERO || size <= delta) && account + size <= max {
            self.place(class, source, remainder.list.len(), size);
            return;
        }

        let room = (self.goal() - self.height - self.depth).min(max - account);
        let split = match insertion.split_policy {
            SplitPolicy::Unsplittable => None,
            SplitPolicy::Splittable => {
                let split =
                    scanner
                        .strategy
                        .split(&remainder.list, room, insertion.split_max_depth);
                let end = split.index.min(remainder.list.len());
                remainder.list[..end]
                    .iter()
                    .any(|n| n.box_dimensions().is_some())
                    .then_some(split)
            }
        };
        // A cut that overflows is only taken on an otherwise empty page.
        let split = split.filter(|split| fresh || split.height <= room);
        match split {
            Some(split) if split.index >= remainder.list.len() => {
                self.place(class, source, remainder.list.len(), size);
            }
            Some(split) => {
                self.place(class, source, split.index, split.height);
                self.insert_penalties += split.penalty as i64;
                self.split_classes.insert(class);
                if fresh && split.height > room {
                    self.diagnostics.push(Diagnostic::InsertionOverflow {
                        class,
                        excess: split.height - room,
                    });
                }
                self.carry_rest(insertion, source.node, remainder.original(split.index));
            }
            None if fresh => {
                // Nothing fits even on an empty page.
                let (len, height) = match (insertion.split_policy, remainder.first_box()) {
                    (SplitPolicy::Splittable, Some(b)) => {
                        let (h, d) = natural_height(&remainder.list[..=b]);
                        (b + 1, h + d)
                    }
                    _ => (remainder.list.len(), size),
                };
                self.place(class, source, len, height);
                self.diagnostics.push(Diagnostic::InsertionOverflow {
                    class,
                    excess: height - room,
                });
                if len < remainder.list.len() {
                    self.split_classes.insert(class);
                    self.carry_rest(insertion, source.node, remainder.original(len));
                }
            }
            None => {
                self.split_classes.insert(class);
                self.carry.inserts.push(source);
            }
        }
    }

    fn place(&mut self, class: u8, source: InsertRef, len: usize, height: Scaled) {
        self.reserved += height;
        *self.accounts.entry(class).or_default() += height;
        self.pieces.push(Piece { class, source, len });
    }

    fn carry_rest(&mut self, insertion: &Insertion, node: usize, offset: usize) {
        let pending = insertion
            .list
            .get(offset..)
            .is_some_and(|rest| rest.iter().any(|n| !n.is_discardable()));
        if pending {
            self.carry.inserts.push(InsertRef { node, offset });
        }
    }

    /// Badness of ending the page at the current position.
    ///
    /// With `fill` the page behaves as if it ended with `\vfill`.
    ///
    /// TeX.2021.1007.
    fn badness(&self, fill: bool) -> i64 {
        let (height, goal) = (self.total_height(), self.goal());
        if height < goal {
            if fill || self.stretch[1..].iter().any(|s| *s != Scaled::ZERO) {
                0
            } else {
                badness(goal - height, self.stretch[0]) as i64
            }
        } else if height - goal > self.shrink {
            AWFUL_BAD
        } else {
            badness(height - goal, self.shrink) as i64
        }
    }
}

/// A place the page breaker can fall back to when no feasible break exists.
#[derive(Debug, Clone)]
struct Fallback {
    /// The cost TeX's page builder would assign to this break (TeX.2021.1005).
    cost: i64,
    /// Total cost of the pages up to and including this one.
    total: i64,
    page: PageState,
}

/// A page that has started but not ended.
#[derive(Debug)]
struct Active {
    /// Arena index of the breakpoint the page starts at.
    origin: usize,
    state: PageState,
    fallback: Option<Fallback>,
}

/// A breakpoint between two pages.
#[derive(Debug)]
struct PageBreak {
    position: usize,
    total: i64,
    previous: Option<usize>,
    /// The page ending at this break; none for the start of the list.
    page: Option<PageState>,
}

struct Breaker<'a> {
    scanner: Scanner<'a>,
    arena: Vec<PageBreak>,
    active: Vec<Active>,
    /// Pages dropped since the last breakpoint was created.
    dead: Vec<(usize, Fallback)>,
    /// Breakpoints after which nothing but empty pages remain.
    finals: Vec<usize>,
}

impl<'a> Breaker<'a> {
    fn new(scanner: Scanner<'a>) -> Self {
        Breaker {
            scanner,
            arena: vec![],
            active: vec![],
            dead: vec![],
            finals: vec![],
        }
    }

    fn run(&mut self, ctx: &mut dyn ParameterContext) -> Vec<PageState> {
        let n = self.scanner.list.len();
        self.arena.push(PageBreak {
            position: 0,
            total: 0,
            previous: None,
            page: None,
        });
        let first = self.open(0, ctx.params());
        self.active.push(first);
        let mut i = 0;
        while i <= n {
            let at_end = i == n;
            let mut created = vec![];
            if let Some(pi) = legal_break(self.scanner.list, i) {
                ctx.before_breakpoint(i);
                created = self.evaluate(i, pi, ctx.params());
            }
            if !created.is_empty() {
                self.dead.clear();
            }
            for node in created {
                if at_end {
                    self.finals.push(node);
                } else {
                    let active = self.open(node, ctx.params());
                    self.active.push(active);
                }
            }
            if !at_end {
                let params = ctx.params();
                for active in &mut self.active {
                    active.state.absorb(i, &self.scanner, params);
                }
            }
            if self.active.is_empty() && !(at_end && !self.finals.is_empty()) {
                let Some(node) = self.force() else {
                    break;
                };
                let position = self.arena[node].position;
                if position == n {
                    self.finals.push(node);
                    break;
                }
                let params = ctx.params();
                let mut active = self.open(node, params);
                active.state.absorb(position, &self.scanner, params);
                self.active.push(active);
                i = position + 1;
                continue;
            }
            i += 1;
        }
        self.finish(ctx.params())
    }

    /// Starts a page at a breakpoint, loading the material carried to it.
    fn open(&self, node: usize, params: &Params) -> Active {
        let origin = &self.arena[node];
        let mut state = PageState::new(origin.position, params);
        if let Some(page) = &origin.page {
            state.load(&page.carry, &self.scanner, params);
        }
        Active {
            origin: node,
            state,
            fallback: None,
        }
    }

    /// Tries to end every live page at position `i` and returns the breakpoints created.
    fn evaluate(&mut self, i: usize, pi: i32, params: &Params) -> Vec<usize> {
        let at_end = i == self.scanner.list.len();
        let forced = pi <= Penalty::EJECT;
        let mut candidates: BTreeMap<Carry, (i64, usize, PageState)> = BTreeMap::new();
        let mut survivors = Vec::with_capacity(self.active.len());
        for mut active in std::mem::take(&mut self.active) {
            active.state.refresh(params);
            let state = &active.state;
            let eligible = if at_end {
                state.has_content()
            } else {
                state.started() && pi < params.forbidding_threshold
            };
            if !eligible {
                if at_end {
                    self.finals.push(active.origin);
                } else {
                    survivors.push(active);
                }
                continue;
            }
            let b = state.badness(at_end);
            let insert_penalties = state.insert_penalties;
            let unrecoverable = b == AWFUL_BAD || insert_penalties >= Penalty::INFINITE as i64;
            let total = self.arena[active.origin].total
                + demerits(params.line_penalty, b.min(INF_BAD as i64) as i32, pi)
                + insert_penalties;
            let cost = if unrecoverable {
                AWFUL_BAD
            } else if forced {
                pi as i64
            } else if b < INF_BAD as i64 {
                b + pi as i64 + insert_penalties
            } else {
                DEPLORABLE
            };
            let feasible = !unrecoverable && (forced || b <= params.page_tolerance as i64);
            log::trace!(
                "page from {} ending at {i}: b={b} pi={pi} cost={cost} total={total}",
                state.start
            );

            let improves_candidate = feasible
                && candidates
                    .get(&state.carry)
                    .map_or(true, |(best, ..)| total < *best);
            let improves_fallback = active
                .fallback
                .as_ref()
                .map_or(true, |fallback| cost <= fallback.cost);
            if improves_candidate || improves_fallback {
                let mut page = active.state.clone();
                page.end = i;
                if improves_candidate {
                    candidates.insert(page.carry.clone(), (total, active.origin, page.clone()));
                }
                if improves_fallback {
                    active.fallback = Some(Fallback { cost, total, page });
                }
            }

            if unrecoverable || forced {
                if let Some(fallback) = active.fallback {
                    self.dead.push((active.origin, fallback));
                }
            } else {
                survivors.push(active);
            }
        }
        self.active = survivors;
        candidates
            .into_values()
            .map(|(total, origin, page)| {
                self.arena.push(PageBreak {
                    position: i,
                    total,
                    previous: Some(origin),
                    page: Some(page),
                });
                self.arena.len() - 1
            })
            .collect()
    }

    /// Forces a break at the best fallback of the most recently started pages.
    ///
    /// Only pages that started at the latest breakpoint are considered,
    ///     so the forced break is always after every existing breakpoint.
    fn force(&mut self) -> Option<usize> {
        let latest = self
            .dead
            .iter()
            .map(|(origin, _)| self.arena[*origin].position)
            .max()?;
        let mut best: Option<(usize, Fallback)> = None;
        for (origin, fallback) in self.dead.drain(..) {
            if self.arena[origin].position != latest {
                continue;
            }
            let better = match &best {
                None => true,
                Some((_, current)) => {
                    fallback.cost < current.cost
                        || (fallback.cost == current.cost && fallback.page.end >= current.page.end)
                }
            };
            if better {
                best = Some((origin, fallback));
            }
        }
        let (origin, fallback) = best?;
        let mut page = fallback.page;
        page.forced = true;
        log::debug!("no feasible page break; forcing one at position {}", page.end);
        self.arena.push(PageBreak {
            position: page.end,
            total: fallback.total,
            previous: Some(origin),
            page: Some(page),
        });
        Some(self.arena.len() - 1)
    }

    /// Produces the pages that place material still pending at the end of the list.
    fn flush(&self, node: usize, params: &Params) -> (i64, Vec<PageState>) {
        let n = self.scanner.list.len();
        let mut carry = match &self.arena[node].page {
            Some(page) => page.carry.clone(),
            None => Default::default(),
        };
        let mut cost = 0;
        let mut pages = vec![];
        while !carry.is_empty() {
            let mut state = PageState::new(n, params);
            state.load(&carry, &self.scanner, params);
            if state.carry == carry {
                log::warn!("pending floats and insertions could not be placed");
                break;
            }
            let b = state.badness(true);
            cost += demerits(params.line_penalty, b.min(INF_BAD as i64) as i32, Penalty::EJECT)
                + state.insert_penalties;
            state.forced = b == AWFUL_BAD;
            carry = state.carry.clone();
            pages.push(state);
        }
        (cost, pages)
    }

    /// Chooses the cheapest way to end the document and returns its pages in order.
    fn finish(&mut self, params: &Params) -> Vec<PageState> {
        let mut best: Option<(i64, usize, Vec<PageState>)> = None;
        for &node in &self.finals {
            let (cost, flushed) = self.flush(node, params);
            let total = self.arena[node].total + cost;
            if best.as_ref().map_or(true, |(current, ..)| total < *current) {
                best = Some((total, node, flushed));
            }
        }
        let Some((total, node, flushed)) = best else {
            return vec![];
        };
        log::debug!("best page sequence has total cost {total}");
        let mut pages = vec![];
        let mut current = Some(node);
        while let Some(index) = current {
            let page_break = &mut self.arena[index];
            if let Some(page) = page_break.page.take() {
                pages.push(page);
            }
            current = page_break.previous;
        }
        pages.reverse();
        pages.extend(flushed);
        pages
    }
}

/// Assembles the chosen pages out of the list.
fn build(list: Vec<Vertical>, states: Vec<PageState>, params: &Params) -> Vec<Page> {
    // Page badness has already been accounted for by the breaker.
    let quiet = Params {
        vbadness: INF_BAD,
        vfuzz: Scaled::MAX_DIMEN,
        ..params.clone()
    };
    let mut slots: Vec<Option<Vertical>> = list.into_iter().map(Some).collect();
    let mut bots: BTreeMap<u8, String> = BTreeMap::new();
    states
        .into_iter()
        .enumerate()
        .map(|(k, state)| build_page(k + 1, state, &mut slots, &mut bots, &quiet))
        .collect()
}

fn build_page(
    number: usize,
    state: PageState,
    slots: &mut [Option<Vertical>],
    bots: &mut BTreeMap<u8, String>,
    params: &Params,
) -> Page {
    let mut diagnostics = vec![];
    if state.forced {
        report(&mut diagnostics, Diagnostic::InfeasiblePage { page: number });
    }
    for diagnostic in state.diagnostics.iter().cloned() {
        report(&mut diagnostics, diagnostic);
    }
    // Marks are ordered by the position of the node they come from
    //     and then by their position inside that node.
    let mut marks: Vec<((usize, usize), Mark)> = vec![];

    let mut content = vec![];
    let mut started = false;
    for i in state.start..state.end.min(slots.len()) {
        match &slots[i] {
            None | Some(Vertical::Float(_)) | Some(Vertical::Insertion(_)) => continue,
            Some(node) => {
                if let Some((first, width)) = state.first_box {
                    if first == i {
                        content.push(Vertical::Glue(Glue {
                            kind: GlueKind::TopSkip,
                            value: galley_core::Glue {
                                width,
                                ..state.top_skip
                            },
                        }));
                        started = true;
                    }
                }
                if !started && node.is_discardable() {
                    continue;
                }
                if let Vertical::Mark(mark) = node {
                    marks.push(((i, 0), mark.clone()));
                }
            }
        }
        if let Some(node) = slots[i].take() {
            content.push(node);
        }
    }

    let mut by_class: BTreeMap<u8, Vec<Vertical>> = BTreeMap::new();
    for piece in &state.pieces {
        let Some(Some(Vertical::Insertion(insertion))) = slots.get(piece.source.node) else {
            continue;
        };
        let mut remainder = Remainder::new(insertion, piece.source.offset);
        remainder.list.truncate(piece.len);
        for (j, node) in remainder.list.iter().enumerate() {
            if let Vertical::Mark(mark) = node {
                marks.push(((piece.source.node, remainder.original(j)), mark.clone()));
            }
        }
        by_class
            .entry(piece.class)
            .or_default()
            .extend(remainder.list);
    }
    let insertions = by_class
        .into_iter()
        .map(|(class, list)| {
            let packed = vpack(
                list,
                Target::Additional(Scaled::ZERO),
                Scaled::MAX_DIMEN,
                params,
                &mut diagnostics,
            );
            (class, packed)
        })
        .collect();

    let mut floats_top = vec![];
    let mut floats_bottom = vec![];
    for &i in &state.floats {
        let Some(float) = take_float(slots, i) else {
            continue;
        };
        for (j, node) in float.content.list.iter().enumerate() {
            if let Vertical::Mark(mark) = node {
                marks.push(((i, j), mark.clone()));
            }
        }
        match float.placement {
            Placement::Top => floats_top.push(float.content),
            Placement::Bottom => floats_bottom.push(float.content),
        }
    }

    marks.sort_by_key(|(key, _)| *key);
    let mut triples: BTreeMap<u8, MarkTriple> = bots
        .iter()
        .map(|(class, bot)| {
            let triple = MarkTriple {
                top: Some(bot.clone()),
                first: Some(bot.clone()),
                bot: Some(bot.clone()),
            };
            (*class, triple)
        })
        .collect();
    let mut seen = BTreeSet::new();
    for (_, mark) in marks {
        let triple = triples.entry(mark.class).or_default();
        if seen.insert(mark.class) {
            triple.first = Some(mark.payload.clone());
        }
        triple.bot = Some(mark.payload);
    }
    for (class, triple) in &triples {
        if let Some(bot) = &triple.bot {
            bots.insert(*class, bot.clone());
        }
    }

    let content = vpack(
        content,
        Target::Exactly(state.goal()),
        state.max_depth,
        params,
        &mut diagnostics,
    );
    Page {
        content,
        floats_top,
        floats_bottom,
        insertions,
        marks: triples,
        diagnostics,
    }
}

fn take_float(slots: &mut [Option<Vertical>], i: usize) -> Option<Float> {
    let slot = slots.get_mut(i)?;
    if !matches!(slot, Some(Vertical::Float(_))) {
        return None;
    }
    match slot.take() {
        Some(Vertical::Float(float)) => Some(float),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::WithHook;
    use crate::split::BestVerticalBreak;
    use crate::vlist::VerticalList;
    use galley_core::Glue as CoreGlue;

    fn pt(n: i32) -> Scaled {
        Scaled(n << 16)
    }

    fn line() -> Vertical {
        Vertical::HList(HList {
            height: pt(8),
            depth: pt(2),
            width: pt(100),
            ..Default::default()
        })
    }

    fn block(height: i32) -> Vertical {
        Vertical::HList(HList {
            height: pt(height),
            width: pt(100),
            ..Default::default()
        })
    }

    fn mark(payload: &str) -> Vertical {
        Vertical::Mark(Mark {
            class: 0,
            payload: payload.into(),
        })
    }

    fn penalty(value: i32) -> Vertical {
        Vertical::Penalty(Penalty { value })
    }

    fn params(goal: i32) -> Params {
        Params {
            page_goal: pt(goal),
            baseline_skip: CoreGlue {
                width: pt(12),
                stretch: pt(1),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Lines 8pt high and 2pt deep, 12pt apart, with 1pt of stretch between them.
    fn lines(n: usize, params: &Params) -> Vec<Vertical> {
        let mut vlist = VerticalList::new();
        for _ in 0..n {
            vlist.append_box(line(), params);
        }
        vlist.into_list()
    }

    fn lines_per_page(pages: &[Page]) -> Vec<usize> {
        pages
            .iter()
            .map(|page| {
                page.content
                    .list
                    .iter()
                    .filter(|n| matches!(n, Vertical::HList(_)))
                    .count()
            })
            .collect()
    }

    fn run(list: Vec<Vertical>, params: &mut Params) -> Vec<Page> {
        break_pages(list, params, &BestVerticalBreak).unwrap()
    }

    #[test]
    fn empty_list() {
        assert_eq!(run(vec![], &mut params(100)), vec![]);
    }

    #[test]
    fn only_discardables() {
        let list = vec![
            Vertical::Glue(Glue::new(CoreGlue::rigid(pt(5)))),
            penalty(0),
        ];
        assert_eq!(run(list, &mut params(100)), vec![]);
    }

    #[test]
    fn fills_pages() {
        let mut p = params(100);
        let pages = run(lines(20, &p), &mut p);
        // Eight lines are 94pt high with 7pt of stretch, badness 63.
        // Seven lines would have badness 2698 and nine don't fit.
        assert_eq!(lines_per_page(&pages), vec![8, 8, 4]);
        for page in &pages {
            assert_eq!(page.content.height, pt(100));
            assert!(page.diagnostics.is_empty());
        }
    }

    #[test]
    fn top_skip_is_inserted() {
        let mut p = params(100);
        let pages = run(lines(20, &p), &mut p);
        for page in &pages {
            match page.content.list.first() {
                Some(Vertical::Glue(glue)) => {
                    assert_eq!(glue.kind, GlueKind::TopSkip);
                    assert_eq!(glue.value.width, pt(2));
                }
                other => panic!("page starts with {other:?}"),
            }
        }
    }

    #[test]
    fn forced_break() {
        let mut p = params(100);
        let list = vec![line(), Vertical::Glue(Glue::new(p.baseline_skip)), line(), penalty(Penalty::EJECT), line()];
        let pages = run(list, &mut p);
        assert_eq!(lines_per_page(&pages), vec![2, 1]);
    }

    #[test]
    fn parameters_are_read_at_each_breakpoint() {
        let p = params(100);
        let list = vec![
            line(),
            Vertical::Glue(Glue::new(p.baseline_skip)),
            line(),
            penalty(Penalty::EJECT),
            line(),
        ];
        let mut seen = vec![];
        let mut ctx = WithHook::new(p, |position, _: &mut Params| seen.push(position));
        let pages = break_pages(list, &mut ctx, &BestVerticalBreak).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(seen, vec![1, 3, 5]);
    }

    #[test]
    fn page_goal_change_applies_to_the_open_page() {
        let p = params(100);
        let list = lines(20, &p);
        let mut ctx = WithHook::new(p, |position, params: &mut Params| {
            if position >= 5 {
                params.page_goal = pt(50);
            }
        });
        let pages = break_pages(list, &mut ctx, &BestVerticalBreak).unwrap();
        // Four lines are 46pt high with 3pt of stretch; a fifth doesn't fit in 50pt.
        assert_eq!(lines_per_page(&pages), vec![4, 4, 4, 4, 4]);
        for page in &pages {
            assert_eq!(page.content.height, pt(50));
        }
    }

    #[test]
    fn max_depth_change_applies_to_the_open_page() {
        let p = params(100);
        let list = lines(3, &p);
        let unchanged = run(list.clone(), &mut p.clone());
        assert_eq!(unchanged[0].content.depth, pt(2));

        let mut ctx = WithHook::new(p, |position, params: &mut Params| {
            if position >= 3 {
                params.max_depth = Scaled::ZERO;
            }
        });
        let pages = break_pages(list, &mut ctx, &BestVerticalBreak).unwrap();
        assert_eq!(lines_per_page(&pages), vec![3]);
        assert_eq!(pages[0].content.depth, Scaled::ZERO);
        assert_eq!(pages[0].content.height, pt(100));
    }

    #[test]
    fn breaks_are_deterministic() {
        let mut p = params(100);
        let first = run(lines(37, &p), &mut p);
        let second = run(lines(37, &p), &mut p);
        assert_eq!(first, second);
    }

    #[test]
    fn oversized_box_forces_infeasible_page() {
        let pages = run(vec![block(200)], &mut params(100));
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0].diagnostics,
            vec![Diagnostic::InfeasiblePage { page: 1 }]
        );
    }

    #[test]
    fn marks() {
        let mut p = params(100);
        let mut list = vec![mark("a")];
        list.extend(lines(8, &p));
        list.push(mark("b"));
        list.push(mark("c"));
        list.extend(lines(8, &p)[1..].iter().cloned());
        let pages = run(list, &mut p);
        assert_eq!(pages.len(), 2);
        assert_eq!(
            pages[0].marks[&0],
            MarkTriple {
                top: None,
                first: Some("a".into()),
                bot: Some("c".into()),
            }
        );
        assert_eq!(
            pages[1].marks[&0],
            MarkTriple {
                top: Some("c".into()),
                first: Some("c".into()),
                bot: Some("c".into()),
            }
        );
    }

    /// 29 blocks of 10pt separated by glue that stretches 1pt,
    ///     with a mark after the fifth block.
    fn footnote() -> Insertion {
        let mut list = vec![];
        for i in 0..29 {
            if i > 0 {
                list.push(Vertical::Glue(Glue::new(CoreGlue {
                    stretch: pt(1),
                    ..Default::default()
                })));
            }
            list.push(block(10));
            if i == 4 {
                list.push(mark("note"));
            }
        }
        Insertion::new(0, list)
    }

    #[test]
    fn insertion_taller_than_page_is_split_across_two_pages() {
        let mut p = params(200);
        let ins = footnote();
        assert_eq!(ins.height, pt(290));
        let list = vec![mark("intro"), block(10), Vertical::Insertion(ins)];
        let pages = run(list, &mut p);
        assert_eq!(pages.len(), 2);
        // The page has 10pt of content, so 190pt are left for the insertion.
        assert_eq!(pages[0].insertions[&0].height, pt(190));
        assert_eq!(pages[1].insertions[&0].height, pt(100));
        assert_eq!(pages[0].marks[&0].first, Some("intro".into()));
        assert_eq!(pages[0].marks[&0].bot, Some("note".into()));
        assert_eq!(pages[1].marks[&0].first, pages[0].marks[&0].bot);
        assert!(pages.iter().all(|page| page.diagnostics.is_empty()));
    }

    #[test]
    fn unsplittable_insertion_is_held_over() {
        let mut p = params(100);
        let mut ins = Insertion::new(0, vec![block(150)]);
        ins.split_policy = SplitPolicy::Unsplittable;
        let list = vec![block(10), Vertical::Insertion(ins), block(10)];
        let pages = run(list, &mut p);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].insertions.is_empty());
        assert_eq!(pages[1].insertions[&0].height, pt(150));
        assert!(pages[1].diagnostics.contains(&Diagnostic::InsertionOverflow {
            class: 0,
            excess: pt(50)
        }));
    }

    #[test]
    fn insertion_max_limits_a_class() {
        let mut p = params(200);
        p.insertion_max.insert(0, pt(50));
        let mut list = vec![block(10)];
        for _ in 0..3 {
            let mut ins = Insertion::new(0, vec![block(30)]);
            ins.split_policy = SplitPolicy::Unsplittable;
            ins.float_penalty = 0;
            list.push(Vertical::Insertion(ins));
        }
        let pages = run(list, &mut p);
        let heights: Vec<Scaled> = pages
            .iter()
            .map(|page| page.insertions.get(&0).map(|b| b.height).unwrap_or_default())
            .collect();
        // Only one insertion fits under the limit on each page.
        assert_eq!(heights, vec![pt(30), pt(30), pt(30)]);
        assert!(pages.iter().all(|page| page.diagnostics.is_empty()));
    }

    fn float(height: i32) -> Vertical {
        Vertical::Float(Float {
            placement: Placement::Top,
            content: VList {
                height: pt(height),
                ..Default::default()
            },
        })
    }

    #[test]
    fn deferred_floats_keep_their_order() {
        let mut p = params(100);
        p.float_separation = Scaled::ZERO;
        let mut list = lines(3, &p);
        list.push(float(80));
        list.push(float(10));
        list.extend(lines(3, &p)[1..].iter().cloned());
        let pages = run(list, &mut p);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].floats_top.is_empty());
        let heights: Vec<Scaled> = pages[1].floats_top.iter().map(|f| f.height).collect();
        assert_eq!(heights, vec![pt(80), pt(10)]);
    }

    #[test]
    fn float_that_fits_is_placed() {
        let mut p = params(100);
        p.float_separation = pt(5);
        let mut list = lines(2, &p);
        list.push(float(20));
        let pages = run(list, &mut p);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].floats_top.len(), 1);
        assert_eq!(pages[0].content.height, pt(75));
    }

    #[test]
    fn budget_exceeded() {
        let mut p = params(100);
        p.max_list_len = 2;
        assert_eq!(
            break_pages(lines(2, &p), &mut p, &BestVerticalBreak),
            Err(crate::Error::NodeBudgetExceeded { len: 3, max: 2 })
        );
    }
}
