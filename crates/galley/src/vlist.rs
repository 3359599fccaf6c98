//! Building vertical lists out of boxes and broken paragraphs.

use crate::diagnostics::Diagnostic;
use crate::linebreak::Paragraph;
use crate::node::*;
use crate::params::Params;
use galley_core::Scaled;

/// A vertical list under construction.
///
/// This tracks `\prevdepth` so that interline glue can be computed
///     when a box is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalList {
    pub list: Vec<Vertical>,
    pub prev_depth: Scaled,
}

impl Default for VerticalList {
    fn default() -> Self {
        VerticalList {
            list: vec![],
            prev_depth: VerticalList::IGNORE_DEPTH,
        }
    }
}

impl VerticalList {
    /// Value of `prev_depth` that suppresses interline glue; -1000pt.
    pub const IGNORE_DEPTH: Scaled = Scaled(-65536000);

    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a box, preceded by interline glue.
    ///
    /// If `\baselineskip` minus the previous depth and the box height is at least
    ///     `\lineskiplimit`, the glue is `\baselineskip` with that width.
    /// Otherwise it is `\lineskip`.
    ///
    /// TeX.2021.679.
    pub fn append_box(&mut self, node: Vertical, params: &Params) {
        let Some((height, depth)) = node.box_dimensions() else {
            self.push(node);
            return;
        };
        if self.prev_depth > VerticalList::IGNORE_DEPTH {
            let d = params.baseline_skip.width - self.prev_depth - height;
            let glue = if d < params.line_skip_limit {
                Glue {
                    kind: GlueKind::LineSkip,
                    value: params.line_skip,
                }
            } else {
                Glue {
                    kind: GlueKind::BaselineSkip,
                    value: galley_core::Glue {
                        width: d,
                        ..params.baseline_skip
                    },
                }
            };
            self.list.push(Vertical::Glue(glue));
        }
        self.list.push(node);
        self.prev_depth = depth;
    }

    /// Appends a node without interline glue.
    ///
    /// A rule suppresses the interline glue before the next box.
    pub fn push(&mut self, node: Vertical) {
        if matches!(node, Vertical::Rule(_)) {
            self.prev_depth = VerticalList::IGNORE_DEPTH;
        }
        self.list.push(node);
    }

    /// Appends the lines of a broken paragraph and returns its diagnostics.
    ///
    /// Between two lines a penalty is added made up of `\interlinepenalty`,
    ///     `\clubpenalty` after the first line,
    ///     `\widowpenalty` before the last line,
    ///     and `\brokenpenalty` after a line that ends at a discretionary.
    /// Marks and insertions at the top level of a line migrate out of it
    ///     and are appended after the line's box.
    ///
    /// TeX.2021.890.
    pub fn append_paragraph(&mut self, paragraph: Paragraph, params: &Params) -> Vec<Diagnostic> {
        let n = paragraph.lines.len();
        for (j, (mut line, record)) in paragraph
            .lines
            .into_iter()
            .zip(paragraph.breaks.iter())
            .enumerate()
        {
            let migrated = migrate(&mut line.list);
            self.append_box(Vertical::HList(line), params);
            self.list.extend(migrated);
            let number = j + 1;
            if number == n {
                continue;
            }
            let mut penalty = params.inter_line_penalty;
            if number == 1 {
                penalty += params.club_penalty;
            }
            if number + 1 == n {
                penalty += params.widow_penalty;
            }
            if record.hyphenated {
                penalty += params.broken_penalty;
            }
            if penalty != 0 {
                self.list.push(Vertical::Penalty(Penalty { value: penalty }));
            }
        }
        paragraph.diagnostics
    }

    pub fn into_list(self) -> Vec<Vertical> {
        self.list
    }
}

/// Removes marks and insertions from the top level of a line.
///
/// They have no width, so the packed line keeps its dimensions.
fn migrate(list: &mut Vec<Horizontal>) -> Vec<Vertical> {
    let mut migrated = vec![];
    let mut kept = Vec::with_capacity(list.len());
    for node in list.drain(..) {
        match node {
            Horizontal::Mark(mark) => migrated.push(Vertical::Mark(mark)),
            Horizontal::Insertion(insertion) => migrated.push(Vertical::Insertion(insertion)),
            other => kept.push(other),
        }
    }
    *list = kept;
    migrated
}
