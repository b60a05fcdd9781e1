// Stable, position-valued references into TIR trees, spec §4.3. A cursor
// is a (proc-version, path) pair; no existing tree in this codebase has a
// direct analogue (`Node<T>` trees elsewhere are navigated by direct `Rc`
// cloning, never by a path that survives a rewrite), so this module is
// grounded on §4.3's prose plus this codebase's general preference for
// `Rc`-sharing: a cursor holds a `Weak<Proc>` tag rather than an arena
// index, staying in that ownership idiom even though the path/forwarding
// mechanism itself is new.

use crate::error::{CursorInvalid, ParseFragmentError, SchedulingError};
use crate::pattern::{self, Pattern};
use crate::printer::print_stmt;
use crate::stmt::{Proc, Statement};
use std::rc::{Rc, Weak};

/// One step from a parent node to a named child. `body`/`orelse` steps
/// additionally carry the index of the element within that block.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Step {
    Body(usize),
    Orelse(usize),
    Cond,
    Lo,
    Hi,
    Rhs,
    Callee,
}

/// A path from the procedure root to a node, gap, or selection.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Path(pub Vec<Step>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn child(&self, step: Step) -> Path {
        let mut steps = self.0.clone();
        steps.push(step);
        Path(steps)
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            let mut steps = self.0.clone();
            steps.pop();
            Some(Path(steps))
        }
    }

    /// The index of the block this path's last step addresses, and that
    /// block's containing path, if the last step is a `Body`/`Orelse`.
    fn block_index(&self) -> Option<(Path, usize)> {
        let mut steps = self.0.clone();
        match steps.pop()? {
            Step::Body(i) | Step::Orelse(i) => Some((Path(steps), i)),
            _ => None,
        }
    }
}

/// What a cursor names: a single node, a gap between statements, or a
/// contiguous range `[i, j)` of statements -- all within the *same* block,
/// addressed by the path to that block.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Position {
    Node(Path),
    Gap { block: Path, index: usize },
    Selection { block: Path, lo: usize, hi: usize },
}

/// A cursor: a position within a specific procedure version. Cursors hold
/// a weak reference so that once the procedure they were minted against is
/// dropped, every operation fails with `CursorInvalid` instead of
/// dangling.
#[derive(Clone, Debug)]
pub struct Cursor {
    proc: Weak<Proc>,
    pos: Position,
}

impl Cursor {
    pub fn root(proc: &Rc<Proc>) -> Cursor {
        Cursor { proc: Rc::downgrade(proc), pos: Position::Node(Path::root()) }
    }

    pub fn at(proc: &Rc<Proc>, pos: Position) -> Cursor {
        Cursor { proc: Rc::downgrade(proc), pos }
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }

    fn upgrade(&self) -> Result<Rc<Proc>, CursorInvalid> {
        self.proc.upgrade().ok_or(CursorInvalid::Dropped)
    }

    /// Resolve the block (statement slice) this cursor's position lives
    /// in, and the statement index(es) it covers.
    fn resolve_block<'a>(&self, proc: &'a Proc) -> Result<(&'a [Statement], Path), CursorInvalid> {
        let path = match &self.pos {
            Position::Node(p) => p.parent().unwrap_or_else(Path::root),
            Position::Gap { block, .. } => block.clone(),
            Position::Selection { block, .. } => block.clone(),
        };
        let block = resolve_path_to_block(proc, &path)?;
        Ok((block, path))
    }

    pub fn node(&self) -> Result<Statement, CursorInvalid> {
        let proc = self.upgrade()?;
        match &self.pos {
            Position::Node(path) => resolve_path_to_statement(&proc, path),
            _ => Err(CursorInvalid::BadPath("cursor does not name a single node".to_string())),
        }
    }

    pub fn children(&self) -> Result<Vec<Cursor>, CursorInvalid> {
        let proc = self.upgrade()?;
        let stmt = self.node()?;
        let Position::Node(path) = &self.pos else { unreachable!() };
        let mut out = Vec::new();
        match stmt {
            Statement::If { body, orelse, .. } => {
                for i in 0..body.len() {
                    out.push(Cursor::at(&proc, Position::Node(path.child(Step::Body(i)))));
                }
                // The orelse branch is selected the same way
                // `walk_statements` encodes it: `Orelse(own_index)` off the
                // *parent* block's path, then the child's own `Body(j)`
                // step within that orelse block -- not `path.child(..)`,
                // which would append onto the If's own path instead of
                // replacing its last step.
                if !orelse.is_empty() {
                    let own_idx = step_index(path.0.last().unwrap());
                    let parent_path = path.parent().unwrap_or_else(Path::root);
                    let orelse_block = parent_path.child(Step::Orelse(own_idx));
                    for j in 0..orelse.len() {
                        out.push(Cursor::at(&proc, Position::Node(orelse_block.child(Step::Body(j)))));
                    }
                }
            }
            Statement::For { body, .. } | Statement::With { body, .. } => {
                for i in 0..body.len() {
                    out.push(Cursor::at(&proc, Position::Node(path.child(Step::Body(i)))));
                }
            }
            _ => {}
        }
        Ok(out)
    }

    pub fn parent(&self) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        let path = match &self.pos {
            Position::Node(p) => p.parent().ok_or(CursorInvalid::BadPath("root has no parent".to_string()))?,
            Position::Gap { block, .. } | Position::Selection { block, .. } => block.clone(),
        };
        let parent_block_path = path.parent().unwrap_or_else(Path::root);
        Ok(Cursor::at(&proc, Position::Node(parent_block_path)))
    }

    /// Select the body block if this cursor names a `For`/`With`/`If`
    /// node (the first/then branch).
    pub fn body(&self) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        let stmt = self.node()?;
        let Position::Node(path) = &self.pos else { unreachable!() };
        match stmt {
            Statement::For { body, .. } | Statement::With { body, .. } | Statement::If { body, .. } => {
                if body.is_empty() {
                    Ok(Cursor::at(&proc, Position::Gap { block: path.child(Step::Body(0)).parent().unwrap(), index: 0 }))
                } else {
                    Ok(Cursor::at(&proc, Position::Node(path.child(Step::Body(0)))))
                }
            }
            _ => Err(CursorInvalid::BadPath("node has no body block".to_string())),
        }
    }

    pub fn next(&self, k: usize) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        let Position::Node(path) = &self.pos else {
            return Err(CursorInvalid::BadPath("next() requires a node cursor".to_string()));
        };
        let (block_path, idx) = path.block_index().ok_or(CursorInvalid::BadPath("not inside a block".to_string()))?;
        let block = resolve_path_to_block(&proc, &block_path)?;
        let new_idx = idx + k;
        if new_idx >= block.len() {
            return Err(CursorInvalid::BadPath("next() past end of block".to_string()));
        }
        Ok(Cursor::at(&proc, Position::Node(reindex(&block_path, path, new_idx))))
    }

    pub fn prev(&self, k: usize) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        let Position::Node(path) = &self.pos else {
            return Err(CursorInvalid::BadPath("prev() requires a node cursor".to_string()));
        };
        let (block_path, idx) = path.block_index().ok_or(CursorInvalid::BadPath("not inside a block".to_string()))?;
        if idx < k {
            return Err(CursorInvalid::BadPath("prev() before start of block".to_string()));
        }
        Ok(Cursor::at(&proc, Position::Node(reindex(&block_path, path, idx - k))))
    }

    /// The gap immediately before this node.
    pub fn before(&self) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        match &self.pos {
            Position::Node(path) => {
                let (block_path, idx) = path.block_index().ok_or(CursorInvalid::BadPath("not inside a block".to_string()))?;
                Ok(Cursor::at(&proc, Position::Gap { block: block_path, index: idx }))
            }
            Position::Selection { block, lo, .. } => Ok(Cursor::at(&proc, Position::Gap { block: block.clone(), index: *lo })),
            Position::Gap { .. } => Err(CursorInvalid::BadPath("a gap has no `before`".to_string())),
        }
    }

    /// The gap immediately after this node.
    pub fn after(&self) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        match &self.pos {
            Position::Node(path) => {
                let (block_path, idx) = path.block_index().ok_or(CursorInvalid::BadPath("not inside a block".to_string()))?;
                Ok(Cursor::at(&proc, Position::Gap { block: block_path, index: idx + 1 }))
            }
            Position::Selection { block, hi, .. } => Ok(Cursor::at(&proc, Position::Gap { block: block.clone(), index: *hi })),
            Position::Gap { .. } => Err(CursorInvalid::BadPath("a gap has no `after`".to_string())),
        }
    }

    /// Grow a node into a selection spanning `[self-left, self+right]`.
    pub fn expand(&self, left: usize, right: usize) -> Result<Cursor, CursorInvalid> {
        let proc = self.upgrade()?;
        let Position::Node(path) = &self.pos else {
            return Err(CursorInvalid::BadPath("expand() requires a node cursor".to_string()));
        };
        let (block_path, idx) = path.block_index().ok_or(CursorInvalid::BadPath("not inside a block".to_string()))?;
        let block = resolve_path_to_block(&proc, &block_path)?;
        let lo = idx.saturating_sub(left);
        let hi = (idx + right + 1).min(block.len());
        Ok(Cursor::at(&proc, Position::Selection { block: block_path, lo, hi }))
    }

    pub fn as_selection(&self) -> Option<(Path, usize, usize)> {
        match &self.pos {
            Position::Selection { block, lo, hi } => Some((block.clone(), *lo, *hi)),
            Position::Node(path) => path.block_index().map(|(b, i)| (b, i, i + 1)),
            Position::Gap { .. } => None,
        }
    }
}

/// Walk every statement reachable from `proc`'s root, pre-order, pairing
/// each with the path that names it.
fn walk_statements(stmts: &[Statement], prefix: &Path, out: &mut Vec<(Path, Statement)>) {
    for (i, s) in stmts.iter().enumerate() {
        let path = prefix.child(Step::Body(i));
        out.push((path.clone(), s.clone()));
        match s {
            Statement::If { body, orelse, .. } => {
                walk_statements(body, &path, out);
                let orelse_path = prefix.child(Step::Orelse(i));
                walk_statements(orelse, &orelse_path, out);
            }
            Statement::For { body, .. } | Statement::With { body, .. } => walk_statements(body, &path, out),
            _ => {}
        }
    }
}

/// The first line of `print_stmt`'s rendering of `stmt` alone (its own
/// header, not any nested block) -- what `find`/`find_loop` patterns match
/// against, per spec §4.3 "a small pattern language over the printed form".
fn print_stmt_header(stmt: &Statement) -> String {
    let mut out = String::new();
    print_stmt(stmt, 0, &mut out);
    out.lines().next().unwrap_or("").to_string()
}

/// `find(pattern)`: every cursor whose statement's printed header matches
/// `pattern`, searched depth-first from the procedure root.
pub fn find(proc: &Rc<Proc>, pattern: &str) -> Result<Vec<Cursor>, ParseFragmentError> {
    let compiled = pattern::parse(pattern)?;
    let mut stmts = Vec::new();
    walk_statements(&proc.body, &Path::root(), &mut stmts);
    Ok(stmts
        .into_iter()
        .filter(|(_, s)| compiled.matches(&print_stmt_header(s)))
        .map(|(path, _)| Cursor::at(proc, Position::Node(path)))
        .collect())
}

fn find_loops(proc: &Rc<Proc>, pattern: &str, compiled: &Pattern) -> Vec<Cursor> {
    let _ = pattern;
    let mut stmts = Vec::new();
    walk_statements(&proc.body, &Path::root(), &mut stmts);
    stmts
        .into_iter()
        .filter(|(_, s)| matches!(s, Statement::For { .. }) && compiled.matches(&print_stmt_header(s)))
        .map(|(path, _)| Cursor::at(proc, Position::Node(path)))
        .collect()
}

/// `find_loop(pattern, many=False)`: the unique `For` statement whose
/// printed header matches `pattern`. Errors if zero or more than one loop
/// matches -- callers that expect several should use `find_loop_many`.
pub fn find_loop(proc: &Rc<Proc>, pattern: &str) -> Result<Cursor, SchedulingError> {
    let compiled = pattern::parse(pattern).map_err(|e| SchedulingError::new("find_loop", e.to_string()))?;
    let mut matches = find_loops(proc, pattern, &compiled);
    match matches.len() {
        0 => Err(SchedulingError::new("find_loop", format!("no loop matches pattern `{}`", pattern))),
        1 => Ok(matches.remove(0)),
        n => Err(SchedulingError::new("find_loop", format!("pattern `{}` matches {} loops, expected exactly one", pattern, n))),
    }
}

/// `find_loop(pattern, many=True)`: every `For` statement whose printed
/// header matches `pattern`.
pub fn find_loop_many(proc: &Rc<Proc>, pattern: &str) -> Result<Vec<Cursor>, SchedulingError> {
    let compiled = pattern::parse(pattern).map_err(|e| SchedulingError::new("find_loop", e.to_string()))?;
    let matches = find_loops(proc, pattern, &compiled);
    if matches.is_empty() {
        Err(SchedulingError::new("find_loop", format!("no loop matches pattern `{}`", pattern)))
    } else {
        Ok(matches)
    }
}

fn reindex(block_path: &Path, node_path: &Path, new_idx: usize) -> Path {
    let is_orelse = matches!(node_path.0.last(), Some(Step::Orelse(_)));
    if is_orelse {
        block_path.child(Step::Orelse(new_idx))
    } else {
        block_path.child(Step::Body(new_idx))
    }
}

pub(crate) fn resolve_path_to_block<'a>(proc: &'a Proc, path: &Path) -> Result<&'a [Statement], CursorInvalid> {
    let mut block: &[Statement] = &proc.body;
    for step in &path.0 {
        let stmt = block.get(step_index(step)).ok_or_else(|| CursorInvalid::BadPath(format!("{:?}", path)))?;
        block = match (stmt, step) {
            (Statement::If { body, .. }, Step::Body(_)) => body,
            (Statement::If { orelse, .. }, Step::Orelse(_)) => orelse,
            (Statement::For { body, .. }, Step::Body(_)) => body,
            (Statement::With { body, .. }, Step::Body(_)) => body,
            _ => return Err(CursorInvalid::BadPath(format!("{:?}", path))),
        };
    }
    Ok(block)
}

pub(crate) fn resolve_path_to_statement(proc: &Proc, path: &Path) -> Result<Statement, CursorInvalid> {
    if path.0.is_empty() {
        return Err(CursorInvalid::BadPath("root path names the procedure, not a statement".to_string()));
    }
    let parent_path = path.parent().unwrap();
    let block = resolve_path_to_block(proc, &parent_path)?;
    let idx = step_index(path.0.last().unwrap());
    block.get(idx).cloned().ok_or_else(|| CursorInvalid::BadPath(format!("{:?}", path)))
}

pub(crate) fn step_index(step: &Step) -> usize {
    match step {
        Step::Body(i) | Step::Orelse(i) => *i,
        _ => 0,
    }
}

/// A sparse path-rewrite table translating cursors minted against one
/// procedure version to the equivalent position in its successor. Spec
/// §4.3: "Composition of forwardings is composition of functions."
#[derive(Clone, Default)]
pub struct Forwarding {
    /// Exact remaps for paths whose shape changed (e.g. insertion shifts
    /// every later sibling index up by one).
    remap: Vec<(Path, ForwardResult)>,
    /// Default: paths not present in `remap` are carried across unchanged
    /// (the common case -- most of the tree is untouched by a local edit).
    identity: bool,
}

#[derive(Clone, Debug)]
pub enum ForwardResult {
    Same(Path),
    /// The node this path pointed to was deleted; forwards to the nearest
    /// surviving ancestor's adjacent gap instead.
    ToGap(Path, usize),
    Invalid,
}

impl Forwarding {
    pub fn identity() -> Forwarding {
        Forwarding { remap: Vec::new(), identity: true }
    }

    pub fn with_remap(remap: Vec<(Path, ForwardResult)>) -> Forwarding {
        Forwarding { remap, identity: false }
    }

    pub fn apply(&self, cursor: &Cursor, new_proc: &Rc<Proc>) -> Result<Cursor, CursorInvalid> {
        let path = match &cursor.pos {
            Position::Node(p) => p.clone(),
            Position::Gap { block, .. } | Position::Selection { block, .. } => block.clone(),
        };
        for (old, result) in &self.remap {
            if old == &path {
                return match result {
                    ForwardResult::Same(p) => Ok(Cursor::at(new_proc, rebuild_position(&cursor.pos, p))),
                    ForwardResult::ToGap(block, index) => {
                        Ok(Cursor::at(new_proc, Position::Gap { block: block.clone(), index: *index }))
                    }
                    ForwardResult::Invalid => Err(CursorInvalid::NotForwarded(format!("{:?}", path))),
                };
            }
        }
        if self.identity {
            Ok(Cursor::at(new_proc, cursor.pos.clone()))
        } else {
            Err(CursorInvalid::NotForwarded(format!("{:?}", path)))
        }
    }

    /// Compose `self` (applied first) with `then` (applied second).
    pub fn then(self, then: Forwarding) -> Forwarding {
        if self.identity && then.identity {
            return Forwarding::identity();
        }
        let mut remap = Vec::new();
        for (path, result) in &self.remap {
            let composed = match result {
                ForwardResult::Same(p) => then.lookup(p),
                ForwardResult::ToGap(block, index) => then.lookup_gap(block, *index),
                ForwardResult::Invalid => ForwardResult::Invalid,
            };
            remap.push((path.clone(), composed));
        }
        Forwarding { remap, identity: self.identity && then.identity }
    }

    fn lookup(&self, path: &Path) -> ForwardResult {
        for (old, result) in &self.remap {
            if old == path {
                return result.clone();
            }
        }
        if self.identity {
            ForwardResult::Same(path.clone())
        } else {
            ForwardResult::Invalid
        }
    }

    fn lookup_gap(&self, block: &Path, index: usize) -> ForwardResult {
        ForwardResult::ToGap(block.clone(), index)
    }
}

fn rebuild_position(old: &Position, new_path: &Path) -> Position {
    match old {
        Position::Node(_) => Position::Node(new_path.clone()),
        Position::Gap { index, .. } => Position::Gap { block: new_path.clone(), index: *index },
        Position::Selection { lo, hi, .. } => Position::Selection { block: new_path.clone(), lo: *lo, hi: *hi },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{AExpr, Const, ValExpr};
    use crate::stmt::{LoopMode, SrcInfo};
    use crate::symbol::Symbol;

    fn stmt(n: i64) -> Statement {
        Statement::Assign {
            sym: Symbol::fresh(format!("s{}", n)),
            idx: vec![],
            rhs: ValExpr::Const(Const::Int(n)),
            srcinfo: SrcInfo::UNKNOWN,
        }
    }

    fn proc_with_body(n: usize) -> Rc<Proc> {
        let body: Vec<Statement> = (0..n as i64).map(stmt).collect();
        Rc::new(Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Rc::new(body),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        })
    }

    #[test]
    fn navigation_matches_s3_scenario() {
        let proc = proc_with_body(4);
        let root_body: Vec<Cursor> = (0..4)
            .map(|i| Cursor::at(&proc, Position::Node(Path::root().child(Step::Body(i)))))
            .collect();

        assert_eq!(root_body[0].next(1).unwrap().position(), root_body[1].position());
        assert_eq!(root_body[2].prev(2).unwrap().position(), root_body[0].position());
        assert_eq!(root_body[1].before().unwrap().position(), root_body[0].after().unwrap().position());

        let selection = root_body[0].expand(0, 2).unwrap(); // covers [0, 3)
        assert_eq!(selection.after().unwrap().position(), root_body[2].after().unwrap().position());
    }

    #[test]
    fn children_of_if_resolve_into_the_right_branch() {
        // if cond: X; Y else: P; Q   -- placed at root index 1 so the
        // If's own step and the orelse child's own index differ, the
        // case the broken `path.child(..)` construction got wrong.
        let lead = stmt(100);
        let then_branch = vec![stmt(0), stmt(1)];
        let else_branch = vec![stmt(2), stmt(3)];
        let if_stmt = Statement::If {
            cond: crate::expr::Pred::BConst(true),
            body: Rc::new(then_branch.clone()),
            orelse: Rc::new(else_branch.clone()),
            srcinfo: SrcInfo::UNKNOWN,
        };
        let proc = Rc::new(Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Rc::new(vec![lead, if_stmt]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        let if_cursor = Cursor::at(&proc, Position::Node(Path::root().child(Step::Body(1))));
        let children = if_cursor.children().unwrap();
        assert_eq!(children.len(), 4);
        let sym_name = |c: &Cursor| match c.node().unwrap() {
            Statement::Assign { sym, .. } => sym.base().to_string(),
            other => panic!("expected an Assign, got {:?}", other),
        };
        assert_eq!(sym_name(&children[0]), "s0");
        assert_eq!(sym_name(&children[1]), "s1");
        assert_eq!(sym_name(&children[2]), "s2");
        assert_eq!(sym_name(&children[3]), "s3");
        assert_eq!(
            children[2].position(),
            &Position::Node(Path::root().child(Step::Orelse(1)).child(Step::Body(0)))
        );
    }

    #[test]
    fn cursor_invalid_after_proc_dropped() {
        let cursor;
        {
            let proc = proc_with_body(1);
            cursor = Cursor::root(&proc);
        }
        assert!(matches!(cursor.node(), Err(CursorInvalid::Dropped)));
    }

    #[test]
    fn forwarding_identity_carries_cursor_across() {
        let proc = proc_with_body(2);
        let proc2 = proc_with_body(2);
        let cursor = Cursor::at(&proc, Position::Node(Path::root().child(Step::Body(1))));
        let fwd = Forwarding::identity();
        let carried = fwd.apply(&cursor, &proc2).unwrap();
        assert_eq!(carried.position(), cursor.position());
    }

    fn loop_proc() -> Rc<Proc> {
        let i = Symbol::fresh("i");
        let j = Symbol::fresh("j");
        let inner = Statement::For {
            iter: j,
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(16),
            mode: LoopMode::Seq,
            body: std::rc::Rc::new(vec![stmt(0)]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        let outer = Statement::For {
            iter: i,
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(4),
            mode: LoopMode::Seq,
            body: std::rc::Rc::new(vec![inner]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        Rc::new(Proc { name: "p".to_string(), args: vec![], preconditions: vec![], body: Rc::new(vec![outer]), instr: None, srcinfo: SrcInfo::UNKNOWN })
    }

    #[test]
    fn find_matches_assign_by_header() {
        let proc = proc_with_body(3);
        let hits = find(&proc, "_ = 1").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node().unwrap().srcinfo(), &SrcInfo::UNKNOWN);
    }

    #[test]
    fn find_loop_locates_unique_matching_header() {
        let proc = loop_proc();
        let outer = find_loop(&proc, "for _ in seq(0, 4):").unwrap();
        assert!(matches!(outer.node().unwrap(), Statement::For { .. }));
    }

    #[test]
    fn find_loop_many_returns_every_loop_header_match() {
        let proc = loop_proc();
        let all = find_loop_many(&proc, "for _ in seq(0, ...):").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn find_loop_rejects_zero_matches() {
        let proc = loop_proc();
        assert!(find_loop(&proc, "for _ in seq(0, 999):").is_err());
    }
}
