//! The scoped symbol table.

use fxhash::{FxHashMap, FxHashSet};
use indexmap::IndexSet;
use lpc_source::Position;

use crate::error::SymbolError;
use crate::symbol::{Symbol, SymbolData, SymbolId, SymbolKind, SymbolRef, TableId};

/// Looks tables up by id. Resolution only ever reads through it.
pub trait TableProvider {
    fn table(&self, id: TableId) -> Option<&SymbolTable>;
}

/// Symbols of one source unit (or of a builtin table), plus the tables
/// whose top-level symbols are visible from it.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    id: TableId,
    allow_duplicates: bool,
    symbols: Vec<Symbol>,
    top_level: Vec<SymbolId>,
    /// Top-level symbols by name, in insertion order.
    by_name: FxHashMap<String, Vec<SymbolId>>,
    dependencies: IndexSet<TableId>,
    /// Resolved uses of a name within this table's unit.
    references: FxHashMap<String, u32>,
}

impl SymbolTable {
    pub fn new(id: TableId, allow_duplicates: bool) -> Self {
        Self {
            id,
            allow_duplicates,
            symbols: Vec::new(),
            top_level: Vec::new(),
            by_name: FxHashMap::default(),
            dependencies: IndexSet::new(),
            references: FxHashMap::default(),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Drop all symbols, reference counts and dependency links.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.top_level.clear();
        self.by_name.clear();
        self.dependencies.clear();
        self.references.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Insert a symbol under `parent` (or at the top level).
    ///
    /// A table that rejects duplicates refuses a second top-level symbol
    /// with an existing name and stays unchanged.
    pub fn add_symbol(
        &mut self,
        parent: Option<SymbolId>,
        data: SymbolData,
    ) -> Result<SymbolId, SymbolError> {
        if let Some(parent) = parent {
            if parent.index() >= self.symbols.len() {
                return Err(SymbolError::UnknownParent(parent));
            }
        } else if !self.allow_duplicates && !data.name.is_empty() {
            if let Some(previous) = self.by_name.get(&data.name).and_then(|ids| ids.first()) {
                return Err(SymbolError::DuplicateDeclaration {
                    name: data.name,
                    range: data.range,
                    previous: self.symbols[previous.index()].range,
                });
            }
        }

        let id = SymbolId(self.symbols.len() as u32);
        let name = data.name.clone();
        self.symbols.push(Symbol::from_data(data, parent));
        match parent {
            Some(parent) => self.symbols[parent.index()].children.push(id),
            None => {
                self.top_level.push(id);
                self.by_name.entry(name).or_default().push(id);
            }
        }
        Ok(id)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn symbol_ref(&self, id: SymbolId) -> SymbolRef {
        SymbolRef {
            table: self.id,
            symbol: id,
        }
    }

    pub fn top_level(&self) -> &[SymbolId] {
        &self.top_level
    }

    /// Every symbol of the table, nested ones included.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(idx, symbol)| (SymbolId(idx as u32), symbol))
    }

    /// Top-level symbols with this name, in declaration order.
    pub fn lookup_local(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn children(&self, id: SymbolId) -> &[SymbolId] {
        &self.symbols[id.index()].children
    }

    pub fn ancestors(&self, id: SymbolId) -> impl Iterator<Item = SymbolId> + '_ {
        std::iter::successors(Some(id), move |s| self.symbols[s.index()].parent)
    }

    // ---- dependencies ---------------------------------------------------

    /// Adding a present dependency or the table itself is a no-op.
    pub fn add_dependency(&mut self, table: TableId) -> bool {
        if table == self.id {
            return false;
        }
        self.dependencies.insert(table)
    }

    pub fn remove_dependency(&mut self, table: TableId) -> bool {
        self.dependencies.shift_remove(&table)
    }

    pub fn has_dependency(&self, table: TableId) -> bool {
        self.dependencies.contains(&table)
    }

    /// Dependencies in the order they were added.
    pub fn dependencies(&self) -> impl Iterator<Item = TableId> + '_ {
        self.dependencies.iter().copied()
    }

    // ---- resolution -----------------------------------------------------

    /// First top-level symbol called `name`: own symbols, then each
    /// dependency in addition order (depth first), each table once.
    pub fn resolve<P: TableProvider + ?Sized>(
        &self,
        provider: &P,
        name: &str,
        local_only: bool,
    ) -> Option<SymbolRef> {
        self.resolve_matching(provider, name, local_only, |_| true)
    }

    /// Like [`resolve`](Self::resolve) but skips symbols failing `accept`.
    pub fn resolve_matching<P, F>(
        &self,
        provider: &P,
        name: &str,
        local_only: bool,
        accept: F,
    ) -> Option<SymbolRef>
    where
        P: TableProvider + ?Sized,
        F: Fn(&Symbol) -> bool,
    {
        let mut visited = FxHashSet::default();
        self.resolve_walk(provider, name, local_only, &accept, &mut visited)
    }

    fn resolve_walk<P, F>(
        &self,
        provider: &P,
        name: &str,
        local_only: bool,
        accept: &F,
        visited: &mut FxHashSet<TableId>,
    ) -> Option<SymbolRef>
    where
        P: TableProvider + ?Sized,
        F: Fn(&Symbol) -> bool,
    {
        if !visited.insert(self.id) {
            return None;
        }
        if let Some(id) = self
            .lookup_local(name)
            .iter()
            .copied()
            .find(|id| accept(self.symbol(*id)))
        {
            return Some(self.symbol_ref(id));
        }
        if local_only {
            return None;
        }
        for dep in &self.dependencies {
            let Some(table) = provider.table(*dep) else {
                log::trace!("dependency {dep:?} of table {:?} is not available", self.id);
                continue;
            };
            if let Some(found) = table.resolve_walk(provider, name, false, accept, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Resolve from inside `scope`: the innermost enclosing scope declaring
    /// `name` wins, then top-level symbols and dependencies.
    pub fn resolve_in_scope<P: TableProvider + ?Sized>(
        &self,
        provider: &P,
        scope: Option<SymbolId>,
        name: &str,
    ) -> Option<SymbolRef> {
        if let Some(scope) = scope {
            for current in self.ancestors(scope) {
                let found = self
                    .children(current)
                    .iter()
                    .rev()
                    .copied()
                    .find(|child| {
                        let symbol = self.symbol(*child);
                        symbol.name == name && !matches!(symbol.kind(), SymbolKind::Block)
                    });
                if let Some(found) = found {
                    return Some(self.symbol_ref(found));
                }
            }
        }
        self.resolve(provider, name, false)
    }

    /// Innermost scope-bearing symbol covering `pos`.
    pub fn scope_at(&self, pos: Position) -> Option<SymbolId> {
        let mut found = None;
        let mut candidates: &[SymbolId] = &self.top_level;
        'descend: loop {
            for id in candidates {
                let symbol = self.symbol(*id);
                if symbol.kind().is_scope() && symbol.range.contains(pos) {
                    found = Some(*id);
                    candidates = &symbol.children;
                    continue 'descend;
                }
            }
            return found;
        }
    }

    /// Symbols visible from `scope` (innermost first), without dependencies.
    pub fn visible_in_scope(&self, scope: Option<SymbolId>) -> Vec<SymbolId> {
        let mut out = Vec::new();
        if let Some(scope) = scope {
            for current in self.ancestors(scope) {
                out.extend(
                    self.children(current)
                        .iter()
                        .copied()
                        .filter(|c| self.symbol(*c).kind() != SymbolKind::Block),
                );
            }
        }
        out.extend(self.top_level.iter().copied());
        out
    }

    /// Lazy, restartable walk over the top-level symbols of this table and
    /// (optionally) its dependencies, each table visited once.
    pub fn get_all_symbols<'a, P: TableProvider + ?Sized>(
        &'a self,
        provider: &'a P,
        kind: Option<SymbolKind>,
        include_dependencies: bool,
    ) -> AllSymbols<'a, P> {
        let mut iter = AllSymbols {
            provider,
            kind,
            include_dependencies,
            current: None,
            pending: Vec::new(),
            visited: std::iter::once(self.id).collect(),
        };
        iter.enter(self);
        iter
    }

    // ---- reference counts -----------------------------------------------

    pub fn record_reference(&mut self, name: &str) {
        *self.references.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn local_reference_count(&self, name: &str) -> u32 {
        self.references.get(name).copied().unwrap_or(0)
    }

    pub fn clear_references(&mut self) {
        self.references.clear();
    }
}

/// Iterator returned by [`SymbolTable::get_all_symbols`].
pub struct AllSymbols<'a, P: TableProvider + ?Sized> {
    provider: &'a P,
    kind: Option<SymbolKind>,
    include_dependencies: bool,
    current: Option<(&'a SymbolTable, usize)>,
    /// Tables still to visit, top of stack next.
    pending: Vec<TableId>,
    visited: FxHashSet<TableId>,
}

impl<P: TableProvider + ?Sized> Clone for AllSymbols<'_, P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider,
            kind: self.kind,
            include_dependencies: self.include_dependencies,
            current: self.current,
            pending: self.pending.clone(),
            visited: self.visited.clone(),
        }
    }
}

impl<'a, P: TableProvider + ?Sized> AllSymbols<'a, P> {
    fn enter(&mut self, table: &'a SymbolTable) {
        if self.include_dependencies {
            // Reverse so the first dependency is visited first.
            let deps: Vec<TableId> = table.dependencies().collect();
            self.pending.extend(deps.into_iter().rev());
        }
        self.current = Some((table, 0));
    }

    fn next_table(&mut self) -> Option<&'a SymbolTable> {
        while let Some(id) = self.pending.pop() {
            if !self.visited.insert(id) {
                continue;
            }
            if let Some(table) = self.provider.table(id) {
                return Some(table);
            }
        }
        None
    }
}

impl<'a, P: TableProvider + ?Sized> Iterator for AllSymbols<'a, P> {
    type Item = (SymbolRef, &'a Symbol);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (table, idx) = self.current?;
            if let Some(id) = table.top_level.get(idx).copied() {
                self.current = Some((table, idx + 1));
                let symbol = table.symbol(id);
                if self.kind.map_or(true, |kind| symbol.kind() == kind) {
                    return Some((table.symbol_ref(id), symbol));
                }
                continue;
            }
            match self.next_table() {
                Some(next) => self.enter(next),
                None => {
                    self.current = None;
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpc_source::Range;

    struct Tables(Vec<SymbolTable>);

    impl TableProvider for Tables {
        fn table(&self, id: TableId) -> Option<&SymbolTable> {
            self.0.iter().find(|t| t.id() == id)
        }
    }

    fn data(name: &str, kind: SymbolKind) -> SymbolData {
        SymbolData::new(name, kind, Range::at(1, 0))
    }

    #[test]
    fn test_duplicate_policy() {
        let mut strict = SymbolTable::new(TableId(5), false);
        strict.add_symbol(None, data("write", SymbolKind::Efun)).unwrap();
        let err = strict
            .add_symbol(None, data("write", SymbolKind::Efun))
            .unwrap_err();
        assert!(matches!(err, SymbolError::DuplicateDeclaration { ref name, .. } if name == "write"));
        assert_eq!(strict.top_level().len(), 1);

        let mut lenient = SymbolTable::new(TableId(6), true);
        lenient.add_symbol(None, data("f", SymbolKind::MethodDeclaration)).unwrap();
        lenient.add_symbol(None, data("f", SymbolKind::Method)).unwrap();
        assert_eq!(lenient.lookup_local("f").len(), 2);
    }

    #[test]
    fn test_own_symbols_before_dependencies_in_order() {
        let mut a = SymbolTable::new(TableId(2), true);
        let mut b = SymbolTable::new(TableId(3), true);
        let mut c = SymbolTable::new(TableId(4), true);
        b.add_symbol(None, data("x", SymbolKind::Variable)).unwrap();
        c.add_symbol(None, data("x", SymbolKind::Variable)).unwrap();
        c.add_symbol(None, data("y", SymbolKind::Variable)).unwrap();
        a.add_dependency(TableId(3));
        a.add_dependency(TableId(4));
        assert!(!a.add_dependency(TableId(3)));

        let tables = Tables(vec![b, c]);
        assert_eq!(a.resolve(&tables, "x", false).map(|r| r.table), Some(TableId(3)));
        assert_eq!(a.resolve(&tables, "y", false).map(|r| r.table), Some(TableId(4)));
        assert_eq!(a.resolve(&tables, "y", true), None);

        a.add_symbol(None, data("x", SymbolKind::Variable)).unwrap();
        assert_eq!(a.resolve(&tables, "x", false).map(|r| r.table), Some(TableId(2)));
    }

    #[test]
    fn test_cyclic_dependencies_terminate() {
        let mut a = SymbolTable::new(TableId(2), true);
        let mut b = SymbolTable::new(TableId(3), true);
        a.add_dependency(TableId(3));
        b.add_dependency(TableId(2));
        b.add_symbol(None, data("only_b", SymbolKind::Method)).unwrap();
        let tables = Tables(vec![a.clone(), b]);

        assert!(a.resolve(&tables, "missing", false).is_none());
        assert!(a.resolve(&tables, "only_b", false).is_some());
        let all: Vec<_> = a.get_all_symbols(&tables, None, true).collect();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_innermost_scope_wins() {
        let mut t = SymbolTable::new(TableId(2), true);
        t.add_symbol(None, data("x", SymbolKind::Variable)).unwrap();
        let method = t
            .add_symbol(
                None,
                SymbolData::new(
                    "f",
                    SymbolKind::Method,
                    Range::new(Position::new(2, 0), Position::new(6, 1)),
                ),
            )
            .unwrap();
        let block = t
            .add_symbol(
                Some(method),
                SymbolData::new(
                    "",
                    SymbolKind::Block,
                    Range::new(Position::new(2, 9), Position::new(6, 1)),
                ),
            )
            .unwrap();
        let local = t.add_symbol(Some(block), data("x", SymbolKind::Variable)).unwrap();
        let tables = Tables(Vec::new());

        let scope = t.scope_at(Position::new(4, 2));
        assert_eq!(scope, Some(block));
        assert_eq!(t.resolve_in_scope(&tables, scope, "x").map(|r| r.symbol), Some(local));
        assert_eq!(t.resolve_in_scope(&tables, None, "x").map(|r| r.symbol), Some(SymbolId(0)));
    }

    #[test]
    fn test_get_all_symbols_is_restartable_and_filtered() {
        let mut a = SymbolTable::new(TableId(2), true);
        let mut b = SymbolTable::new(TableId(3), true);
        a.add_symbol(None, data("f", SymbolKind::Method)).unwrap();
        a.add_symbol(None, data("v", SymbolKind::Variable)).unwrap();
        b.add_symbol(None, data("g", SymbolKind::Method)).unwrap();
        a.add_dependency(TableId(3));
        let tables = Tables(vec![b]);

        let methods = a.get_all_symbols(&tables, Some(SymbolKind::Method), true);
        let first: Vec<&str> = methods.clone().map(|(_, s)| s.name.as_str()).collect();
        let second: Vec<&str> = methods.map(|(_, s)| s.name.as_str()).collect();
        assert_eq!(first, vec!["f", "g"]);
        assert_eq!(first, second);

        let own: Vec<&str> = a
            .get_all_symbols(&tables, None, false)
            .map(|(_, s)| s.name.as_str())
            .collect();
        assert_eq!(own, vec!["f", "v"]);
    }

    #[test]
    fn test_reference_counts() {
        let mut t = SymbolTable::new(TableId(2), true);
        t.record_reference("x");
        t.record_reference("x");
        assert_eq!(t.local_reference_count("x"), 2);
        assert_eq!(t.local_reference_count("y"), 0);
        t.clear();
        assert_eq!(t.local_reference_count("x"), 0);
    }
}
