//! Symbols and the identifiers that address them.

use lpc_source::Range;
use lpc_syntax::NodeId;

/// Identifies a symbol table. The two builtin tables have fixed ids; every
/// source unit's table gets its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Predefined macros, configured defines and simul-efuns.
    pub const GLOBAL: TableId = TableId(0);
    /// Driver efun prototypes.
    pub const EFUNS: TableId = TableId(1);

    pub fn is_builtin(self) -> bool {
        self == Self::GLOBAL || self == Self::EFUNS
    }
}

/// Index of a symbol inside its table's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A symbol together with the table that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    pub table: TableId,
    pub symbol: SymbolId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Keyword,
    Include,
    Inherit,
    /// Function with a body.
    Method,
    /// Prototype without a body.
    MethodDeclaration,
    InlineClosure,
    Variable,
    Parameter,
    Literal,
    Operator,
    Efun,
    Struct,
    StructMember,
    Block,
    Define,
}

impl SymbolKind {
    /// Kinds whose children form a nested scope.
    pub fn is_scope(self) -> bool {
        matches!(
            self,
            SymbolKind::Method
                | SymbolKind::MethodDeclaration
                | SymbolKind::InlineClosure
                | SymbolKind::Block
                | SymbolKind::Struct
                | SymbolKind::Define
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::MethodDeclaration | SymbolKind::Efun
        )
    }

    pub fn is_value(self) -> bool {
        matches!(
            self,
            SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::Define
        )
    }
}

/// Everything needed to insert a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolData {
    pub name: String,
    pub kind: SymbolKind,
    pub type_name: Option<String>,
    pub range: Range,
    pub name_range: Range,
    /// Replacement text of a define, raw path of an include or inherit.
    pub value: Option<String>,
    pub modifiers: Vec<String>,
    pub node: Option<NodeId>,
}

impl SymbolData {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: Range) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: None,
            range,
            name_range: range,
            value: None,
            modifiers: Vec::new(),
            node: None,
        }
    }

    pub fn with_type(mut self, type_name: Option<String>) -> Self {
        self.type_name = type_name;
        self
    }

    pub fn with_name_range(mut self, range: Range) -> Self {
        self.name_range = range;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: Vec<String>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    kind: SymbolKind,
    pub type_name: Option<String>,
    pub range: Range,
    pub name_range: Range,
    pub value: Option<String>,
    pub modifiers: Vec<String>,
    /// Tree node the symbol was collected from.
    pub node: Option<NodeId>,
    pub parent: Option<SymbolId>,
    pub children: Vec<SymbolId>,
}

impl Symbol {
    pub(crate) fn from_data(data: SymbolData, parent: Option<SymbolId>) -> Self {
        Self {
            name: data.name,
            kind: data.kind,
            type_name: data.type_name,
            range: data.range,
            name_range: data.name_range,
            value: data.value,
            modifiers: data.modifiers,
            node: data.node,
            parent,
            children: Vec::new(),
        }
    }

    /// Kind is fixed when the symbol is inserted.
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// Whether the declared type names a struct or class, e.g. `struct point`.
    pub fn struct_type(&self) -> Option<&str> {
        let ty = self.type_name.as_deref()?;
        let rest = ty
            .strip_prefix("struct ")
            .or_else(|| ty.strip_prefix("class "))?;
        if rest.contains('*') {
            None
        } else {
            Some(rest.trim())
        }
    }
}
