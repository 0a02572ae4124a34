//! Explicit frames for evaluation.
//!
//! The stack belongs to whoever drives evaluation and is passed down by
//! reference. [`CallStack::enter`] hands back a guard that pops the frame
//! when dropped, so a frame never outlives the evaluation that pushed it.

use std::ops::{Deref, DerefMut};

use fxhash::FxHashMap;
use lpc_symbols::{SymbolId, TableId};

use super::Value;
use crate::unit::UnitId;

#[derive(Debug, Clone)]
pub struct StackFrame {
    pub unit: UnitId,
    pub table: TableId,
    /// Function or block symbol the frame evaluates; `None` for a unit's
    /// root frame.
    pub scope: Option<SymbolId>,
    pub params: FxHashMap<String, Value>,
    pub locals: FxHashMap<String, Value>,
    /// Index of the enclosing frame on the stack.
    pub parent: Option<usize>,
}

impl StackFrame {
    pub fn root(unit: UnitId) -> Self {
        Self {
            unit,
            table: unit.table_id(),
            scope: None,
            params: FxHashMap::default(),
            locals: FxHashMap::default(),
            parent: None,
        }
    }

    pub fn child(unit: UnitId, scope: SymbolId, parent: usize) -> Self {
        Self {
            scope: Some(scope),
            parent: Some(parent),
            ..Self::root(unit)
        }
    }
}

#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<StackFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index the next pushed frame will get.
    pub fn next_index(&self) -> usize {
        self.frames.len()
    }

    pub fn enter(&mut self, frame: StackFrame) -> FrameGuard<'_> {
        self.frames.push(frame);
        FrameGuard { stack: self }
    }

    pub fn top(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    /// Look a name up in the top frame and its parents, locals before params.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut index = self.frames.len().checked_sub(1);
        while let Some(i) = index {
            let frame = &self.frames[i];
            if let Some(value) = frame.locals.get(name).or_else(|| frame.params.get(name)) {
                return Some(value);
            }
            index = frame.parent;
        }
        None
    }

    /// Overwrite a bound name in the nearest frame that has it.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        let mut index = self.frames.len().checked_sub(1);
        while let Some(i) = index {
            let frame = &mut self.frames[i];
            if let Some(slot) = frame.locals.get_mut(name).or_else(|| frame.params.get_mut(name)) {
                *slot = value;
                return true;
            }
            index = frame.parent;
        }
        false
    }

    /// Bind a local in the top frame.
    pub fn declare(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.insert(name.to_string(), value);
        }
    }
}

/// Pops its frame on drop.
pub struct FrameGuard<'a> {
    stack: &'a mut CallStack,
}

impl Deref for FrameGuard<'_> {
    type Target = CallStack;

    fn deref(&self) -> &CallStack {
        self.stack
    }
}

impl DerefMut for FrameGuard<'_> {
    fn deref_mut(&mut self) -> &mut CallStack {
        self.stack
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.stack.frames.pop();
    }
}
