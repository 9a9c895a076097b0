//! Instruction store
//!
//! The whole program lives in one ordered list. Instructions are addressed by
//! stable [`InstrId`] handles; removal leaves a tombstone so handles held by a
//! pass stay valid while it rewrites the list. [`IrProgram::compact`] drops the
//! tombstones once mutation is over.

use crate::backend::ir::instr::Instr;
use crate::backend::ir::types::Variable;
use std::fmt;

/// Stable handle to an instruction slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(pub usize);

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-function facts the code generator cannot recover from the list alone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<Variable>,
}

/// The program as a flat instruction list, globals first
#[derive(Clone, Debug, Default)]
pub struct IrProgram {
    slots: Vec<Option<Instr>>,
    live: usize,
    pub functions: Vec<FunctionInfo>,
}

impl IrProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction
    pub fn push(&mut self, instr: Instr) -> InstrId {
        self.slots.push(Some(instr));
        self.live += 1;
        InstrId(self.slots.len() - 1)
    }

    pub fn get(&self, id: InstrId) -> Option<&Instr> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut Instr> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Tombstone an instruction, returning it
    pub fn remove(&mut self, id: InstrId) -> Option<Instr> {
        let removed = self.slots.get_mut(id.0).and_then(|slot| slot.take());
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    /// Handles of all live instructions, in program order
    pub fn live_ids(&self) -> Vec<InstrId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| InstrId(i))
            .collect()
    }

    /// Live instructions in program order
    pub fn iter(&self) -> impl Iterator<Item = &Instr> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Number of live instructions
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Drop tombstones, producing the dense list the analyzer works on
    pub fn compact(&self) -> Vec<Instr> {
        self.iter().cloned().collect()
    }

    /// Render every live instruction, one per line
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for instr in self.iter() {
            out.push_str(&instr.to_string());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dump())
    }
}
