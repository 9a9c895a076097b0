//! Register residency
//!
//! Tracks which variable's current value each colored register holds. A
//! resident value is newer than the variable's memory slot until it is
//! written back.

use crate::backend::ir::Variable;
use crate::backend::x86_64::regs::X86Reg;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct Residency {
    occupants: HashMap<X86Reg, Variable>,
}

impl Residency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self, reg: X86Reg, var: &Variable) -> bool {
        self.occupants.get(&reg) == Some(var)
    }

    pub fn occupant(&self, reg: X86Reg) -> Option<&Variable> {
        self.occupants.get(&reg)
    }

    /// Forget and return the occupant of `reg`
    pub fn evict(&mut self, reg: X86Reg) -> Option<Variable> {
        self.occupants.remove(&reg)
    }

    pub fn set(&mut self, reg: X86Reg, var: Variable) {
        self.occupants.insert(reg, var);
    }

    /// Empty the table, returning occupants in register order
    pub fn drain(&mut self) -> Vec<(X86Reg, Variable)> {
        let mut drained = Vec::with_capacity(self.occupants.len());
        for &reg in X86Reg::ALLOCATABLE {
            if let Some(var) = self.occupants.remove(&reg) {
                drained.push((reg, var));
            }
        }
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }
}
