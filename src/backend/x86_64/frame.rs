//! Stack Frame Layout
//!
//! A frame is an ordered list of 8-byte slots, highest address first:
//!
//! ```text
//!   stack args (last param first)    16(%rbp), 24(%rbp), ...
//!   return address                    8(%rbp)
//!   saved %rbp                        0(%rbp)
//!   saved rbx r12 r13 r14 r15        -8 .. -40(%rbp)
//!   register args                    -48(%rbp), ...
//!   locals
//!   padding (when needed)
//! ```
//!
//! The saved registers never appear as slots; they only shift every slot
//! below the return address by 40 bytes.

use crate::backend::ir::Variable;
use crate::backend::x86_64::regs::X86Reg;

/// Bytes pushed between `%rbp` and the first slot: the callee-saved block
const SAVED_BYTES: i32 = 8 * X86Reg::SAVED_IN_PROLOGUE.len() as i32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Parameter beyond the sixth, pushed by the caller
    StackArg(Variable),
    /// Marks the position of the return address
    ReturnAddress,
    /// Parameter received in a register, copied here by the prologue
    RegisterArg(Variable),
    Local(Variable),
    /// Keeps `%rsp` 16-byte aligned
    Padding,
}

impl Slot {
    fn variable(&self) -> Option<&Variable> {
        match self {
            Slot::StackArg(var) | Slot::RegisterArg(var) | Slot::Local(var) => Some(var),
            Slot::ReturnAddress | Slot::Padding => None,
        }
    }
}

/// Frame of one function
#[derive(Clone, Debug)]
pub struct Frame {
    pub function: String,
    slots: Vec<Slot>,
    /// Index of the return address marker in `slots`
    return_address: usize,
}

impl Frame {
    /// Lay out a frame for `params` (declaration order) and `locals`
    pub fn build(function: impl Into<String>, params: &[Variable], locals: Vec<Variable>) -> Self {
        let in_registers = params.len().min(X86Reg::ARG_REGS.len());

        let mut slots: Vec<Slot> = params[in_registers..]
            .iter()
            .rev()
            .cloned()
            .map(Slot::StackArg)
            .collect();

        let return_address = slots.len();
        slots.push(Slot::ReturnAddress);
        slots.extend(params[..in_registers].iter().cloned().map(Slot::RegisterArg));
        slots.extend(locals.into_iter().map(Slot::Local));

        // Entry leaves %rsp at 8 mod 16; pushing %rbp and the five saved
        // registers flips it to 0, so an odd slot count needs one more.
        if (slots.len() - return_address - 1) % 2 == 0 {
            slots.push(Slot::Padding);
        }

        Self {
            function: function.into(),
            slots,
            return_address,
        }
    }

    /// `%rbp`-relative offset of `var`'s slot
    pub fn offset(&self, var: &Variable) -> Option<i32> {
        let index = self.slots.iter().position(|s| s.variable() == Some(var))?;
        Some(self.offset_of(index))
    }

    fn offset_of(&self, index: usize) -> i32 {
        if index < self.return_address {
            let distance = (self.return_address - index) as i32;
            16 + 8 * (distance - 1)
        } else {
            let distance = (index - self.return_address) as i32;
            -(SAVED_BYTES + 8 * distance)
        }
    }

    /// Slots the prologue allocates with `subq`
    pub fn allocated_slots(&self) -> usize {
        self.slots.len() - self.return_address - 1
    }

    /// Bytes the prologue subtracts from `%rsp`
    pub fn allocated_bytes(&self) -> i64 {
        8 * self.allocated_slots() as i64
    }

    /// Register parameters with their incoming registers
    pub fn register_args(&self) -> impl Iterator<Item = (X86Reg, &Variable)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::RegisterArg(var) => Some(var),
                _ => None,
            })
            .zip(X86Reg::ARG_REGS.iter())
            .map(|(var, &reg)| (reg, var))
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}
