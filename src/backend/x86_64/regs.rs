//! x86-64 Register Definitions
//!
//! This module defines the x86-64 register set following the System V AMD64 ABI,
//! split the way the code generator uses it: thirteen colorable registers, one
//! scratch register, and the two frame registers.

use std::fmt;

/// x86-64 General Purpose Registers (64-bit)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum X86Reg {
    // Caller-saved registers (volatile)
    Rax, // Return value, dividend
    Rcx, // 4th argument
    Rdx, // 3rd argument, remainder
    Rsi, // 2nd argument
    Rdi, // 1st argument
    R8,  // 5th argument
    R9,  // 6th argument
    R10, // Caller-saved
    R11, // Caller-saved

    // Callee-saved registers (non-volatile)
    Rbx,
    Rbp, // Frame pointer
    R12,
    R13,
    R14,
    R15, // Scratch

    // Special registers
    Rsp, // Stack pointer
}

impl X86Reg {
    /// Colorable registers; color `c` is `ALLOCATABLE[c]`
    ///
    /// Everything except RSP, RBP and the scratch register.
    pub const ALLOCATABLE: &'static [X86Reg] = &[
        X86Reg::Rax,
        X86Reg::Rbx,
        X86Reg::Rcx,
        X86Reg::Rdx,
        X86Reg::Rsi,
        X86Reg::Rdi,
        X86Reg::R8,
        X86Reg::R9,
        X86Reg::R10,
        X86Reg::R11,
        X86Reg::R12,
        X86Reg::R13,
        X86Reg::R14,
    ];

    /// Never colored; used for memory-to-memory moves, divisors and pointer
    /// dereferences
    pub const SCRATCH: X86Reg = X86Reg::R15;

    /// Callee-saved registers pushed by every prologue, in push order
    ///
    /// RBP is handled separately since it anchors the frame.
    pub const SAVED_IN_PROLOGUE: &'static [X86Reg] = &[
        X86Reg::Rbx,
        X86Reg::R12,
        X86Reg::R13,
        X86Reg::R14,
        X86Reg::R15,
    ];

    /// Argument registers (System V AMD64 ABI order)
    pub const ARG_REGS: &'static [X86Reg] = &[
        X86Reg::Rdi, // 1st argument
        X86Reg::Rsi, // 2nd argument
        X86Reg::Rdx, // 3rd argument
        X86Reg::Rcx, // 4th argument
        X86Reg::R8,  // 5th argument
        X86Reg::R9,  // 6th argument
    ];

    /// Return value register
    pub const RETURN_REG: X86Reg = X86Reg::Rax;

    /// Stack pointer
    pub const STACK_PTR: X86Reg = X86Reg::Rsp;

    /// Base pointer
    pub const BASE_PTR: X86Reg = X86Reg::Rbp;

    /// Register for a color index
    pub fn for_color(color: usize) -> Option<X86Reg> {
        Self::ALLOCATABLE.get(color).copied()
    }

    /// Name of the low byte, the target of `setCC`
    pub fn low_byte(self) -> &'static str {
        match self {
            X86Reg::Rax => "al",
            X86Reg::Rbx => "bl",
            X86Reg::Rcx => "cl",
            X86Reg::Rdx => "dl",
            X86Reg::Rsi => "sil",
            X86Reg::Rdi => "dil",
            X86Reg::Rsp => "spl",
            X86Reg::Rbp => "bpl",
            X86Reg::R8 => "r8b",
            X86Reg::R9 => "r9b",
            X86Reg::R10 => "r10b",
            X86Reg::R11 => "r11b",
            X86Reg::R12 => "r12b",
            X86Reg::R13 => "r13b",
            X86Reg::R14 => "r14b",
            X86Reg::R15 => "r15b",
        }
    }
}

impl fmt::Display for X86Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            X86Reg::Rax => "rax",
            X86Reg::Rbx => "rbx",
            X86Reg::Rcx => "rcx",
            X86Reg::Rdx => "rdx",
            X86Reg::Rsi => "rsi",
            X86Reg::Rdi => "rdi",
            X86Reg::Rsp => "rsp",
            X86Reg::Rbp => "rbp",
            X86Reg::R8 => "r8",
            X86Reg::R9 => "r9",
            X86Reg::R10 => "r10",
            X86Reg::R11 => "r11",
            X86Reg::R12 => "r12",
            X86Reg::R13 => "r13",
            X86Reg::R14 => "r14",
            X86Reg::R15 => "r15",
        };
        write!(f, "%{}", name)
    }
}
