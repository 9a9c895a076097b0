//! x86-64 Instruction Definitions
//!
//! This module defines the slice of the x86-64 instruction set the code
//! generator emits, rendered in AT&T syntax (`op src, dst`, `q` suffixes,
//! `%` registers, `$` immediates).

use super::regs::X86Reg;
use std::fmt;

/// Condition codes for `setCC` and `jCC` (signed only)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Equal (ZF=1)
    E,
    /// Not Equal (ZF=0)
    Ne,
    /// Less Than (SF!=OF)
    L,
    /// Less or Equal (ZF=1 or SF!=OF)
    Le,
    /// Greater Than (ZF=0 and SF=OF)
    G,
    /// Greater or Equal (SF=OF)
    Ge,
}

impl Condition {
    /// The condition that holds after swapping the `cmp` operands
    ///
    /// `a < b` is `b > a`: order relations flip, equality is symmetric.
    pub fn mirror(self) -> Condition {
        match self {
            Condition::E => Condition::E,
            Condition::Ne => Condition::Ne,
            Condition::L => Condition::G,
            Condition::Le => Condition::Ge,
            Condition::G => Condition::L,
            Condition::Ge => Condition::Le,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Condition::E => "e",
            Condition::Ne => "ne",
            Condition::L => "l",
            Condition::Le => "le",
            Condition::G => "g",
            Condition::Ge => "ge",
        };
        write!(f, "{}", name)
    }
}

/// Memory operand
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemOperand {
    /// Frame slot, `disp(%rbp)`
    Frame(i32),
    /// Static data, `sym(%rip)`
    Static(String),
    /// Through a pointer held in a register, `(%reg)`
    Indirect(X86Reg),
}

impl fmt::Display for MemOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemOperand::Frame(disp) => write!(f, "{}({})", disp, X86Reg::BASE_PTR),
            MemOperand::Static(sym) => write!(f, "{}(%rip)", sym),
            MemOperand::Indirect(reg) => write!(f, "({})", reg),
        }
    }
}

/// Instruction operand
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(X86Reg),
    Imm(i64),
    Mem(MemOperand),
}

impl Operand {
    pub fn as_reg(&self) -> Option<X86Reg> {
        match self {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        }
    }

    pub fn is_reg(&self, reg: X86Reg) -> bool {
        self.as_reg() == Some(reg)
    }

    /// Encodable as a sign-extended 32-bit immediate
    ///
    /// Only `movq $imm, %reg` takes a full 64-bit immediate.
    pub fn fits_imm32(&self) -> bool {
        match self {
            Operand::Imm(v) => i32::try_from(*v).is_ok(),
            _ => false,
        }
    }
}

impl From<X86Reg> for Operand {
    fn from(reg: X86Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl From<MemOperand> for Operand {
    fn from(mem: MemOperand) -> Self {
        Operand::Mem(mem)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Imm(v) => write!(f, "${}", v),
            Operand::Mem(mem) => write!(f, "{}", mem),
        }
    }
}

/// Two-operand integer ALU operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Imul,
    And,
    Or,
    Xor,
}

impl fmt::Display for AluOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AluOp::Add => "addq",
            AluOp::Sub => "subq",
            AluOp::Imul => "imulq",
            AluOp::And => "andq",
            AluOp::Or => "orq",
            AluOp::Xor => "xorq",
        };
        write!(f, "{}", name)
    }
}

/// x86-64 Instructions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum X86Instr {
    // === Data Movement ===
    /// movq src, dst
    Mov { src: Operand, dst: Operand },
    /// movzbq %src8, %dst
    Movzbq { src: X86Reg, dst: X86Reg },
    /// leaq mem, %dst
    Lea { src: MemOperand, dst: X86Reg },

    // === Arithmetic ===
    /// addq/subq/imulq/andq/orq/xorq src, dst
    Alu { op: AluOp, src: Operand, dst: Operand },
    /// negq dst
    Neg { dst: Operand },
    /// notq dst
    Not { dst: Operand },
    /// Sign-extend %rax into %rdx:%rax
    Cqto,
    /// idivq src
    Idiv { src: Operand },

    // === Comparison ===
    /// cmpq src, dst (flags from dst - src)
    Cmp { src: Operand, dst: Operand },
    /// testq src, dst
    Test { src: Operand, dst: Operand },
    /// setCC %dst8
    Set { cond: Condition, dst: X86Reg },

    // === Control Flow ===
    /// jmp label (unconditional)
    Jmp { target: String },
    /// jcc label (conditional)
    Jcc { cond: Condition, target: String },
    /// call label
    Call { target: String },
    /// ret
    Ret,

    // === Stack ===
    /// pushq src
    Push { src: Operand },
    /// popq dst
    Pop { dst: Operand },

    // === Pseudo-instructions ===
    /// Label definition
    Label { name: String },
    /// Assembler directive such as `.text`
    Directive { text: String },
    /// Comment (for debugging output)
    Comment { text: String },
}

impl X86Instr {
    pub fn mov(src: impl Into<Operand>, dst: impl Into<Operand>) -> Self {
        X86Instr::Mov {
            src: src.into(),
            dst: dst.into(),
        }
    }

    pub fn alu(op: AluOp, src: impl Into<Operand>, dst: impl Into<Operand>) -> Self {
        X86Instr::Alu {
            op,
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Labels, directives and comments start in column zero
    pub fn is_flush_left(&self) -> bool {
        matches!(
            self,
            X86Instr::Label { .. } | X86Instr::Directive { .. } | X86Instr::Comment { .. }
        )
    }
}

impl fmt::Display for X86Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X86Instr::Mov { src, dst } => write!(f, "movq {}, {}", src, dst),
            X86Instr::Movzbq { src, dst } => write!(f, "movzbq %{}, {}", src.low_byte(), dst),
            X86Instr::Lea { src, dst } => write!(f, "leaq {}, {}", src, dst),

            X86Instr::Alu { op, src, dst } => write!(f, "{} {}, {}", op, src, dst),
            X86Instr::Neg { dst } => write!(f, "negq {}", dst),
            X86Instr::Not { dst } => write!(f, "notq {}", dst),
            X86Instr::Cqto => write!(f, "cqto"),
            X86Instr::Idiv { src } => write!(f, "idivq {}", src),

            X86Instr::Cmp { src, dst } => write!(f, "cmpq {}, {}", src, dst),
            X86Instr::Test { src, dst } => write!(f, "testq {}, {}", src, dst),
            X86Instr::Set { cond, dst } => write!(f, "set{} %{}", cond, dst.low_byte()),

            X86Instr::Jmp { target } => write!(f, "jmp {}", target),
            X86Instr::Jcc { cond, target } => write!(f, "j{} {}", cond, target),
            X86Instr::Call { target } => write!(f, "call {}", target),
            X86Instr::Ret => write!(f, "ret"),

            X86Instr::Push { src } => write!(f, "pushq {}", src),
            X86Instr::Pop { dst } => write!(f, "popq {}", dst),

            X86Instr::Label { name } => write!(f, "{}:", name),
            X86Instr::Directive { text } => write!(f, "{}", text),
            X86Instr::Comment { text } => write!(f, "# {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_display() {
        let instr = X86Instr::mov(X86Reg::Rbx, X86Reg::Rax);
        assert_eq!(format!("{}", instr), "movq %rbx, %rax");

        let instr = X86Instr::alu(AluOp::Sub, Operand::Imm(8), X86Reg::Rsp);
        assert_eq!(format!("{}", instr), "subq $8, %rsp");

        let instr = X86Instr::Set {
            cond: Condition::Le,
            dst: X86Reg::R9,
        };
        assert_eq!(format!("{}", instr), "setle %r9b");

        let instr = X86Instr::Movzbq {
            src: X86Reg::Rdi,
            dst: X86Reg::Rdi,
        };
        assert_eq!(format!("{}", instr), "movzbq %dil, %rdi");
    }

    #[test]
    fn test_mem_operand_display() {
        assert_eq!(MemOperand::Frame(-48).to_string(), "-48(%rbp)");
        assert_eq!(MemOperand::Frame(16).to_string(), "16(%rbp)");
        assert_eq!(MemOperand::Static("x.g".into()).to_string(), "x.g(%rip)");
        assert_eq!(MemOperand::Indirect(X86Reg::R15).to_string(), "(%r15)");
    }

    #[test]
    fn test_condition_mirror() {
        assert_eq!(Condition::L.mirror(), Condition::G);
        assert_eq!(Condition::Ge.mirror(), Condition::Le);
        assert_eq!(Condition::E.mirror(), Condition::E);
        assert_eq!(Condition::Ne.mirror(), Condition::Ne);
    }

    #[test]
    fn test_imm32_range() {
        assert!(Operand::Imm(i32::MAX as i64).fits_imm32());
        assert!(Operand::Imm(i32::MIN as i64).fits_imm32());
        assert!(!Operand::Imm(1 << 40).fits_imm32());
        assert!(!Operand::Reg(X86Reg::Rax).fits_imm32());
    }
}
