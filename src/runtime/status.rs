use serde::{Deserialize, Serialize};

/// Interpreter status after any number of dispatch steps.
///
/// Everything except `Running` is terminal: once set, `step` makes no
/// further progress and the poll loop is expected to stop and surface the
/// status to the operator. `Halted` is the deliberate end of a program;
/// the rest are faults.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmStatus {
    Running,
    Halted,

    StackOverflow,
    StackUnderflow,
    /// A pop tried to cross into the current frame's reserved header slots.
    OperandStackUnderflow,

    ReadInvalidConst,
    ReadInvalidGlobal,
    WriteInvalidGlobal,
    ReadInvalidLocal,
    WriteInvalidLocal,

    /// An instruction fetch or operand read ran past the program region.
    ReadInvalidProgram,
    /// A jump or call target at or past the end of the program region.
    ProgramOverstep,
    InvalidOperator,
    /// Integer division or modulo by zero. The original hardware faulted
    /// here; this VM reports it like any other terminal fault.
    DivideByZero,
}

impl VmStatus {
    pub fn is_running(self) -> bool {
        self == VmStatus::Running
    }

    /// Terminal and not a deliberate halt.
    pub fn is_fault(self) -> bool {
        !matches!(self, VmStatus::Running | VmStatus::Halted)
    }
}

impl std::fmt::Display for VmStatus {
    /// Operator-facing rendering; the firmware shows these on the
    /// diagnostic display.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VmStatus::Running => "RUNNING",
            VmStatus::Halted => "HALT",
            VmStatus::StackOverflow => "STACK OVERFLOW",
            VmStatus::StackUnderflow => "STACK UNDERFLOW",
            VmStatus::OperandStackUnderflow => "OPERAND STACK UNDERFLOW",
            VmStatus::ReadInvalidConst => "READ INVALID CONSTANT",
            VmStatus::ReadInvalidGlobal => "READ INVALID GLOBAL VARIABLE",
            VmStatus::WriteInvalidGlobal => "WRITE INVALID GLOBAL VARIABLE",
            VmStatus::ReadInvalidLocal => "READ INVALID LOCAL VARIABLE",
            VmStatus::WriteInvalidLocal => "WRITE INVALID LOCAL VARIABLE",
            VmStatus::ReadInvalidProgram => "READ INVALID PROGRAM",
            VmStatus::ProgramOverstep => "PROGRAM OVERSTEP",
            VmStatus::InvalidOperator => "INVALID OPERATOR",
            VmStatus::DivideByZero => "DIVIDE BY ZERO",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(VmStatus::Running.is_running());
        assert!(!VmStatus::Running.is_fault());
        assert!(!VmStatus::Halted.is_running());
        assert!(!VmStatus::Halted.is_fault());
        assert!(VmStatus::StackOverflow.is_fault());
        assert!(VmStatus::DivideByZero.is_fault());
    }

    #[test]
    fn test_display() {
        assert_eq!(VmStatus::Halted.to_string(), "HALT");
        assert_eq!(
            VmStatus::OperandStackUnderflow.to_string(),
            "OPERAND STACK UNDERFLOW"
        );
    }
}
