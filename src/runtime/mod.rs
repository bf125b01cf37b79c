pub mod dispatch;
pub mod stack;
pub mod status;
pub mod vm;

pub use status::VmStatus;
pub use vm::{Vm, VmConfig};
