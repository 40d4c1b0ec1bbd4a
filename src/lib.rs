//! An execution engine for Bitcoin-SV-family transaction scripts.
//!
//! Scripts are byte strings mixing data pushes with operations over a
//! bounded stack of byte-string elements. [`verify_script`] runs the
//! two-script spend protocol: the unlocking script seeds the stack, the
//! locking script consumes it, and the spend is authorized when a truthy
//! element remains. Signature checking is abstracted behind
//! [`SignatureChecker`] so the engine stays independent of transaction
//! formats and curve arithmetic.

#![deny(unsafe_code)]

#[macro_use]
extern crate enum_primitive;

pub mod consensus;
pub mod interpreter;
pub mod num;
pub mod opcode;
pub mod operand;
pub mod script;
pub mod script_error;
pub mod stack;

#[cfg(test)]
mod test_vectors;

pub use consensus::{ConsensusParams, Network};
pub use interpreter::{
    eval_script, eval_step, verify_script, BaseSignatureChecker, SignatureChecker, State,
    VerificationFlags,
};
pub use operand::Operand;
pub use script::Script;
pub use script_error::{ScriptError, ScriptNumError};
pub use stack::Stack;
