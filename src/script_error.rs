use thiserror::Error;

/// Things that can go wrong while turning bytes into a script number.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum ScriptNumError {
    #[error("non-minimal encoding of script number")]
    NonMinimalEncoding,

    #[error("script number overflow: max: {max_num_size}, actual: {actual}")]
    Overflow { max_num_size: usize, actual: usize },
}

/// The closed set of reasons an evaluation attempt can fail.
///
/// Exactly one value is produced per attempt. These are diagnostics: a failed
/// script simply makes the spending transaction invalid, the specific reason
/// never alters subsequent protocol behavior.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
#[repr(i32)]
pub enum ScriptError {
    #[error("Ok")]
    Ok = 0,

    #[error("unknown error")]
    UnknownError,

    #[error("script evaluation failed")]
    EvalFalse,

    #[error("OP_RETURN encountered")]
    OpReturn,

    // Max sizes
    #[error("script size exceeded maximum")]
    ScriptSize,

    #[error("push size exceeded maximum")]
    PushSize,

    #[error("operation count exceeded maximum")]
    OpCount,

    #[error("stack size exceeded maximum")]
    StackSize,

    #[error("signature count exceeded maximum")]
    SigCount,

    #[error("public key count exceeded maximum")]
    PubKeyCount,

    // Failed verify operations
    #[error("verify operation failed")]
    Verify,

    #[error("equal verify operation failed")]
    EqualVerify,

    #[error("check multisig verify operation failed")]
    CheckMultisigVerify,

    #[error("check sig verify operation failed")]
    CheckSigVerify,

    #[error("num equal verify operation failed")]
    NumEqualVerify,

    // Logical/Format/Canonical errors
    #[error("bad opcode encountered")]
    BadOpcode,

    #[error("disabled opcode encountered")]
    DisabledOpcode,

    #[error("invalid stack operation encountered")]
    InvalidStackOperation,

    #[error("invalid altstack operation encountered")]
    InvalidAltstackOperation,

    #[error("unbalanced conditional encountered")]
    UnbalancedConditional,

    // Byte-string and arithmetic operand errors
    #[error("division by zero")]
    DivByZero,

    #[error("modulo by zero")]
    ModByZero,

    #[error("number outside the valid range")]
    InvalidNumberRange,

    #[error("number cannot be represented in the requested size")]
    ImpossibleEncoding,

    #[error("split position outside the operand")]
    InvalidSplitRange,

    #[error("bitwise operands differ in size")]
    InvalidOperandSize,

    // OP_CHECKLOCKTIMEVERIFY / OP_CHECKSEQUENCEVERIFY
    #[error("negative lock time encountered")]
    NegativeLockTime,

    #[error("unsatisfied locktime condition")]
    UnsatisfiedLockTime,

    // BIP62 and fork-era rules
    #[error("signature hash type error")]
    SigHashType,

    #[error("illegal use of the fork-id signature hash bit")]
    IllegalForkId,

    #[error("signature DER encoding error")]
    SigDER,

    #[error("minimal data requirement not met")]
    MinimalData,

    #[error("minimal conditional argument requirement not met")]
    MinimalIf,

    #[error("signature push only requirement not met")]
    SigPushOnly,

    #[error("signature s value is too high")]
    SigHighS,

    #[error("signature null dummy error")]
    SigNullDummy,

    #[error("failed signature was not the empty push")]
    SigNullFail,

    #[error("public key type error")]
    PubKeyType,

    #[error("clean stack requirement not met")]
    CleanStack,

    // softfork safeness
    #[error("discouraged upgradable NOPs encountered")]
    DiscourageUpgradableNOPs,

    #[error(
        "read error: expected {expected_bytes} bytes, but only {available_bytes} bytes available"
    )]
    ReadError {
        expected_bytes: usize,
        available_bytes: usize,
    },

    /// A stack element exceeded the script number operand bound.
    #[error("script number overflow")]
    ScriptNumOverflow,

    /// A stack element was not the minimal script number encoding while
    /// minimal encoding was being enforced.
    #[error("script number minimal-encoding error")]
    ScriptNumMinencode,
}

impl From<ScriptNumError> for ScriptError {
    fn from(value: ScriptNumError) -> Self {
        match value {
            ScriptNumError::Overflow { .. } => ScriptError::ScriptNumOverflow,
            ScriptNumError::NonMinimalEncoding => ScriptError::ScriptNumMinencode,
        }
    }
}
