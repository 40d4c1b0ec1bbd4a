//! Script evaluation.

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::consensus::{ConsensusParams, MAX_STACK_DEPTH};
use crate::num::{minimally_encode, parse_num, serialize_num, DEFAULT_MAX_NUM_SIZE};
use crate::opcode::{Opcode, Operation, PushValue};
use crate::operand::Operand;
use crate::script::Script;
use crate::script_error::ScriptError;
use crate::stack::Stack;

bitflags::bitflags! {
    /// Policy switches layered on top of the base consensus rules. Empty
    /// flags give the most permissive evaluation.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct VerificationFlags: u32 {
        /// Recognize pay-to-script-hash outputs (accepted for vector
        /// compatibility; redemption itself is out of scope here).
        const P2SH = 1 << 0;

        /// Require strict signature hash-type bytes and canonical public
        /// keys wherever a signature or key is consumed.
        const StrictEnc = 1 << 1;

        /// Require strict DER encoding for signatures (BIP 66).
        const DerSig = 1 << 2;

        /// Require the S value of every signature to be at most half the
        /// curve order. Implies DER validity.
        const LowS = 1 << 3;

        /// Require the extra CHECKMULTISIG stack element to be empty.
        const NullDummy = 1 << 4;

        /// Require the unlocking script to contain only pushes.
        const SigPushOnly = 1 << 5;

        /// Require all pushes and consumed numbers to use their minimal
        /// encoding.
        const MinimalData = 1 << 6;

        /// Fail on NOP1-NOP10 that have no assigned meaning under the
        /// current flags.
        const DiscourageUpgradableNOPs = 1 << 7;

        /// Require exactly one element to remain after a successful verify.
        const CleanStack = 1 << 8;

        /// Give OP_NOP2 its locktime meaning.
        const CheckLockTimeVerify = 1 << 9;

        /// Give OP_NOP3 its sequence meaning.
        const CheckSequenceVerify = 1 << 10;

        /// Require OP_IF/OP_NOTIF operands to be exactly `[]` or `[0x01]`.
        const MinimalIf = 1 << 11;

        /// Require failed signature checks to have consumed empty
        /// signatures.
        const NullFail = 1 << 12;

        /// Require the fork-id bit in every signature hash type. Verifying
        /// with this flag also switches on `StrictEnc`.
        const SigHashForkId = 1 << 13;
    }
}

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown verification flag `{0}`")]
pub struct UnknownFlag(pub String);

const FLAG_NAMES: [(&str, VerificationFlags); 14] = [
    ("P2SH", VerificationFlags::P2SH),
    ("STRICTENC", VerificationFlags::StrictEnc),
    ("DERSIG", VerificationFlags::DerSig),
    ("LOW_S", VerificationFlags::LowS),
    ("NULLDUMMY", VerificationFlags::NullDummy),
    ("SIGPUSHONLY", VerificationFlags::SigPushOnly),
    ("MINIMALDATA", VerificationFlags::MinimalData),
    (
        "DISCOURAGE_UPGRADABLE_NOPS",
        VerificationFlags::DiscourageUpgradableNOPs,
    ),
    ("CLEANSTACK", VerificationFlags::CleanStack),
    ("CHECKLOCKTIMEVERIFY", VerificationFlags::CheckLockTimeVerify),
    ("CHECKSEQUENCEVERIFY", VerificationFlags::CheckSequenceVerify),
    ("MINIMALIF", VerificationFlags::MinimalIf),
    ("NULLFAIL", VerificationFlags::NullFail),
    ("SIGHASH_FORKID", VerificationFlags::SigHashForkId),
];

impl VerificationFlags {
    /// Parse a comma-separated flag list in the test-vector spelling, e.g.
    /// `"STRICTENC,MINIMALDATA"`. Tokens match case-insensitively as
    /// substrings, so prefixed spellings like `SCRIPT_VERIFY_P2SH` resolve
    /// too. `""` and `"NONE"` give the empty set.
    pub fn from_names(names: &str) -> Result<Self, UnknownFlag> {
        let mut flags = VerificationFlags::empty();
        for token in names.split(',') {
            let token = token.trim().to_uppercase();
            if token.is_empty() || token == "NONE" {
                continue;
            }
            let mut matched = false;
            for (name, flag) in &FLAG_NAMES {
                if name.contains(&token) || token.contains(name) {
                    flags |= *flag;
                    matched = true;
                }
            }
            if !matched {
                return Err(UnknownFlag(token));
            }
        }
        Ok(flags)
    }
}

/// The environment a signature check runs in. The evaluator itself never
/// interprets signatures; it hands them to this capability along with the
/// script code being signed.
pub trait SignatureChecker {
    /// Verify `sig` (with its trailing hash-type byte) over `script_code`
    /// against `pub_key`.
    fn check_sig(&self, sig: &[u8], pub_key: &[u8], script_code: &Script) -> bool {
        let _ = (sig, pub_key, script_code);
        false
    }

    /// Whether the transaction's lock time satisfies the given
    /// CHECKLOCKTIMEVERIFY operand.
    fn check_lock_time(&self, lock_time: i64) -> bool {
        let _ = lock_time;
        false
    }

    /// Whether the input's sequence satisfies the given CHECKSEQUENCEVERIFY
    /// operand.
    fn check_sequence(&self, sequence: i64) -> bool {
        let _ = sequence;
        false
    }
}

/// A checker with no transaction context. Every check fails, which is the
/// correct behavior when evaluating scripts outside a spend.
pub struct BaseSignatureChecker();

impl SignatureChecker for BaseSignatureChecker {}

/// Everything that persists across evaluation steps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    stack: Stack<Vec<u8>>,
    altstack: Stack<Vec<u8>>,
    /// Executed non-push operation count, bounded by consensus.
    op_count: u32,
    /// One entry per open conditional; execution is live only while all are
    /// true.
    vexec: Stack<bool>,
    /// Offset of the byte after the last executed OP_CODESEPARATOR.
    code_sep: usize,
}

impl State {
    pub fn initial(stack: Stack<Vec<u8>>) -> Self {
        State {
            stack,
            altstack: Stack::new(),
            op_count: 0,
            vexec: Stack::new(),
            code_sep: 0,
        }
    }

    pub fn stack(&self) -> &Stack<Vec<u8>> {
        &self.stack
    }

    pub fn altstack(&self) -> &Stack<Vec<u8>> {
        &self.altstack
    }

    pub fn op_count(&self) -> u32 {
        self.op_count
    }

    /// Whether the current step is inside a taken branch.
    pub fn executing(&self) -> bool {
        self.vexec.iter().all(|b| *b)
    }
}

/// The truthiness of a stack element: false is any length of zero bytes,
/// optionally with a negative-zero sign byte at the end.
pub fn cast_to_bool(vch: &[u8]) -> bool {
    for (i, byte) in vch.iter().enumerate() {
        if *byte != 0 {
            return !(i == vch.len() - 1 && *byte == 0x80);
        }
    }
    false
}

pub fn cast_from_bool(b: bool) -> Vec<u8> {
    if b {
        vec![1]
    } else {
        vec![]
    }
}

/// BIP 66 strict-DER check, applied to a signature that still carries its
/// trailing hash-type byte. An empty signature is not a valid DER signature.
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    // Minimum: 0x30 [total] 0x02 [len R=1] [R] 0x02 [len S=1] [S] [hashtype]
    if sig.len() < 9 || sig.len() > 73 {
        return false;
    }
    if sig[0] != 0x30 {
        return false;
    }
    if usize::from(sig[1]) != sig.len() - 3 {
        return false;
    }
    let len_r = usize::from(sig[3]);
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = usize::from(sig[5 + len_r]);
    if len_r + len_s + 7 != sig.len() {
        return false;
    }
    if sig[2] != 0x02 || len_r == 0 || sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0 && sig[5] & 0x80 == 0 {
        return false;
    }
    if sig[len_r + 4] != 0x02 || len_s == 0 || sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    }
    true
}

/// Half the order of secp256k1, big-endian. S values above this are
/// malleable.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

fn is_low_der_signature(sig: &[u8]) -> Result<(), ScriptError> {
    if !is_valid_signature_encoding(sig) {
        return Err(ScriptError::SigDER);
    }
    let len_r = usize::from(sig[3]);
    let len_s = usize::from(sig[5 + len_r]);
    let s = &sig[6 + len_r..6 + len_r + len_s];
    let magnitude = match s.iter().position(|b| *b != 0) {
        Some(i) => &s[i..],
        None => &[],
    };
    let high = match magnitude.len().cmp(&HALF_ORDER.len()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => magnitude > &HALF_ORDER[..],
    };
    if high {
        Err(ScriptError::SigHighS)
    } else {
        Ok(())
    }
}

const SIGHASH_ANYONECANPAY: u8 = 0x80;
const SIGHASH_FORKID: u8 = 0x40;

fn check_signature_encoding(sig: &[u8], flags: VerificationFlags) -> Result<(), ScriptError> {
    // An empty signature passes here and simply fails to verify; NULLFAIL
    // depends on that.
    if sig.is_empty() {
        return Ok(());
    }
    if flags.intersects(
        VerificationFlags::DerSig | VerificationFlags::LowS | VerificationFlags::StrictEnc,
    ) && !is_valid_signature_encoding(sig)
    {
        return Err(ScriptError::SigDER);
    }
    if flags.contains(VerificationFlags::LowS) {
        is_low_der_signature(sig)?;
    }
    if flags.contains(VerificationFlags::StrictEnc) {
        let hash_type = sig[sig.len() - 1];
        let base = hash_type & !(SIGHASH_ANYONECANPAY | SIGHASH_FORKID);
        if !(1..=3).contains(&base) {
            return Err(ScriptError::SigHashType);
        }
        let uses_fork_id = hash_type & SIGHASH_FORKID != 0;
        if uses_fork_id != flags.contains(VerificationFlags::SigHashForkId) {
            return Err(ScriptError::IllegalForkId);
        }
    }
    Ok(())
}

fn check_pub_key_encoding(pub_key: &[u8], flags: VerificationFlags) -> Result<(), ScriptError> {
    if !flags.contains(VerificationFlags::StrictEnc) {
        return Ok(());
    }
    let canonical = match pub_key.first() {
        Some(0x02) | Some(0x03) => pub_key.len() == 33,
        Some(0x04) => pub_key.len() == 65,
        _ => false,
    };
    if canonical {
        Ok(())
    } else {
        Err(ScriptError::PubKeyType)
    }
}

/// The script code a signature commits to: everything from the byte after
/// the last executed OP_CODESEPARATOR, with pre-fork signatures scrubbed
/// out of it.
fn signed_subscript(
    script: &[u8],
    code_sep: usize,
    sigs: &[&Vec<u8>],
    flags: VerificationFlags,
) -> Script {
    let mut subscript = Script(script[code_sep..].to_vec());
    if !flags.contains(VerificationFlags::SigHashForkId) {
        for sig in sigs {
            subscript = subscript.find_and_delete(&Operand::push_data(sig).encode());
        }
    }
    subscript
}

// Shifts treat the element as a big-endian bit string and preserve its
// length; bits shifted past either end are discarded.

fn lshift(data: &[u8], n: usize) -> Vec<u8> {
    let byte_shift = n / 8;
    let bit_shift = (n % 8) as u32;
    let mut out = vec![0u8; data.len()];
    for (i, slot) in out.iter_mut().enumerate() {
        let hi = data.get(i + byte_shift).copied().unwrap_or(0);
        let lo = data.get(i + byte_shift + 1).copied().unwrap_or(0);
        *slot = if bit_shift == 0 {
            hi
        } else {
            (hi << bit_shift) | (lo >> (8 - bit_shift))
        };
    }
    out
}

fn rshift(data: &[u8], n: usize) -> Vec<u8> {
    let byte_shift = n / 8;
    let bit_shift = (n % 8) as u32;
    let mut out = vec![0u8; data.len()];
    for (i, slot) in out.iter_mut().enumerate().skip(byte_shift) {
        let hi = if i > byte_shift {
            data[i - byte_shift - 1]
        } else {
            0
        };
        let lo = data[i - byte_shift];
        *slot = if bit_shift == 0 {
            lo
        } else {
            (lo >> bit_shift) | (hi << (8 - bit_shift))
        };
    }
    out
}

fn ripemd160(data: &[u8]) -> Vec<u8> {
    Ripemd160::digest(data).to_vec()
}

fn sha1(data: &[u8]) -> Vec<u8> {
    Sha1::digest(data).to_vec()
}

fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

pub fn hash160(data: &[u8]) -> Vec<u8> {
    ripemd160(&sha256(data))
}

pub fn hash256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

fn pop_num(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    max_size: Option<usize>,
) -> Result<i64, ScriptError> {
    let vch = stack.pop()?;
    Ok(parse_num(&vch, require_minimal, max_size)?)
}

fn unnum(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    f: impl FnOnce(i64) -> i64,
) -> Result<(), ScriptError> {
    let n = pop_num(stack, require_minimal, None)?;
    stack.push(serialize_num(f(n)));
    Ok(())
}

fn binnum(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    f: impl FnOnce(i64, i64) -> Result<i64, ScriptError>,
) -> Result<(), ScriptError> {
    let b = pop_num(stack, require_minimal, None)?;
    let a = pop_num(stack, require_minimal, None)?;
    stack.push(serialize_num(f(a, b)?));
    Ok(())
}

fn binrel(
    stack: &mut Stack<Vec<u8>>,
    require_minimal: bool,
    f: impl FnOnce(i64, i64) -> bool,
) -> Result<(), ScriptError> {
    let b = pop_num(stack, require_minimal, None)?;
    let a = pop_num(stack, require_minimal, None)?;
    stack.push(cast_from_bool(f(a, b)));
    Ok(())
}

fn unop(
    stack: &mut Stack<Vec<u8>>,
    f: impl FnOnce(Vec<u8>) -> Result<Vec<u8>, ScriptError>,
) -> Result<(), ScriptError> {
    let x = stack.pop()?;
    stack.push(f(x)?);
    Ok(())
}

fn binop(
    stack: &mut Stack<Vec<u8>>,
    f: impl FnOnce(Vec<u8>, Vec<u8>) -> Result<Vec<u8>, ScriptError>,
) -> Result<(), ScriptError> {
    let b = stack.pop()?;
    let a = stack.pop()?;
    stack.push(f(a, b)?);
    Ok(())
}

/// Execute the operand at `pc`, returning the offset of the next one.
///
/// Structure (conditional) opcodes run even inside an untaken branch; push
/// opcodes and all other operations are skipped there, apart from the
/// always-fatal ones.
pub fn eval_step(
    script: &[u8],
    pc: usize,
    flags: VerificationFlags,
    params: &ConsensusParams,
    checker: &dyn SignatureChecker,
    state: &mut State,
) -> Result<usize, ScriptError> {
    use Operation::*;

    let (operand, next) = Operand::decode(script, pc)?;
    let exec = state.executing();
    let require_minimal = flags.contains(VerificationFlags::MinimalData);
    trace!(pc, opcode = ?operand.opcode, exec, "step");

    if operand.data.len() > params.max_script_element_size {
        return Err(ScriptError::PushSize);
    }
    if !matches!(operand.opcode, Opcode::PushValue(_)) {
        state.op_count += 1;
        if state.op_count > params.max_ops_per_script {
            return Err(ScriptError::OpCount);
        }
    }

    match operand.opcode {
        // Fatal even when unexecuted.
        Opcode::Operation(OP_2MUL) | Opcode::Operation(OP_2DIV) => {
            return Err(ScriptError::DisabledOpcode)
        }
        Opcode::Operation(OP_VERIF) | Opcode::Operation(OP_VERNOTIF) => {
            return Err(ScriptError::BadOpcode)
        }

        Opcode::PushValue(pv) => {
            if exec {
                if pv == PushValue::OP_RESERVED {
                    return Err(ScriptError::BadOpcode);
                }
                if require_minimal && !operand.is_minimal_push() {
                    return Err(ScriptError::MinimalData);
                }
                state.stack.push(operand.data);
            }
        }

        Opcode::Unknown(_) => {
            if exec {
                return Err(ScriptError::BadOpcode);
            }
        }

        Opcode::Operation(op) => {
            let conditional = (OP_IF..=OP_ENDIF).contains(&op);
            if exec || conditional {
                eval_operation(op, exec, script, next, flags, params, checker, state)?;
            }
        }
    }

    if state.stack.len() + state.altstack.len() > MAX_STACK_DEPTH {
        return Err(ScriptError::StackSize);
    }
    Ok(next)
}

#[allow(clippy::too_many_arguments)]
fn eval_operation(
    op: Operation,
    exec: bool,
    script: &[u8],
    next: usize,
    flags: VerificationFlags,
    params: &ConsensusParams,
    checker: &dyn SignatureChecker,
    state: &mut State,
) -> Result<(), ScriptError> {
    use Operation::*;

    let require_minimal = flags.contains(VerificationFlags::MinimalData);
    let stack = &mut state.stack;

    match op {
        //
        // control
        //
        OP_NOP => {}

        OP_IF | OP_NOTIF => {
            let mut value = false;
            if exec {
                let vch = stack
                    .pop()
                    .map_err(|_| ScriptError::UnbalancedConditional)?;
                if flags.contains(VerificationFlags::MinimalIf)
                    && !(vch.is_empty() || vch == [1])
                {
                    return Err(ScriptError::MinimalIf);
                }
                value = cast_to_bool(&vch);
                if op == OP_NOTIF {
                    value = !value;
                }
            }
            state.vexec.push(value);
        }

        OP_ELSE => {
            let branch = state
                .vexec
                .last_mut()
                .map_err(|_| ScriptError::UnbalancedConditional)?;
            *branch = !*branch;
        }

        OP_ENDIF => {
            state
                .vexec
                .pop()
                .map_err(|_| ScriptError::UnbalancedConditional)?;
        }

        OP_VERIFY => {
            if cast_to_bool(stack.last()?) {
                stack.pop()?;
            } else {
                return Err(ScriptError::Verify);
            }
        }

        OP_RETURN => return Err(ScriptError::OpReturn),

        OP_VER | OP_RESERVED1 | OP_RESERVED2 | OP_INVALIDOPCODE => {
            return Err(ScriptError::BadOpcode)
        }

        //
        // stack ops
        //
        OP_TOALTSTACK => state.altstack.push(stack.pop()?),
        OP_FROMALTSTACK => {
            let vch = state
                .altstack
                .pop()
                .map_err(|_| ScriptError::InvalidAltstackOperation)?;
            stack.push(vch);
        }
        OP_2DROP => {
            // Probe depth first so a one-element stack is left intact.
            stack.top(1)?;
            stack.pop()?;
            stack.pop()?;
        }
        OP_DUP => stack.dup_n(1)?,
        OP_2DUP => stack.dup_n(2)?,
        OP_3DUP => stack.dup_n(3)?,
        OP_2OVER => {
            stack.pick(3)?;
            stack.pick(3)?;
        }
        OP_2ROT => {
            stack.roll(5)?;
            stack.roll(5)?;
        }
        OP_2SWAP => {
            stack.swap(0, 2)?;
            stack.swap(1, 3)?;
        }
        OP_IFDUP => {
            if cast_to_bool(stack.last()?) {
                stack.dup_n(1)?;
            }
        }
        OP_DEPTH => {
            let depth = stack.len() as i64;
            stack.push(serialize_num(depth));
        }
        OP_DROP => {
            stack.pop()?;
        }
        OP_NIP => {
            stack.remove(1)?;
        }
        OP_OVER => stack.pick(1)?,
        OP_PICK | OP_ROLL => {
            let n = pop_num(stack, require_minimal, None)?;
            if n < 0 || n as usize >= stack.len() {
                return Err(ScriptError::InvalidStackOperation);
            }
            if op == OP_PICK {
                stack.pick(n as usize)?;
            } else {
                stack.roll(n as usize)?;
            }
        }
        OP_ROT => {
            stack.swap(1, 2)?;
            stack.swap(0, 1)?;
        }
        OP_SWAP => stack.swap(0, 1)?,
        OP_TUCK => {
            let top = stack.last()?.clone();
            stack.top(1)?;
            stack.insert(2, top)?;
        }

        //
        // byte-string ops
        //
        OP_CAT => binop(stack, |mut a, b| {
            a.extend_from_slice(&b);
            if a.len() > params.max_script_element_size {
                return Err(ScriptError::PushSize);
            }
            Ok(a)
        })?,

        OP_SPLIT => {
            let at = pop_num(stack, require_minimal, None)?;
            let vch = stack.pop()?;
            if at < 0 || at as usize > vch.len() {
                return Err(ScriptError::InvalidSplitRange);
            }
            let at = at as usize;
            stack.push(vch[..at].to_vec());
            stack.push(vch[at..].to_vec());
        }

        OP_NUM2BIN => {
            let size = pop_num(stack, require_minimal, None)?;
            if size < 0 || size as usize > params.max_script_element_size {
                return Err(ScriptError::PushSize);
            }
            let size = size as usize;
            let mut data = minimally_encode(stack.pop()?.as_slice());
            if data.len() > size {
                return Err(ScriptError::ImpossibleEncoding);
            }
            let mut sign = 0u8;
            if let Some(last) = data.last_mut() {
                if *last & 0x80 != 0 {
                    sign = 0x80;
                    *last &= 0x7f;
                }
            }
            data.resize(size, 0);
            if let Some(last) = data.last_mut() {
                *last |= sign;
            }
            stack.push(data);
        }

        OP_BIN2NUM => unop(stack, |vch| {
            let data = minimally_encode(&vch);
            if data.len() > DEFAULT_MAX_NUM_SIZE {
                return Err(ScriptError::InvalidNumberRange);
            }
            Ok(data)
        })?,

        OP_SIZE => {
            let size = stack.last()?.len() as i64;
            stack.push(serialize_num(size));
        }

        //
        // bit logic
        //
        OP_INVERT => unop(stack, |mut vch| {
            for byte in &mut vch {
                *byte = !*byte;
            }
            Ok(vch)
        })?,

        OP_AND | OP_OR | OP_XOR => binop(stack, |mut a, b| {
            if a.len() != b.len() {
                return Err(ScriptError::InvalidOperandSize);
            }
            for (x, y) in a.iter_mut().zip(&b) {
                match op {
                    OP_AND => *x &= y,
                    OP_OR => *x |= y,
                    _ => *x ^= y,
                }
            }
            Ok(a)
        })?,

        OP_EQUAL | OP_EQUALVERIFY => {
            let b = stack.pop()?;
            let a = stack.pop()?;
            let equal = a == b;
            stack.push(cast_from_bool(equal));
            if op == OP_EQUALVERIFY {
                if equal {
                    stack.pop()?;
                } else {
                    return Err(ScriptError::EqualVerify);
                }
            }
        }

        //
        // numeric
        //
        OP_1ADD => unnum(stack, require_minimal, |n| n + 1)?,
        OP_1SUB => unnum(stack, require_minimal, |n| n - 1)?,
        OP_NEGATE => unnum(stack, require_minimal, |n| -n)?,
        OP_ABS => unnum(stack, require_minimal, i64::abs)?,
        OP_NOT => {
            let n = pop_num(stack, require_minimal, None)?;
            stack.push(cast_from_bool(n == 0));
        }
        OP_0NOTEQUAL => {
            let n = pop_num(stack, require_minimal, None)?;
            stack.push(cast_from_bool(n != 0));
        }

        OP_ADD => binnum(stack, require_minimal, |a, b| Ok(a + b))?,
        OP_SUB => binnum(stack, require_minimal, |a, b| Ok(a - b))?,
        OP_MUL => binnum(stack, require_minimal, |a, b| Ok(a * b))?,
        OP_DIV => binnum(stack, require_minimal, |a, b| {
            if b == 0 {
                Err(ScriptError::DivByZero)
            } else {
                Ok(a / b)
            }
        })?,
        OP_MOD => binnum(stack, require_minimal, |a, b| {
            if b == 0 {
                Err(ScriptError::ModByZero)
            } else {
                Ok(a % b)
            }
        })?,

        OP_LSHIFT | OP_RSHIFT => {
            let n = pop_num(stack, require_minimal, None)?;
            if n < 0 {
                return Err(ScriptError::InvalidNumberRange);
            }
            let vch = stack.pop()?;
            let shifted = if op == OP_LSHIFT {
                lshift(&vch, n as usize)
            } else {
                rshift(&vch, n as usize)
            };
            stack.push(shifted);
        }

        OP_BOOLAND => binrel(stack, require_minimal, |a, b| a != 0 && b != 0)?,
        OP_BOOLOR => binrel(stack, require_minimal, |a, b| a != 0 || b != 0)?,
        OP_NUMEQUAL => binrel(stack, require_minimal, |a, b| a == b)?,
        OP_NUMEQUALVERIFY => {
            binrel(stack, require_minimal, |a, b| a == b)?;
            if cast_to_bool(stack.last()?) {
                stack.pop()?;
            } else {
                return Err(ScriptError::NumEqualVerify);
            }
        }
        OP_NUMNOTEQUAL => binrel(stack, require_minimal, |a, b| a != b)?,
        OP_LESSTHAN => binrel(stack, require_minimal, |a, b| a < b)?,
        OP_GREATERTHAN => binrel(stack, require_minimal, |a, b| a > b)?,
        OP_LESSTHANOREQUAL => binrel(stack, require_minimal, |a, b| a <= b)?,
        OP_GREATERTHANOREQUAL => binrel(stack, require_minimal, |a, b| a >= b)?,
        OP_MIN => binnum(stack, require_minimal, |a, b| Ok(a.min(b)))?,
        OP_MAX => binnum(stack, require_minimal, |a, b| Ok(a.max(b)))?,

        OP_WITHIN => {
            let max = pop_num(stack, require_minimal, None)?;
            let min = pop_num(stack, require_minimal, None)?;
            let x = pop_num(stack, require_minimal, None)?;
            stack.push(cast_from_bool(min <= x && x < max));
        }

        //
        // crypto
        //
        OP_RIPEMD160 => unop(stack, |vch| Ok(ripemd160(&vch)))?,
        OP_SHA1 => unop(stack, |vch| Ok(sha1(&vch)))?,
        OP_SHA256 => unop(stack, |vch| Ok(sha256(&vch)))?,
        OP_HASH160 => unop(stack, |vch| Ok(hash160(&vch)))?,
        OP_HASH256 => unop(stack, |vch| Ok(hash256(&vch)))?,

        OP_CODESEPARATOR => state.code_sep = next,

        OP_CHECKSIG | OP_CHECKSIGVERIFY => {
            let pub_key = stack.pop()?;
            let sig = stack.pop()?;

            check_signature_encoding(&sig, flags)?;
            check_pub_key_encoding(&pub_key, flags)?;

            let subscript = signed_subscript(script, state.code_sep, &[&sig], flags);
            let success = checker.check_sig(&sig, &pub_key, &subscript);

            if !success && flags.contains(VerificationFlags::NullFail) && !sig.is_empty() {
                return Err(ScriptError::SigNullFail);
            }

            stack.push(cast_from_bool(success));
            if op == OP_CHECKSIGVERIFY {
                if success {
                    stack.pop()?;
                } else {
                    return Err(ScriptError::CheckSigVerify);
                }
            }
        }

        OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
            let key_count = pop_num(stack, require_minimal, None)?;
            if key_count < 0 || key_count as usize > params.max_pubkeys_per_multisig {
                return Err(ScriptError::PubKeyCount);
            }
            state.op_count += key_count as u32;
            if state.op_count > params.max_ops_per_script {
                return Err(ScriptError::OpCount);
            }
            let mut keys = Vec::with_capacity(key_count as usize);
            for _ in 0..key_count {
                keys.push(stack.pop()?);
            }

            let sig_count = pop_num(stack, require_minimal, None)?;
            if sig_count < 0 || sig_count > key_count {
                return Err(ScriptError::SigCount);
            }
            let mut sigs = Vec::with_capacity(sig_count as usize);
            for _ in 0..sig_count {
                sigs.push(stack.pop()?);
            }

            // The historical extra element.
            let dummy = stack.pop()?;
            if flags.contains(VerificationFlags::NullDummy) && !dummy.is_empty() {
                return Err(ScriptError::SigNullDummy);
            }

            let sig_refs: Vec<&Vec<u8>> = sigs.iter().collect();
            let subscript = signed_subscript(script, state.code_sep, &sig_refs, flags);

            // Signatures must appear in the same order as their keys. Both
            // lists run top-down; a key that fails to match is never
            // revisited.
            let mut isig = 0;
            let mut ikey = 0;
            let mut success = true;
            while success && isig < sigs.len() {
                if sigs.len() - isig > keys.len() - ikey {
                    success = false;
                    break;
                }
                check_signature_encoding(&sigs[isig], flags)?;
                check_pub_key_encoding(&keys[ikey], flags)?;
                if checker.check_sig(&sigs[isig], &keys[ikey], &subscript) {
                    isig += 1;
                }
                ikey += 1;
            }

            if !success
                && flags.contains(VerificationFlags::NullFail)
                && sigs.iter().any(|sig| !sig.is_empty())
            {
                return Err(ScriptError::SigNullFail);
            }

            stack.push(cast_from_bool(success));
            if op == OP_CHECKMULTISIGVERIFY {
                if success {
                    stack.pop()?;
                } else {
                    return Err(ScriptError::CheckMultisigVerify);
                }
            }
        }

        //
        // expansion
        //
        OP_NOP2 => {
            if !flags.contains(VerificationFlags::CheckLockTimeVerify) {
                if flags.contains(VerificationFlags::DiscourageUpgradableNOPs) {
                    return Err(ScriptError::DiscourageUpgradableNOPs);
                }
                return Ok(());
            }
            // Locktimes reach past the 4-byte numeric range, so the operand
            // may use up to 5 bytes. It stays on the stack.
            let lock_time = parse_num(stack.last()?, require_minimal, Some(5))?;
            if lock_time < 0 {
                return Err(ScriptError::NegativeLockTime);
            }
            if !checker.check_lock_time(lock_time) {
                return Err(ScriptError::UnsatisfiedLockTime);
            }
        }

        OP_NOP3 => {
            if !flags.contains(VerificationFlags::CheckSequenceVerify) {
                if flags.contains(VerificationFlags::DiscourageUpgradableNOPs) {
                    return Err(ScriptError::DiscourageUpgradableNOPs);
                }
                return Ok(());
            }
            let sequence = parse_num(stack.last()?, require_minimal, Some(5))?;
            if sequence < 0 {
                return Err(ScriptError::NegativeLockTime);
            }
            // With the disable bit set the operand asserts nothing.
            if sequence & (1 << 31) != 0 {
                return Ok(());
            }
            if !checker.check_sequence(sequence) {
                return Err(ScriptError::UnsatisfiedLockTime);
            }
        }

        OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
            if flags.contains(VerificationFlags::DiscourageUpgradableNOPs) {
                return Err(ScriptError::DiscourageUpgradableNOPs);
            }
        }

        // Handled in eval_step before dispatch.
        OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF | OP_2MUL | OP_2DIV => unreachable!(),
    }

    Ok(())
}

/// Run a whole script over the given starting stack.
pub fn eval_script(
    stack: Stack<Vec<u8>>,
    script: &Script,
    flags: VerificationFlags,
    params: &ConsensusParams,
    checker: &dyn SignatureChecker,
) -> Result<Stack<Vec<u8>>, ScriptError> {
    if script.0.len() > params.max_script_size {
        return Err(ScriptError::ScriptSize);
    }
    let mut state = State::initial(stack);
    let mut pc = 0;
    while pc < script.0.len() {
        pc = eval_step(script.as_bytes(), pc, flags, params, checker, &mut state)?;
    }
    if !state.vexec.is_empty() {
        return Err(ScriptError::UnbalancedConditional);
    }
    Ok(state.stack)
}

/// Verify a spend: run the unlocking script, then the locking script over
/// the resulting stack, and require a truthy final top element.
pub fn verify_script(
    sig_script: &Script,
    pub_key_script: &Script,
    flags: VerificationFlags,
    params: &ConsensusParams,
    checker: &dyn SignatureChecker,
) -> Result<(), ScriptError> {
    let mut flags = flags;
    if flags.contains(VerificationFlags::SigHashForkId) {
        flags |= VerificationFlags::StrictEnc;
    }
    if flags.contains(VerificationFlags::SigPushOnly) && !sig_script.is_push_only() {
        return Err(ScriptError::SigPushOnly);
    }

    let stack = eval_script(Stack::new(), sig_script, flags, params, checker)?;
    let stack = eval_script(stack, pub_key_script, flags, params, checker)?;

    match stack.last() {
        Ok(top) if cast_to_bool(top) => {
            if flags.contains(VerificationFlags::CleanStack) && stack.len() != 1 {
                Err(ScriptError::CleanStack)
            } else {
                Ok(())
            }
        }
        _ => Err(ScriptError::EvalFalse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_casting() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0]));
        assert!(!cast_to_bool(&[0, 0]));
        // Negative zero.
        assert!(!cast_to_bool(&[0x80]));
        assert!(!cast_to_bool(&[0, 0x80]));
        assert!(cast_to_bool(&[1]));
        assert!(cast_to_bool(&[0x80, 0]));
        assert!(cast_to_bool(&[0, 1, 0]));
        assert_eq!(cast_from_bool(true), vec![1]);
        assert_eq!(cast_from_bool(false), Vec::<u8>::new());
    }

    fn der_sig(r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut sig = vec![0x30, (r.len() + s.len() + 4) as u8, 0x02, r.len() as u8];
        sig.extend_from_slice(r);
        sig.push(0x02);
        sig.push(s.len() as u8);
        sig.extend_from_slice(s);
        sig.push(0x41); // SIGHASH_ALL | FORKID
        sig
    }

    #[test]
    fn der_encoding() {
        assert!(is_valid_signature_encoding(&der_sig(&[1], &[1])));
        assert!(is_valid_signature_encoding(&der_sig(
            &[0x7f; 32],
            &[0x7f; 32]
        )));
        assert!(!is_valid_signature_encoding(&[]));
        assert!(!is_valid_signature_encoding(&[0x30]));
        // Wrong sequence tag.
        let mut sig = der_sig(&[1], &[1]);
        sig[0] = 0x31;
        assert!(!is_valid_signature_encoding(&sig));
        // Negative R.
        assert!(!is_valid_signature_encoding(&der_sig(&[0x80], &[1])));
        // Padded R.
        assert!(!is_valid_signature_encoding(&der_sig(&[0x00, 0x01], &[1])));
        // R needing a leading zero keeps it.
        assert!(is_valid_signature_encoding(&der_sig(&[0x00, 0x80], &[1])));
    }

    #[test]
    fn low_s_boundary() {
        assert_eq!(is_low_der_signature(&der_sig(&[1], &[1])), Ok(()));
        assert_eq!(
            is_low_der_signature(&der_sig(&[1], &HALF_ORDER)),
            Ok(())
        );
        let mut above = HALF_ORDER;
        above[31] += 1;
        assert_eq!(
            is_low_der_signature(&der_sig(&[1], &above)),
            Err(ScriptError::SigHighS)
        );
    }

    #[test]
    fn hash_type_rules() {
        let strict = VerificationFlags::StrictEnc;
        let fork = strict | VerificationFlags::SigHashForkId;
        let sig = der_sig(&[1], &[1]); // hash type 0x41
        assert_eq!(check_signature_encoding(&sig, fork), Ok(()));
        assert_eq!(
            check_signature_encoding(&sig, strict),
            Err(ScriptError::IllegalForkId)
        );
        let mut no_fork = sig.clone();
        *no_fork.last_mut().expect("non-empty") = 0x01;
        assert_eq!(check_signature_encoding(&no_fork, strict), Ok(()));
        assert_eq!(
            check_signature_encoding(&no_fork, fork),
            Err(ScriptError::IllegalForkId)
        );
        let mut bad_base = sig;
        *bad_base.last_mut().expect("non-empty") = 0x45;
        assert_eq!(
            check_signature_encoding(&bad_base, fork),
            Err(ScriptError::SigHashType)
        );
        // Empty signatures are always acceptable as encodings.
        assert_eq!(check_signature_encoding(&[], fork), Ok(()));
    }

    #[test]
    fn pub_key_shapes() {
        let strict = VerificationFlags::StrictEnc;
        assert_eq!(check_pub_key_encoding(&[0x02; 33], strict), Ok(()));
        let mut uncompressed = vec![0x04];
        uncompressed.resize(65, 0xaa);
        assert_eq!(check_pub_key_encoding(&uncompressed, strict), Ok(()));
        assert_eq!(
            check_pub_key_encoding(&[0x02; 32], strict),
            Err(ScriptError::PubKeyType)
        );
        assert_eq!(
            check_pub_key_encoding(&[0x05; 33], strict),
            Err(ScriptError::PubKeyType)
        );
        assert_eq!(
            check_pub_key_encoding(&[0x05; 33], VerificationFlags::empty()),
            Ok(())
        );
    }

    #[test]
    fn shifts_preserve_length() {
        assert_eq!(lshift(&[0x12, 0x34], 4), vec![0x23, 0x40]);
        assert_eq!(rshift(&[0x23, 0x40], 4), vec![0x02, 0x34]);
        assert_eq!(lshift(&[0xff], 8), vec![0x00]);
        assert_eq!(rshift(&[0xff], 8), vec![0x00]);
        assert_eq!(lshift(&[0x01, 0x00], 8), vec![0x00, 0x00]);
        assert_eq!(rshift(&[0x00, 0x80], 1), vec![0x00, 0x40]);
        assert_eq!(lshift(&[], 5), Vec::<u8>::new());
        assert_eq!(lshift(&[0xab, 0xcd], 0), vec![0xab, 0xcd]);
    }

    #[test]
    fn flag_names_parse() {
        assert_eq!(
            VerificationFlags::from_names(""),
            Ok(VerificationFlags::empty())
        );
        assert_eq!(
            VerificationFlags::from_names("NONE"),
            Ok(VerificationFlags::empty())
        );
        assert_eq!(
            VerificationFlags::from_names("STRICTENC,MINIMALDATA"),
            Ok(VerificationFlags::StrictEnc | VerificationFlags::MinimalData)
        );
        assert_eq!(
            VerificationFlags::from_names("cleanstack , nullfail"),
            Ok(VerificationFlags::CleanStack | VerificationFlags::NullFail)
        );
        assert_eq!(
            VerificationFlags::from_names("BOGUS"),
            Err(UnknownFlag("BOGUS".into()))
        );
    }
}
