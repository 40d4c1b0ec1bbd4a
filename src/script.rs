//! Serialized scripts and script-level predicates.

use crate::opcode::{Opcode, Operation, PushValue};
use crate::operand::Operand;
use crate::script_error::ScriptError;

/// A serialized script.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Script(pub Vec<u8>);

/// Iterates the operands of a script in order, surfacing decode failures as
/// the final item.
pub struct Operands<'a> {
    script: &'a [u8],
    pc: usize,
    failed: bool,
}

impl Iterator for Operands<'_> {
    type Item = Result<Operand, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pc >= self.script.len() {
            return None;
        }
        match Operand::decode(self.script, self.pc) {
            Ok((operand, next)) => {
                self.pc = next;
                Some(Ok(operand))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl Script {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn operands(&self) -> Operands<'_> {
        Operands {
            script: &self.0,
            pc: 0,
            failed: false,
        }
    }

    /// Whether every operand is a push. A truncated trailing push makes the
    /// script non-push-only.
    pub fn is_push_only(&self) -> bool {
        self.operands()
            .all(|operand| operand.map_or(false, |op| op.is_push()))
    }

    /// Remove every operand whose serialization exactly matches `target`,
    /// scanning at operand boundaries only. Used to drop signature pushes
    /// from the script being hashed.
    pub fn find_and_delete(&self, target: &[u8]) -> Script {
        if target.is_empty() {
            return self.clone();
        }
        let mut out = Vec::with_capacity(self.0.len());
        let mut pc = 0;
        while pc < self.0.len() {
            match Operand::decode(&self.0, pc) {
                Ok((_, next)) => {
                    if &self.0[pc..next] != target {
                        out.extend_from_slice(&self.0[pc..next]);
                    }
                    pc = next;
                }
                Err(_) => {
                    // Keep undecodable tails verbatim.
                    out.extend_from_slice(&self.0[pc..]);
                    break;
                }
            }
        }
        Script(out)
    }

    /// Count signature operations. With `accurate`, a CHECKMULTISIG preceded
    /// by OP_1..OP_16 counts as that many keys; otherwise (and whenever the
    /// key count is not a small constant) it counts as the multisig maximum.
    pub fn get_sig_op_count(&self, accurate: bool, max_pubkeys: usize) -> usize {
        let mut count = 0;
        let mut last: Option<Opcode> = None;
        for operand in self.operands() {
            let operand = match operand {
                Ok(op) => op,
                Err(_) => break,
            };
            match operand.opcode {
                Opcode::Operation(Operation::OP_CHECKSIG)
                | Opcode::Operation(Operation::OP_CHECKSIGVERIFY) => count += 1,
                Opcode::Operation(Operation::OP_CHECKMULTISIG)
                | Opcode::Operation(Operation::OP_CHECKMULTISIGVERIFY) => {
                    count += match last {
                        Some(Opcode::PushValue(pv)) if accurate && pv >= PushValue::OP_1 && pv <= PushValue::OP_16 => {
                            pv.decode_op_n() as usize
                        }
                        _ => max_pubkeys,
                    }
                }
                _ => {}
            }
            last = Some(operand.opcode);
        }
        count
    }
}

/// Why an asm string failed to parse.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum AsmError {
    #[error("unknown token `{0}`")]
    UnknownToken(String),
    #[error("bad hex in `{0}`")]
    BadHex(String),
    #[error("push too large ({0} bytes)")]
    PushTooLarge(usize),
}

impl Script {
    /// Assemble a script from the whitespace-separated test-vector notation:
    /// `OP_*` mnemonics, decimal numbers (minimal numeric pushes), `0x…` raw
    /// bytes spliced verbatim, and `'text'` ascii pushes.
    pub fn parse_asm(asm: &str) -> Result<Script, AsmError> {
        let mut bytes = Vec::new();
        for token in asm.split_whitespace() {
            if let Some(hex_str) = token.strip_prefix("0x") {
                let raw = hex::decode(hex_str).map_err(|_| AsmError::BadHex(token.into()))?;
                bytes.extend_from_slice(&raw);
            } else if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
                let text = &token[1..token.len() - 1];
                if text.len() > 0xffff_ffff {
                    return Err(AsmError::PushTooLarge(text.len()));
                }
                bytes.extend_from_slice(&Operand::push_data(text.as_bytes()).encode());
            } else if let Ok(n) = token.parse::<i64>() {
                bytes.extend_from_slice(&Operand::push_num(n).encode());
            } else if let Some(byte) = Opcode::byte_from_name(token) {
                bytes.push(byte);
            } else {
                return Err(AsmError::UnknownToken(token.into()));
            }
        }
        Ok(Script(bytes))
    }

    /// Render the script in asm notation. Pushes print as
    /// `<len> 0x<hex>` so the output is unambiguous even for elements that
    /// look like numbers.
    pub fn to_asm_string(&self) -> String {
        let mut parts = Vec::new();
        for operand in self.operands() {
            match operand {
                Ok(op) => match op.opcode {
                    Opcode::PushValue(pv)
                        if matches!(
                            pv,
                            PushValue::PushdataBytelength(_)
                                | PushValue::OP_PUSHDATA1
                                | PushValue::OP_PUSHDATA2
                                | PushValue::OP_PUSHDATA4
                        ) =>
                    {
                        let body = format!("{} 0x{}", op.data.len(), hex::encode(&op.data));
                        match op.opcode.name() {
                            Some(name) => parts.push(format!("{} {}", name, body)),
                            None => parts.push(body),
                        }
                    }
                    Opcode::Unknown(byte) => parts.push(format!("0x{:02x}", byte)),
                    opcode => match opcode.name() {
                        Some(name) => parts.push(name.into()),
                        None => parts.push(format!("0x{:02x}", u8::from(opcode))),
                    },
                },
                Err(_) => {
                    parts.push("[error]".into());
                    break;
                }
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_only_accepts_all_push_forms() {
        let script = Script::parse_asm("0 1 16 1NEGATE 0x02 0xbeef").expect("parses");
        assert!(script.is_push_only());
        let script = Script::parse_asm("1 OP_DUP").expect("parses");
        assert!(!script.is_push_only());
    }

    #[test]
    fn truncated_script_is_not_push_only() {
        assert!(!Script(vec![0x4c]).is_push_only());
    }

    #[test]
    fn parse_asm_forms() {
        assert_eq!(Script::parse_asm("OP_DUP").expect("parses").0, vec![0x76]);
        // Decimal numbers encode as minimal numeric pushes.
        assert_eq!(Script::parse_asm("256").expect("parses").0, vec![0x02, 0x00, 0x01]);
        assert_eq!(Script::parse_asm("-1").expect("parses").0, vec![0x4f]);
        // Raw hex splices without a length prefix.
        assert_eq!(
            Script::parse_asm("0x4c 0x01 0xaa").expect("parses").0,
            vec![0x4c, 0x01, 0xaa]
        );
        assert_eq!(
            Script::parse_asm("'ab'").expect("parses").0,
            vec![0x02, 0x61, 0x62]
        );
        assert!(matches!(
            Script::parse_asm("OP_FAKE"),
            Err(AsmError::UnknownToken(_))
        ));
        assert!(matches!(
            Script::parse_asm("0xzz"),
            Err(AsmError::BadHex(_))
        ));
    }

    #[test]
    fn find_and_delete_matches_operand_boundaries() {
        // [sig-ish push] OP_DUP [sig-ish push]
        let sig = Operand::push_data(&[0xde, 0xad]).encode();
        let mut bytes = sig.clone();
        bytes.push(0x76);
        bytes.extend_from_slice(&sig);
        let cleaned = Script(bytes).find_and_delete(&sig);
        assert_eq!(cleaned.0, vec![0x76]);

        // A byte-level match inside a larger push is not deleted.
        let container = Operand::push_data(&[0x02, 0xde, 0xad]).encode();
        let kept = Script(container.clone()).find_and_delete(&sig);
        assert_eq!(kept.0, container);
    }

    #[test]
    fn sig_op_counting() {
        let script = Script::parse_asm("OP_CHECKSIG OP_CHECKSIGVERIFY").expect("parses");
        assert_eq!(script.get_sig_op_count(true, 20), 2);

        // OP_2 OP_CHECKMULTISIG
        let script = Script(vec![0x52, 0xae]);
        assert_eq!(script.get_sig_op_count(true, 20), 2);
        assert_eq!(script.get_sig_op_count(false, 20), 20);

        // Key count not a small constant: counts as the maximum either way.
        let script = Script(vec![0x01, 0x11, 0xae]);
        assert_eq!(script.get_sig_op_count(true, 20), 20);
    }

    #[test]
    fn asm_rendering() {
        let script = Script::parse_asm("OP_DUP 0x02 0xbeef OP_EQUAL").expect("parses");
        assert_eq!(script.to_asm_string(), "OP_DUP 2 0xbeef OP_EQUAL");
        // Explicit-length pushes keep their mnemonic.
        let script = Script(vec![0x4c, 0x01, 0xaa]);
        assert_eq!(script.to_asm_string(), "OP_PUSHDATA1 1 0xaa");
    }
}
