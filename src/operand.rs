//! The instruction unit of a script: an opcode together with the data it
//! pushes, if any.

use crate::opcode::{Opcode, Operation, PushValue};
use crate::script_error::ScriptError;

/// A single decoded instruction. Operations carry no data; push opcodes own
/// the element they place on the stack.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Operand {
    pub opcode: Opcode,
    pub data: Vec<u8>,
}

fn read_le(script: &[u8], pc: usize, nbytes: usize) -> Result<usize, ScriptError> {
    if script.len() - pc < nbytes {
        return Err(ScriptError::ReadError {
            expected_bytes: nbytes,
            available_bytes: script.len() - pc,
        });
    }
    let mut size = 0;
    for i in (0..nbytes).rev() {
        size <<= 8;
        size |= usize::from(script[pc + i]);
    }
    Ok(size)
}

impl Operand {
    /// A bare operation with no attached data.
    pub fn op(op: Operation) -> Self {
        Operand {
            opcode: Opcode::Operation(op),
            data: Vec::new(),
        }
    }

    /// Build the minimal push for the given element: the dedicated small-value
    /// opcodes for `[]`, `[0x81]` and `[1]`–`[16]`, a direct length byte up to
    /// 75 bytes, then the smallest PUSHDATA form that fits.
    pub fn push_data(data: &[u8]) -> Self {
        let opcode = match data {
            [] => Opcode::PushValue(PushValue::OP_0),
            [0x81] => Opcode::PushValue(PushValue::OP_1NEGATE),
            [b @ 1..=16] => {
                return Operand {
                    opcode: Opcode::from(0x50 + b),
                    data: vec![*b],
                }
            }
            _ if data.len() < 0x4c => {
                Opcode::PushValue(PushValue::PushdataBytelength(data.len() as u8))
            }
            _ if data.len() <= 0xff => Opcode::PushValue(PushValue::OP_PUSHDATA1),
            _ if data.len() <= 0xffff => Opcode::PushValue(PushValue::OP_PUSHDATA2),
            _ => Opcode::PushValue(PushValue::OP_PUSHDATA4),
        };
        Operand {
            opcode,
            data: data.to_vec(),
        }
    }

    /// Minimal push of a number's canonical encoding.
    pub fn push_num(n: i64) -> Self {
        Operand::push_data(&crate::num::serialize_num(n))
    }

    /// Decode the operand starting at `pc`, returning it along with the
    /// offset of the following operand. Truncated pushes are read errors;
    /// unassigned opcode bytes decode successfully and fail later, if and
    /// when they are executed.
    pub fn decode(script: &[u8], pc: usize) -> Result<(Operand, usize), ScriptError> {
        if pc >= script.len() {
            return Err(ScriptError::ReadError {
                expected_bytes: 1,
                available_bytes: 0,
            });
        }
        let opcode = Opcode::from(script[pc]);
        let mut next = pc + 1;
        let data = match opcode {
            Opcode::PushValue(pv) => match pv {
                PushValue::PushdataBytelength(len) => {
                    let len = usize::from(len);
                    let start = next;
                    next = start + len;
                    if next > script.len() {
                        return Err(ScriptError::ReadError {
                            expected_bytes: len,
                            available_bytes: script.len() - start,
                        });
                    }
                    script[start..next].to_vec()
                }
                PushValue::OP_PUSHDATA1 | PushValue::OP_PUSHDATA2 | PushValue::OP_PUSHDATA4 => {
                    let nbytes = match pv {
                        PushValue::OP_PUSHDATA1 => 1,
                        PushValue::OP_PUSHDATA2 => 2,
                        _ => 4,
                    };
                    let len = read_le(script, next, nbytes)?;
                    let start = next + nbytes;
                    next = start + len;
                    if next > script.len() {
                        return Err(ScriptError::ReadError {
                            expected_bytes: len,
                            available_bytes: script.len() - start,
                        });
                    }
                    script[start..next].to_vec()
                }
                PushValue::OP_0 => Vec::new(),
                PushValue::OP_1NEGATE => vec![0x81],
                PushValue::OP_RESERVED => Vec::new(),
                _ => vec![pv.decode_op_n() as u8],
            },
            Opcode::Operation(_) | Opcode::Unknown(_) => Vec::new(),
        };
        Ok((Operand { opcode, data }, next))
    }

    /// Serialize back to script bytes. This is the exact inverse of
    /// [`Operand::decode`] for every operand `decode` can produce.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![u8::from(self.opcode)];
        match self.opcode {
            Opcode::PushValue(pv) => match pv {
                PushValue::PushdataBytelength(_) => out.extend_from_slice(&self.data),
                PushValue::OP_PUSHDATA1 => {
                    out.push(self.data.len() as u8);
                    out.extend_from_slice(&self.data);
                }
                PushValue::OP_PUSHDATA2 => {
                    out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
                    out.extend_from_slice(&self.data);
                }
                PushValue::OP_PUSHDATA4 => {
                    out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
                    out.extend_from_slice(&self.data);
                }
                // Small values carry their element in the opcode byte.
                _ => {}
            },
            Opcode::Operation(_) | Opcode::Unknown(_) => {}
        }
        out
    }

    /// Whether this push uses the smallest encoding capable of holding its
    /// element. Non-push operands are trivially minimal.
    pub fn is_minimal_push(&self) -> bool {
        let pv = match self.opcode {
            Opcode::PushValue(pv) => pv,
            _ => return true,
        };
        match pv {
            PushValue::PushdataBytelength(_) => match self.data.as_slice() {
                [] => false,
                [b] => !(*b == 0x81 || (1..=16).contains(b)),
                _ => true,
            },
            PushValue::OP_PUSHDATA1 => self.data.len() >= 0x4c,
            PushValue::OP_PUSHDATA2 => self.data.len() > 0xff,
            PushValue::OP_PUSHDATA4 => self.data.len() > 0xffff,
            _ => true,
        }
    }

    /// True for the push half of the opcode space (byte values 0x00–0x60).
    pub fn is_push(&self) -> bool {
        matches!(self.opcode, Opcode::PushValue(_))
    }
}
