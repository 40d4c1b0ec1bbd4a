#![allow(non_camel_case_types)]

//! Script opcodes.
//!
//! Push values (0x00–0x60) and operations (0x61 and up) are kept as separate
//! enums because the two halves behave differently in the evaluator: pushes
//! carry inline data and skip the op-count accounting, operations do the
//! opposite. Byte values with no assigned meaning stay representable as
//! [`Opcode::Unknown`] so that decoding a script never loses bytes; they only
//! fail once the evaluator actually executes them.

use enum_primitive::FromPrimitive;

/// One decoded instruction byte.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Opcode {
    PushValue(PushValue),
    Operation(Operation),
    /// A byte value with no assigned instruction. Preserved verbatim so
    /// encoding round-trips; evaluating it is a bad-opcode failure.
    Unknown(u8),
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum PushValue {
    // push value
    OP_0 = 0x00,
    PushdataBytelength(u8),
    OP_PUSHDATA1 = 0x4c,
    OP_PUSHDATA2 = 0x4d,
    OP_PUSHDATA4 = 0x4e,
    OP_1NEGATE = 0x4f,
    OP_RESERVED = 0x50,
    OP_1 = 0x51,
    OP_2 = 0x52,
    OP_3 = 0x53,
    OP_4 = 0x54,
    OP_5 = 0x55,
    OP_6 = 0x56,
    OP_7 = 0x57,
    OP_8 = 0x58,
    OP_9 = 0x59,
    OP_10 = 0x5a,
    OP_11 = 0x5b,
    OP_12 = 0x5c,
    OP_13 = 0x5d,
    OP_14 = 0x5e,
    OP_15 = 0x5f,
    OP_16 = 0x60,
}

use PushValue::*;

enum_from_primitive! {
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Operation {
    // control
    OP_NOP = 0x61,
    OP_VER = 0x62,
    OP_IF = 0x63,
    OP_NOTIF = 0x64,
    OP_VERIF = 0x65,
    OP_VERNOTIF = 0x66,
    OP_ELSE = 0x67,
    OP_ENDIF = 0x68,
    OP_VERIFY = 0x69,
    OP_RETURN = 0x6a,

    // stack ops
    OP_TOALTSTACK = 0x6b,
    OP_FROMALTSTACK = 0x6c,
    OP_2DROP = 0x6d,
    OP_2DUP = 0x6e,
    OP_3DUP = 0x6f,
    OP_2OVER = 0x70,
    OP_2ROT = 0x71,
    OP_2SWAP = 0x72,
    OP_IFDUP = 0x73,
    OP_DEPTH = 0x74,
    OP_DROP = 0x75,
    OP_DUP = 0x76,
    OP_NIP = 0x77,
    OP_OVER = 0x78,
    OP_PICK = 0x79,
    OP_ROLL = 0x7a,
    OP_ROT = 0x7b,
    OP_SWAP = 0x7c,
    OP_TUCK = 0x7d,

    // byte-string ops
    OP_CAT = 0x7e,
    OP_SPLIT = 0x7f,
    OP_NUM2BIN = 0x80,
    OP_BIN2NUM = 0x81,
    OP_SIZE = 0x82,

    // bit logic
    OP_INVERT = 0x83,
    OP_AND = 0x84,
    OP_OR = 0x85,
    OP_XOR = 0x86,
    OP_EQUAL = 0x87,
    OP_EQUALVERIFY = 0x88,
    OP_RESERVED1 = 0x89,
    OP_RESERVED2 = 0x8a,

    // numeric
    OP_1ADD = 0x8b,
    OP_1SUB = 0x8c,
    OP_2MUL = 0x8d,
    OP_2DIV = 0x8e,
    OP_NEGATE = 0x8f,
    OP_ABS = 0x90,
    OP_NOT = 0x91,
    OP_0NOTEQUAL = 0x92,

    OP_ADD = 0x93,
    OP_SUB = 0x94,
    OP_MUL = 0x95,
    OP_DIV = 0x96,
    OP_MOD = 0x97,
    OP_LSHIFT = 0x98,
    OP_RSHIFT = 0x99,

    OP_BOOLAND = 0x9a,
    OP_BOOLOR = 0x9b,
    OP_NUMEQUAL = 0x9c,
    OP_NUMEQUALVERIFY = 0x9d,
    OP_NUMNOTEQUAL = 0x9e,
    OP_LESSTHAN = 0x9f,
    OP_GREATERTHAN = 0xa0,
    OP_LESSTHANOREQUAL = 0xa1,
    OP_GREATERTHANOREQUAL = 0xa2,
    OP_MIN = 0xa3,
    OP_MAX = 0xa4,

    OP_WITHIN = 0xa5,

    // crypto
    OP_RIPEMD160 = 0xa6,
    OP_SHA1 = 0xa7,
    OP_SHA256 = 0xa8,
    OP_HASH160 = 0xa9,
    OP_HASH256 = 0xaa,
    OP_CODESEPARATOR = 0xab,
    OP_CHECKSIG = 0xac,
    OP_CHECKSIGVERIFY = 0xad,
    OP_CHECKMULTISIG = 0xae,
    OP_CHECKMULTISIGVERIFY = 0xaf,

    // expansion
    OP_NOP1 = 0xb0,
    OP_NOP2 = 0xb1,
    OP_NOP3 = 0xb2,
    OP_NOP4 = 0xb3,
    OP_NOP5 = 0xb4,
    OP_NOP6 = 0xb5,
    OP_NOP7 = 0xb6,
    OP_NOP8 = 0xb7,
    OP_NOP9 = 0xb8,
    OP_NOP10 = 0xb9,

    OP_INVALIDOPCODE = 0xff,
}
}

use Operation::*;

pub const OP_CHECKLOCKTIMEVERIFY: Operation = OP_NOP2;
pub const OP_CHECKSEQUENCEVERIFY: Operation = OP_NOP3;

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::PushValue(pv) => pv.into(),
            Opcode::Operation(op) => op.into(),
            Opcode::Unknown(byte) => byte,
        }
    }
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        if value == u8::from(OP_INVALIDOPCODE) {
            // from_u8 would also map 0xff, but unknown bytes and
            // OP_INVALIDOPCODE share the bad-opcode fate anyway.
            return Opcode::Operation(OP_INVALIDOPCODE);
        }
        PushValue::try_from(value).map_or_else(
            |()| {
                Operation::from_u8(value).map_or(Opcode::Unknown(value), Opcode::Operation)
            },
            Opcode::PushValue,
        )
    }
}

impl From<PushValue> for u8 {
    fn from(value: PushValue) -> Self {
        match value {
            PushdataBytelength(byte) => byte,
            OP_0 => 0x00,
            OP_PUSHDATA1 => 0x4c,
            OP_PUSHDATA2 => 0x4d,
            OP_PUSHDATA4 => 0x4e,
            OP_1NEGATE => 0x4f,
            OP_RESERVED => 0x50,
            OP_1 => 0x51,
            OP_2 => 0x52,
            OP_3 => 0x53,
            OP_4 => 0x54,
            OP_5 => 0x55,
            OP_6 => 0x56,
            OP_7 => 0x57,
            OP_8 => 0x58,
            OP_9 => 0x59,
            OP_10 => 0x5a,
            OP_11 => 0x5b,
            OP_12 => 0x5c,
            OP_13 => 0x5d,
            OP_14 => 0x5e,
            OP_15 => 0x5f,
            OP_16 => 0x60,
        }
    }
}

impl TryFrom<u8> for PushValue {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(OP_0),
            0x4c => Ok(OP_PUSHDATA1),
            0x4d => Ok(OP_PUSHDATA2),
            0x4e => Ok(OP_PUSHDATA4),
            0x4f => Ok(OP_1NEGATE),
            0x50 => Ok(OP_RESERVED),
            0x51 => Ok(OP_1),
            0x52 => Ok(OP_2),
            0x53 => Ok(OP_3),
            0x54 => Ok(OP_4),
            0x55 => Ok(OP_5),
            0x56 => Ok(OP_6),
            0x57 => Ok(OP_7),
            0x58 => Ok(OP_8),
            0x59 => Ok(OP_9),
            0x5a => Ok(OP_10),
            0x5b => Ok(OP_11),
            0x5c => Ok(OP_12),
            0x5d => Ok(OP_13),
            0x5e => Ok(OP_14),
            0x5f => Ok(OP_15),
            0x60 => Ok(OP_16),
            _ if value < 0x4c => Ok(PushdataBytelength(value)),
            _ => Err(()),
        }
    }
}

impl From<Operation> for u8 {
    fn from(value: Operation) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is
        // too much code smell.
        value as u8
    }
}

impl PushValue {
    /// Whether this opcode's pushed element is implied by the opcode byte
    /// itself. OP_0, OP_1..OP_16 and OP_1NEGATE carry no inline data.
    pub fn is_small_value(&self) -> bool {
        matches!(self, OP_0 | OP_1NEGATE) || (OP_1..=OP_16).contains(self)
    }

    /// Decode the small integer represented by OP_0/OP_1..OP_16.
    pub fn decode_op_n(&self) -> u32 {
        if *self == OP_0 {
            return 0;
        }
        assert!(*self >= OP_1 && *self <= OP_16);
        (u8::from(*self) - (u8::from(OP_1) - 1)).into()
    }
}

impl Opcode {
    /// The mnemonic for this opcode, or `None` for unassigned byte values and
    /// implicit-length pushes (which have no name of their own).
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Opcode::Unknown(_) | Opcode::PushValue(PushdataBytelength(_)) => None,
            Opcode::PushValue(pv) => Some(match pv {
                OP_0 => "OP_0",
                OP_PUSHDATA1 => "OP_PUSHDATA1",
                OP_PUSHDATA2 => "OP_PUSHDATA2",
                OP_PUSHDATA4 => "OP_PUSHDATA4",
                OP_1NEGATE => "OP_1NEGATE",
                OP_RESERVED => "OP_RESERVED",
                OP_1 => "OP_1",
                OP_2 => "OP_2",
                OP_3 => "OP_3",
                OP_4 => "OP_4",
                OP_5 => "OP_5",
                OP_6 => "OP_6",
                OP_7 => "OP_7",
                OP_8 => "OP_8",
                OP_9 => "OP_9",
                OP_10 => "OP_10",
                OP_11 => "OP_11",
                OP_12 => "OP_12",
                OP_13 => "OP_13",
                OP_14 => "OP_14",
                OP_15 => "OP_15",
                OP_16 => "OP_16",
                PushdataBytelength(_) => unreachable!(),
            }),
            Opcode::Operation(op) => Some(match op {
                OP_NOP => "OP_NOP",
                OP_VER => "OP_VER",
                OP_IF => "OP_IF",
                OP_NOTIF => "OP_NOTIF",
                OP_VERIF => "OP_VERIF",
                OP_VERNOTIF => "OP_VERNOTIF",
                OP_ELSE => "OP_ELSE",
                OP_ENDIF => "OP_ENDIF",
                OP_VERIFY => "OP_VERIFY",
                OP_RETURN => "OP_RETURN",
                OP_TOALTSTACK => "OP_TOALTSTACK",
                OP_FROMALTSTACK => "OP_FROMALTSTACK",
                OP_2DROP => "OP_2DROP",
                OP_2DUP => "OP_2DUP",
                OP_3DUP => "OP_3DUP",
                OP_2OVER => "OP_2OVER",
                OP_2ROT => "OP_2ROT",
                OP_2SWAP => "OP_2SWAP",
                OP_IFDUP => "OP_IFDUP",
                OP_DEPTH => "OP_DEPTH",
                OP_DROP => "OP_DROP",
                OP_DUP => "OP_DUP",
                OP_NIP => "OP_NIP",
                OP_OVER => "OP_OVER",
                OP_PICK => "OP_PICK",
                OP_ROLL => "OP_ROLL",
                OP_ROT => "OP_ROT",
                OP_SWAP => "OP_SWAP",
                OP_TUCK => "OP_TUCK",
                OP_CAT => "OP_CAT",
                OP_SPLIT => "OP_SPLIT",
                OP_NUM2BIN => "OP_NUM2BIN",
                OP_BIN2NUM => "OP_BIN2NUM",
                OP_SIZE => "OP_SIZE",
                OP_INVERT => "OP_INVERT",
                OP_AND => "OP_AND",
                OP_OR => "OP_OR",
                OP_XOR => "OP_XOR",
                OP_EQUAL => "OP_EQUAL",
                OP_EQUALVERIFY => "OP_EQUALVERIFY",
                OP_RESERVED1 => "OP_RESERVED1",
                OP_RESERVED2 => "OP_RESERVED2",
                OP_1ADD => "OP_1ADD",
                OP_1SUB => "OP_1SUB",
                OP_2MUL => "OP_2MUL",
                OP_2DIV => "OP_2DIV",
                OP_NEGATE => "OP_NEGATE",
                OP_ABS => "OP_ABS",
                OP_NOT => "OP_NOT",
                OP_0NOTEQUAL => "OP_0NOTEQUAL",
                OP_ADD => "OP_ADD",
                OP_SUB => "OP_SUB",
                OP_MUL => "OP_MUL",
                OP_DIV => "OP_DIV",
                OP_MOD => "OP_MOD",
                OP_LSHIFT => "OP_LSHIFT",
                OP_RSHIFT => "OP_RSHIFT",
                OP_BOOLAND => "OP_BOOLAND",
                OP_BOOLOR => "OP_BOOLOR",
                OP_NUMEQUAL => "OP_NUMEQUAL",
                OP_NUMEQUALVERIFY => "OP_NUMEQUALVERIFY",
                OP_NUMNOTEQUAL => "OP_NUMNOTEQUAL",
                OP_LESSTHAN => "OP_LESSTHAN",
                OP_GREATERTHAN => "OP_GREATERTHAN",
                OP_LESSTHANOREQUAL => "OP_LESSTHANOREQUAL",
                OP_GREATERTHANOREQUAL => "OP_GREATERTHANOREQUAL",
                OP_MIN => "OP_MIN",
                OP_MAX => "OP_MAX",
                OP_WITHIN => "OP_WITHIN",
                OP_RIPEMD160 => "OP_RIPEMD160",
                OP_SHA1 => "OP_SHA1",
                OP_SHA256 => "OP_SHA256",
                OP_HASH160 => "OP_HASH160",
                OP_HASH256 => "OP_HASH256",
                OP_CODESEPARATOR => "OP_CODESEPARATOR",
                OP_CHECKSIG => "OP_CHECKSIG",
                OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
                OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
                OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY",
                OP_NOP1 => "OP_NOP1",
                OP_NOP2 => "OP_CHECKLOCKTIMEVERIFY",
                OP_NOP3 => "OP_CHECKSEQUENCEVERIFY",
                OP_NOP4 => "OP_NOP4",
                OP_NOP5 => "OP_NOP5",
                OP_NOP6 => "OP_NOP6",
                OP_NOP7 => "OP_NOP7",
                OP_NOP8 => "OP_NOP8",
                OP_NOP9 => "OP_NOP9",
                OP_NOP10 => "OP_NOP10",
                OP_INVALIDOPCODE => "OP_INVALIDOPCODE",
            }),
        }
    }

    /// Look up an opcode byte by its mnemonic, with or without the `OP_`
    /// prefix. `OP_FALSE`/`OP_TRUE` and the NOP2/NOP3 spellings are accepted
    /// as aliases.
    pub fn byte_from_name(name: &str) -> Option<u8> {
        let canonical = match name.strip_prefix("OP_") {
            Some(rest) => rest,
            None => name,
        };
        match canonical {
            "FALSE" => return Some(0x00),
            "TRUE" => return Some(0x51),
            "NOP2" => return Some(u8::from(OP_NOP2)),
            "NOP3" => return Some(u8::from(OP_NOP3)),
            _ => {}
        }
        (0x00..=0xff).find(|byte| {
            Opcode::from(*byte)
                .name()
                .map_or(false, |n| &n[3..] == canonical)
        })
    }
}
