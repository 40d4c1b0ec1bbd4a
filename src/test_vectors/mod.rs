//! Conformance vectors in the textual form `[sig_script, pub_key_script,
//! flags, expected]`, exercising the asm and flag-name parsers along with
//! the evaluator.

use lazy_static::lazy_static;

use crate::consensus::Network;
use crate::interpreter::{verify_script, BaseSignatureChecker, VerificationFlags};
use crate::script::Script;
use crate::script_error::ScriptError;

struct TestVector {
    sig: &'static str,
    pub_key: &'static str,
    flags: &'static str,
    expected: Result<(), ScriptError>,
}

const fn vector(
    sig: &'static str,
    pub_key: &'static str,
    flags: &'static str,
    expected: Result<(), ScriptError>,
) -> TestVector {
    TestVector {
        sig,
        pub_key,
        flags,
        expected,
    }
}

lazy_static! {
    static ref VECTORS: Vec<TestVector> = vec![
        // Trivial truths and falsehoods.
        vector("OP_1 OP_2", "OP_2 OP_EQUALVERIFY OP_1 OP_EQUAL", "NONE", Ok(())),
        vector("", "OP_DEPTH OP_0 OP_EQUAL", "NONE", Ok(())),
        vector("OP_1 OP_15", "OP_ADD OP_16 OP_EQUAL", "NONE", Ok(())),
        vector("", "1", "NONE", Ok(())),
        vector("", "0", "NONE", Err(ScriptError::EvalFalse)),
        vector("", "", "NONE", Err(ScriptError::EvalFalse)),
        vector("1", "", "NONE", Ok(())),
        // Negative zero is false.
        vector("", "0x01 0x80", "NONE", Err(ScriptError::EvalFalse)),
        vector("", "0x02 0x0080", "NONE", Err(ScriptError::EvalFalse)),
        vector("", "0x02 0x0180", "NONE", Ok(())),

        // Arithmetic.
        vector("2 3", "OP_ADD 5 OP_EQUAL", "NONE", Ok(())),
        vector("2 3", "OP_MUL 6 OP_EQUAL", "NONE", Ok(())),
        vector("-5", "OP_ABS 5 OP_EQUAL", "NONE", Ok(())),
        vector("5", "OP_NEGATE -5 OP_EQUAL", "NONE", Ok(())),
        vector("2 5 8", "OP_WITHIN", "NONE", Err(ScriptError::EvalFalse)),
        vector("5 2 8", "OP_WITHIN", "NONE", Ok(())),
        vector("8 2 8", "OP_WITHIN", "NONE", Err(ScriptError::EvalFalse)),
        vector("5 3", "OP_MIN 3 OP_EQUAL", "NONE", Ok(())),
        // Four-byte operands are the numeric limit; five bytes overflow.
        vector("2147483647", "OP_1ADD OP_DROP 1", "NONE", Ok(())),
        vector(
            "0x05 0x0000008000",
            "OP_1ADD",
            "NONE",
            Err(ScriptError::ScriptNumOverflow),
        ),
        // An oversized arithmetic result is pushable but not consumable.
        vector("2147483647 OP_DUP", "OP_ADD OP_DROP 1", "NONE", Ok(())),
        vector(
            "2147483647 OP_DUP",
            "OP_ADD 1 OP_ADD OP_DROP 1",
            "NONE",
            Err(ScriptError::ScriptNumOverflow),
        ),

        // Stack shuffling.
        vector("1 2 3", "OP_ROT OP_DROP OP_DROP OP_DROP OP_DEPTH 0 OP_EQUAL", "NONE", Ok(())),
        vector("1 0", "OP_SWAP", "NONE", Ok(())),
        vector("1 2", "OP_NIP 2 OP_EQUAL", "NONE", Ok(())),
        vector("0", "OP_IFDUP OP_DEPTH 1 OP_EQUAL", "NONE", Ok(())),
        vector("1", "OP_IFDUP OP_DEPTH 2 OP_EQUAL", "NONE", Ok(())),
        vector("1 2 3", "2 OP_PICK 1 OP_EQUAL", "NONE", Ok(())),
        vector("1 2 3", "2 OP_ROLL 1 OP_EQUAL", "NONE", Ok(())),
        vector("1 2", "5 OP_PICK", "NONE", Err(ScriptError::InvalidStackOperation)),

        // Conditionals.
        vector("1", "OP_IF OP_ELSE 0 OP_ENDIF OP_DEPTH 0 OP_EQUAL", "NONE", Ok(())),
        vector("0", "OP_NOTIF 1 OP_ENDIF", "NONE", Ok(())),
        vector("", "OP_ELSE", "NONE", Err(ScriptError::UnbalancedConditional)),
        vector("1", "OP_IF 1", "NONE", Err(ScriptError::UnbalancedConditional)),
        vector("0", "OP_IF OP_VERNOTIF OP_ENDIF 1", "NONE", Err(ScriptError::BadOpcode)),
        vector("0", "OP_IF 0xba OP_ENDIF 1", "NONE", Ok(())),
        vector("", "0xba", "NONE", Err(ScriptError::BadOpcode)),
        vector("", "OP_RESERVED", "NONE", Err(ScriptError::BadOpcode)),
        vector("0", "OP_IF OP_RESERVED OP_ENDIF 1", "NONE", Ok(())),

        // Byte strings.
        vector("'foo' 'bar'", "OP_CAT 'foobar' OP_EQUAL", "NONE", Ok(())),
        vector("'foobar' 3", "OP_SPLIT 'bar' OP_EQUALVERIFY 'foo' OP_EQUAL", "NONE", Ok(())),
        vector("'abc'", "OP_SIZE 3 OP_EQUALVERIFY 'abc' OP_EQUAL", "NONE", Ok(())),
        vector("0x01 0xff", "OP_INVERT 0x01 0x00 OP_EQUAL", "NONE", Ok(())),
        vector("0 4", "OP_NUM2BIN 0x04 0x00000000 OP_EQUAL", "NONE", Ok(())),
        vector("-1 2", "OP_NUM2BIN 0x02 0x0180 OP_EQUAL", "NONE", Ok(())),
        vector("0x02 0x0180", "OP_BIN2NUM -1 OP_EQUAL", "NONE", Ok(())),
        vector("0x04 0x02000000", "OP_BIN2NUM 2 OP_EQUAL", "NONE", Ok(())),

        // Policy flags.
        vector("1", "OP_NOP10 1", "DISCOURAGE_UPGRADABLE_NOPS", Err(ScriptError::DiscourageUpgradableNOPs)),
        vector("1 1", "OP_DROP", "CLEANSTACK", Ok(())),
        vector("1 1", "", "CLEANSTACK", Err(ScriptError::CleanStack)),
        vector("0x4c 0x01 0x07", "7 OP_EQUAL", "MINIMALDATA", Err(ScriptError::MinimalData)),
        vector("0x4c 0x01 0x07", "7 OP_EQUAL", "NONE", Ok(())),
        vector("0x01 0x07", "7 OP_EQUAL", "MINIMALDATA", Err(ScriptError::MinimalData)),
        vector("7", "7 OP_EQUAL", "MINIMALDATA", Ok(())),
        vector("1 OP_DUP", "OP_DROP", "SIGPUSHONLY", Err(ScriptError::SigPushOnly)),
        vector("2", "OP_IF 1 OP_ENDIF", "MINIMALIF", Err(ScriptError::MinimalIf)),

        // Signature shape checks with no real signatures involved.
        vector(
            "0x09 0x300602010102010105 0x21 0x020000000000000000000000000000000000000000000000000000000000000000",
            "OP_CHECKSIG",
            "STRICTENC",
            Err(ScriptError::SigHashType),
        ),
        vector(
            "0x09 0x300602010102010141 0x21 0x020000000000000000000000000000000000000000000000000000000000000000",
            "OP_CHECKSIG",
            "STRICTENC",
            Err(ScriptError::IllegalForkId),
        ),
        vector(
            "0x09 0x300602010102010141 0x02 0x0200",
            "OP_CHECKSIG",
            "STRICTENC,SIGHASH_FORKID",
            Err(ScriptError::PubKeyType),
        ),
        vector(
            "0x01 0x30 0x21 0x020000000000000000000000000000000000000000000000000000000000000000",
            "OP_CHECKSIG",
            "DERSIG",
            Err(ScriptError::SigDER),
        ),
    ];
}

#[test]
fn conformance_vectors() {
    for (i, v) in VECTORS.iter().enumerate() {
        let sig = Script::parse_asm(v.sig)
            .unwrap_or_else(|e| panic!("vector {}: bad sig script: {}", i, e));
        let pub_key = Script::parse_asm(v.pub_key)
            .unwrap_or_else(|e| panic!("vector {}: bad pub_key script: {}", i, e));
        let flags = VerificationFlags::from_names(v.flags)
            .unwrap_or_else(|e| panic!("vector {}: {}", i, e));
        let result = verify_script(
            &sig,
            &pub_key,
            flags,
            Network::Main.params(),
            &BaseSignatureChecker(),
        );
        assert_eq!(
            result, v.expected,
            "vector {}: [{} | {} | {}]",
            i, v.sig, v.pub_key, v.flags
        );
    }
}
