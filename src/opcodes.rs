//! Megakernel opcode names.

use std::borrow::Cow;

const OPCODE_NAMES: &[(i64, &str)] = &[
    (1, "RMS_QKV_MatVecRopeAppend"),
    (2, "PartialAttention"),
    (3, "AttentionReduction"),
    (4, "O_ProjResidual"),
    (5, "RMS_DoubleMatVecSiLU"),
    (6, "DownProjResidual"),
    (7, "RMS_LM_Head"),
];

/// Operation name for `opcode`, or `Op<opcode>` when it is not registered.
pub fn operation_name(opcode: i64) -> Cow<'static, str> {
    OPCODE_NAMES
        .iter()
        .find(|(code, _)| *code == opcode)
        .map(|(_, name)| Cow::Borrowed(*name))
        .unwrap_or_else(|| Cow::Owned(format!("Op{opcode}")))
}

pub fn known_opcodes() -> impl Iterator<Item = (i64, &'static str)> {
    OPCODE_NAMES.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_opcode_resolves() {
        assert_eq!(operation_name(3), "AttentionReduction");
        assert_eq!(operation_name(7), "RMS_LM_Head");
    }

    #[test]
    fn unknown_opcodes_get_placeholder() {
        assert_eq!(operation_name(99), "Op99");
        assert_eq!(operation_name(0), "Op0");
        assert_eq!(operation_name(-4), "Op-4");
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        let mut codes: Vec<i64> = known_opcodes().map(|(c, _)| c).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), OPCODE_NAMES.len());
    }
}
