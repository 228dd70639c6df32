//! Annotating observed positions with their place in an external reference.

use crate::metrics::{PerBaseTable, UNALIGNED_REF};
use bio::alignment::{AlignmentOperation, pairwise::Aligner};

const MATCH_SCORE: i32 = 1;
const MISMATCH_SCORE: i32 = 0;
const GAP_OPEN: i32 = 0;
const GAP_EXTEND: i32 = 0;

/// Per observed position: the aligned reference text and a mismatch flag.
pub type AlignedPosition = (String, u8);

/// Globally aligns the observed `ref` column against `reference`, maximizing
/// the number of matching bases.
///
/// Among equally good alignments the first one produced by the traceback is
/// used. Returns `None` when either sequence is empty.
pub fn align_sequences(observed: &[u8], reference: &[u8]) -> Option<Vec<AlignedPosition>> {
    if observed.is_empty() || reference.is_empty() {
        return None;
    }
    let observed = observed.to_ascii_uppercase();
    let reference = reference.to_ascii_uppercase();

    let score = |a: u8, b: u8| if a == b { MATCH_SCORE } else { MISMATCH_SCORE };
    let mut aligner = Aligner::with_capacity(
        observed.len(),
        reference.len(),
        GAP_OPEN,
        GAP_EXTEND,
        &score,
    );
    let alignment = aligner.global(&observed, &reference);

    let mut ret = Vec::with_capacity(observed.len());
    let mut ref_pos = 0;
    for op in &alignment.operations {
        match op {
            AlignmentOperation::Match => {
                ret.push(((reference[ref_pos] as char).to_string(), 0));
                ref_pos += 1;
            }
            AlignmentOperation::Subst => {
                ret.push((format!("[{}]", reference[ref_pos] as char), 1));
                ref_pos += 1;
            }
            // Observed base facing a gap in the reference
            AlignmentOperation::Ins => ret.push((UNALIGNED_REF.to_string(), 1)),
            AlignmentOperation::Del => ref_pos += 1,
            AlignmentOperation::Xclip(n) => {
                ret.extend((0..*n).map(|_| (UNALIGNED_REF.to_string(), 1)));
            }
            AlignmentOperation::Yclip(n) => ref_pos += n,
        }
    }

    if ret.len() != observed.len() {
        log::warn!(
            "alignment covers {} of {} observed positions",
            ret.len(),
            observed.len()
        );
        return None;
    }
    Some(ret)
}

/// Fills `aligned_ref` and `alignment_mismatch` of every row.
///
/// Without a reference, or when the alignment cannot be made, the rows keep
/// their placeholder values.
pub fn align_reference(table: &mut PerBaseTable, reference: Option<&str>) {
    let Some(reference) = reference else {
        return;
    };
    let observed = table.ref_sequence();
    let Some(aligned) = align_sequences(observed.as_bytes(), reference.as_bytes()) else {
        return;
    };

    let mut mismatches = 0;
    for (row, (aligned_ref, mismatch)) in table.rows_mut().iter_mut().zip(aligned) {
        mismatches += mismatch as usize;
        row.aligned_ref = aligned_ref;
        row.alignment_mismatch = mismatch;
    }
    log::debug!("aligned {} positions to reference, {mismatches} mismatched", observed.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{TransformOptions, tests::position};

    fn table_for(sequence: &str) -> PerBaseTable {
        let positions: Vec<_> = sequence
            .chars()
            .enumerate()
            .map(|(i, base)| position(i as u64 + 1, base, [10, 10, 10, 10]))
            .collect();
        PerBaseTable::from_positions(&positions, &TransformOptions::default())
    }

    fn mismatches(table: &PerBaseTable) -> Vec<u8> {
        table.rows().iter().map(|r| r.alignment_mismatch).collect()
    }

    #[test]
    fn test_identical_sequences() {
        let mut table = table_for("ACGTACGT");
        align_reference(&mut table, Some("acgtacgt"));
        assert_eq!(mismatches(&table), vec![0; 8]);
        let aligned: String = table.rows().iter().map(|r| r.aligned_ref.as_str()).collect();
        assert_eq!(aligned, "ACGTACGT");
    }

    #[test]
    fn test_single_difference_is_flagged() {
        let mut table = table_for("ACGTACGT");
        align_reference(&mut table, Some("ACGTTCGT"));
        assert_eq!(mismatches(&table), vec![0, 0, 0, 0, 1, 0, 0, 0]);
        let fifth = &table.rows()[4].aligned_ref;
        assert!(fifth == "[T]" || fifth == "-", "{fifth}");
        assert_eq!(table.rows()[5].aligned_ref, "C");
    }

    #[test]
    fn test_extra_observed_position() {
        let mut table = table_for("ACGGTT");
        align_reference(&mut table, Some("ACGTT"));
        assert_eq!(mismatches(&table).iter().map(|m| *m as u32).sum::<u32>(), 1);
        assert_eq!(table.rows()[0].aligned_ref, "A");
        assert_eq!(table.rows()[5].aligned_ref, "T");
    }

    #[test]
    fn test_missing_reference_keeps_placeholders() {
        let mut table = table_for("ACGT");
        let before = table.clone();
        align_reference(&mut table, None);
        assert_eq!(table, before);
        align_reference(&mut table, Some(""));
        assert_eq!(table, before);
        assert!(table.rows().iter().all(|r| r.aligned_ref == "-" && r.alignment_mismatch == 0));
    }
}
