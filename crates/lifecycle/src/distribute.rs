//! Bulk exam-to-class distribution.
//!
//! Produces exactly one exam per class: the exam list is randomly permuted,
//! dealt round-robin across the classes (so every exam is used at least
//! once when counts match, and repeats cyclically when classes outnumber
//! exams), and the final assignment list is shuffled once more so creation
//! order does not reveal the dealing pattern. Deliberately unseeded — this
//! is a fairness heuristic, not an auditable draw.

use rand::seq::SliceRandom;
use rand::Rng;

use proctor_core::{ClassId, ExamId};

/// Assign one exam to each class.
///
/// Callers validate `exam_ids.len() <= class_ids.len()` and non-emptiness
/// beforehand; see `AssignmentService::bulk_create`.
pub fn distribute_exams<R: Rng + ?Sized>(
    exam_ids: &[ExamId],
    class_ids: &[ClassId],
    rng: &mut R,
) -> Vec<(ClassId, ExamId)> {
    let mut deck = exam_ids.to_vec();
    deck.shuffle(rng);

    let mut assignments: Vec<(ClassId, ExamId)> = class_ids
        .iter()
        .enumerate()
        .map(|(i, &class_id)| (class_id, deck[i % deck.len()]))
        .collect();

    assignments.shuffle(rng);
    assignments
}
