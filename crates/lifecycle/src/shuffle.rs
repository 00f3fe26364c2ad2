//! Deterministic per-student question ordering.
//!
//! Pure function of `(assignment_id, student_id, questions)`: a reloaded
//! exam page must show the same order, while two students in the same room
//! see different orders with overwhelming probability. The seed mixes both
//! identities, so no student can derive a classmate's order from their own.

use uuid::Uuid;

use proctor_core::{RoomId, StudentId};

/// Fold a UUID into a stable 64-bit value (XOR of its two halves).
fn uuid_seed(id: Uuid) -> u64 {
    let bits = id.as_u128();
    (bits >> 64) as u64 ^ bits as u64
}

/// 32-bit linear congruential generator (Numerical Recipes constants).
struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed as u32 }
    }

    fn next(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state
    }
}

/// Produce the question order for one student in one room.
///
/// Fisher–Yates driven by an LCG seeded from both identities:
/// `seed = (assignment·31 + student·37)·1009 + 2017`.
pub fn shuffle_questions<T: Clone>(
    assignment_id: RoomId,
    student_id: StudentId,
    questions: &[T],
) -> Vec<T> {
    let a = uuid_seed(assignment_id);
    let s = uuid_seed(student_id);
    let seed = a
        .wrapping_mul(31)
        .wrapping_add(s.wrapping_mul(37))
        .wrapping_mul(1009)
        .wrapping_add(2017);

    let mut rng = Lcg::new(seed);
    let mut out = questions.to_vec();
    for i in (1..out.len()).rev() {
        let j = (rng.next() as usize) % (i + 1);
        out.swap(i, j);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn same_pair_same_order() {
        let room = Uuid::new_v4();
        let student = Uuid::new_v4();
        let q = questions(25);

        let first = shuffle_questions(room, student, &q);
        let second = shuffle_questions(room, student, &q);
        assert_eq!(first, second);
    }

    #[test]
    fn different_students_diverge() {
        let room = Uuid::new_v4();
        let q = questions(25);

        let mut distinct = std::collections::HashSet::new();
        for _ in 0..20 {
            distinct.insert(shuffle_questions(room, Uuid::new_v4(), &q));
        }
        // 20 students over 25! permutations; any collision would be a bug
        // in the seed mixing.
        assert!(distinct.len() >= 19);
    }

    #[test]
    fn output_is_a_permutation() {
        let shuffled = shuffle_questions(Uuid::new_v4(), Uuid::new_v4(), &questions(50));
        let mut sorted = shuffled.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, questions(50));
    }

    #[test]
    fn trivial_inputs_pass_through() {
        let room = Uuid::new_v4();
        let student = Uuid::new_v4();
        assert!(shuffle_questions::<usize>(room, student, &[]).is_empty());
        assert_eq!(shuffle_questions(room, student, &[7]), vec![7]);
    }

    #[test]
    fn room_identity_matters_too() {
        let student = Uuid::new_v4();
        let q = questions(25);
        let a = shuffle_questions(Uuid::new_v4(), student, &q);
        let b = shuffle_questions(Uuid::new_v4(), student, &q);
        assert_ne!(a, b);
    }
}
