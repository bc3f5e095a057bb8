use crate::model::QuestionAttempt;

/// Percentage of correct answers rounded to the nearest integer.
///
/// Returns 0 when `total` is zero. Halves round up.
#[must_use]
pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u128;
    let total = total as u128;
    // round(correct * 100 / total) without floating point
    let pct = (correct * 200 + total) / (total * 2);
    u32::try_from(pct).unwrap_or(100)
}

/// Counts over a set of question attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptTally {
    pub answered: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub skipped: usize,
    pub total: usize,
}

impl AttemptTally {
    #[must_use]
    pub fn from_attempts(attempts: &[QuestionAttempt]) -> Self {
        attempts.iter().fold(
            Self {
                total: attempts.len(),
                ..Self::default()
            },
            |mut tally, a| {
                if a.skipped {
                    tally.skipped += 1;
                } else {
                    tally.answered += 1;
                    if a.correct {
                        tally.correct += 1;
                    } else {
                        tally.incorrect += 1;
                    }
                }
                tally
            },
        )
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        score_percent(self.correct, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(score_percent(0, 0), 0);
        assert_eq!(score_percent(1, 3), 33);
        assert_eq!(score_percent(2, 3), 67);
        assert_eq!(score_percent(1, 8), 13);
        assert_eq!(score_percent(3, 3), 100);
        assert_eq!(score_percent(7, 9), 78);
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(score_percent(1, 40), 3);
        assert_eq!(score_percent(3, 40), 8);
        assert_eq!(score_percent(1, 200), 1);
    }

    #[test]
    fn tally_counts_each_bucket() {
        let mut right = QuestionAttempt::unanswered(0);
        right.skipped = false;
        right.correct = true;
        let mut wrong = QuestionAttempt::unanswered(1);
        wrong.skipped = false;
        let skipped = QuestionAttempt::unanswered(2);

        let tally = AttemptTally::from_attempts(&[right, wrong, skipped]);
        assert_eq!(
            tally,
            AttemptTally {
                answered: 2,
                correct: 1,
                incorrect: 1,
                skipped: 1,
                total: 3,
            }
        );
        assert_eq!(tally.score(), 33);
    }
}
