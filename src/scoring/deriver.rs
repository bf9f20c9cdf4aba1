use crate::models::{
    AnswerMap, AttendanceStatus, PassFail, QuestionSet, QuizOutcome, TerminationReason,
};
use crate::scoring::config::QuizRules;

/// Count of questions whose recorded answer equals the correct index.
/// Unanswered questions never count.
pub fn compute_score(questions: &QuestionSet, answers: &AnswerMap) -> u32 {
    questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| answers.get(idx) == Some(&q.correct_index))
        .count() as u32
}

pub fn attendance_for(score: u32, rules: &QuizRules) -> AttendanceStatus {
    if score >= rules.attendance_threshold {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Absent
    }
}

pub fn pass_fail_for(score: u32, rules: &QuizRules) -> PassFail {
    if score >= rules.pass_threshold {
        PassFail::Pass
    } else {
        PassFail::Fail
    }
}

/// Full outcome for a finished attempt. Deterministic in its inputs.
pub fn evaluate(
    questions: &QuestionSet,
    answers: &AnswerMap,
    rules: &QuizRules,
    reason: TerminationReason,
) -> QuizOutcome {
    let score = compute_score(questions, answers);

    QuizOutcome {
        score,
        total: questions.len() as u32,
        attendance_status: attendance_for(score, rules),
        pass_fail: pass_fail_for(score, rules),
        termination_reason: reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;

    fn set(correct: &[usize]) -> QuestionSet {
        let questions = correct
            .iter()
            .map(|&ans| Question::new("q", ["a", "b", "c", "d"], ans))
            .collect::<Vec<_>>();
        QuestionSet::new(questions, correct.len()).unwrap()
    }

    #[test]
    fn counts_only_matching_answers() {
        let questions = set(&[1, 1, 2]);
        let answers = AnswerMap::from([(0, 1), (1, 0), (2, 2)]);
        assert_eq!(compute_score(&questions, &answers), 2);
    }

    #[test]
    fn unanswered_questions_are_wrong() {
        let questions = set(&[0, 0, 0]);
        assert_eq!(compute_score(&questions, &AnswerMap::new()), 0);

        let answers = AnswerMap::from([(2, 0)]);
        assert_eq!(compute_score(&questions, &answers), 1);
    }

    #[test]
    fn answers_outside_the_set_are_ignored() {
        let questions = set(&[0]);
        let answers = AnswerMap::from([(0, 0), (5, 0)]);
        assert_eq!(compute_score(&questions, &answers), 1);
    }

    #[test]
    fn derives_attendance_and_pass_from_thresholds() {
        let rules = QuizRules::default();
        let cases = [
            (20, AttendanceStatus::Present, PassFail::Pass),
            (16, AttendanceStatus::Present, PassFail::Pass),
            (15, AttendanceStatus::Absent, PassFail::Pass),
            (12, AttendanceStatus::Absent, PassFail::Pass),
            (11, AttendanceStatus::Absent, PassFail::Fail),
            (0, AttendanceStatus::Absent, PassFail::Fail),
        ];
        for (score, attendance, pass) in cases {
            assert_eq!(attendance_for(score, &rules), attendance, "score {score}");
            assert_eq!(pass_fail_for(score, &rules), pass, "score {score}");
        }
    }

    #[test]
    fn custom_thresholds_are_honored() {
        let rules = QuizRules {
            attendance_threshold: 2,
            pass_threshold: 1,
            ..QuizRules::default()
        };
        assert_eq!(attendance_for(2, &rules), AttendanceStatus::Present);
        assert_eq!(pass_fail_for(1, &rules), PassFail::Pass);
        assert_eq!(pass_fail_for(0, &rules), PassFail::Fail);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let questions = set(&[1, 1, 2]);
        let answers = AnswerMap::from([(0, 1), (1, 0), (2, 2)]);
        let rules = QuizRules::default();

        let first = evaluate(&questions, &answers, &rules, TerminationReason::TimedOut);
        let second = evaluate(&questions, &answers, &rules, TerminationReason::TimedOut);
        assert_eq!(first, second);
        assert_eq!(first.score, 2);
        assert_eq!(first.total, 3);
    }
}
