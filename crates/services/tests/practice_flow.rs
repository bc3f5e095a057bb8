use std::sync::Arc;

use services::{AppServices, Clock, SessionContext, SessionMode, SessionRequest};
use storage::bank::InMemoryQuestionBank;
use testmate_core::model::{
    AnswerKey, ProfileName, Question, QuestionRange, QuestionStatus, RepositoryRef, UserAnswer,
};
use testmate_core::time::fixed_now;

fn repo() -> RepositoryRef {
    RepositoryRef::new("Geo", "Europe", "Capitals").unwrap()
}

fn services() -> AppServices {
    let bank = InMemoryQuestionBank::new().with_repository(
        repo(),
        vec![
            Question::choice(
                "Capital of Spain?",
                vec!["Madrid".into(), "Lisbon".into()],
                AnswerKey::Index(1),
            ),
            Question::text("Capital of Italy?", "Rome"),
            Question::text("Capital of France?", "Paris").with_regex("^paris( city)?$"),
            Question::text("Capital of Austria?", "Vienna"),
        ],
    );
    AppServices::in_memory(Arc::new(bank), Clock::fixed(fixed_now()))
}

fn practice() -> SessionRequest {
    SessionRequest::new(SessionContext::new(
        repo(),
        ProfileName::default(),
        SessionMode::Practice,
    ))
}

#[tokio::test]
async fn practice_answers_are_tracked_by_repository_index() {
    let services = services();
    let loop_svc = services.test_loop();
    let practice = services.practice();

    let mut session = loop_svc
        .start_session(self::practice().with_range(Some(QuestionRange::new(2, 4).unwrap())))
        .await
        .unwrap();
    let progress = practice.load(&repo()).await.unwrap().expect("progress opened");
    assert_eq!(progress.question_range, QuestionRange::new(2, 4).unwrap());
    assert!(progress.answered_questions.is_empty());

    session.go_to(1).unwrap();
    session.set_text("Paris city").unwrap();
    assert!(loop_svc.submit(&mut session).await.unwrap());

    session.next().unwrap();
    session.set_text("Salzburg").unwrap();
    assert!(!loop_svc.submit(&mut session).await.unwrap());

    let progress = practice.load(&repo()).await.unwrap().unwrap();
    let keys: Vec<usize> = progress.answered_questions.keys().copied().collect();
    assert_eq!(keys, vec![2, 3]);
    assert_eq!(
        progress.answered_questions[&3].user_answer,
        UserAnswer::Text("Salzburg".into())
    );
    assert_eq!(progress.current_question_index, 3);

    let stats = practice.stats(&repo()).await.unwrap().unwrap();
    assert_eq!((stats.total_answered, stats.correct_answers), (2, 1));
    assert!((stats.accuracy - 50.0).abs() < f64::EPSILON);

    // Practice never files a result.
    loop_svc.finish(&mut session).await.unwrap();
    assert_eq!(loop_svc.persist_result(&mut session).await.unwrap(), None);
    assert!(
        services
            .results()
            .list(&ProfileName::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn practice_resumes_from_snapshot_and_tests_start_fresh() {
    let services = services();
    let loop_svc = services.test_loop();
    let profile = ProfileName::default();

    let mut first = loop_svc.start_session(practice()).await.unwrap();
    first.select_option(0).unwrap();
    loop_svc.submit(&mut first).await.unwrap();
    first.go_to(1).unwrap();
    first.set_text("Milan").unwrap();
    assert!(loop_svc.mark(&mut first, false).await.unwrap());
    loop_svc.finish(&mut first).await.unwrap();

    let resumed = loop_svc.start_session(practice()).await.unwrap();
    assert_eq!(resumed.status(0), Some(QuestionStatus::Correct));
    assert_eq!(resumed.status(1), Some(QuestionStatus::IncorrectPreviousAttempt));
    assert_eq!(resumed.status(2), Some(QuestionStatus::Unanswered));
    assert!(resumed.view().submitted);

    let windowed = loop_svc
        .start_session(practice().with_range(Some(QuestionRange::new(2, 2).unwrap())))
        .await
        .unwrap();
    assert_eq!(windowed.current_attempt().question_index, 0);
    assert_eq!(windowed.status(0), Some(QuestionStatus::IncorrectPreviousAttempt));
    assert_eq!(windowed.view().text, "Milan");

    let test = loop_svc
        .start_session(SessionRequest::new(SessionContext::new(
            repo(),
            profile.clone(),
            SessionMode::Test,
        )))
        .await
        .unwrap();
    assert!(test.attempts().iter().all(|a| a.skipped));

    // Another profile has its own snapshot.
    let other = loop_svc
        .start_session(SessionRequest::new(SessionContext::new(
            repo(),
            ProfileName::new("guest").unwrap(),
            SessionMode::Practice,
        )))
        .await
        .unwrap();
    assert_eq!(other.status(0), Some(QuestionStatus::Unanswered));

    assert!(loop_svc.clear_snapshot(&profile, &repo()).await.unwrap());
    let fresh = loop_svc.start_session(practice()).await.unwrap();
    assert!(fresh.attempts().iter().all(|a| a.skipped));
}
