use ebu_core::{
    open_db_in_memory, LifecycleAction, Partition, Question, QuestionListQuery, QuestionService,
    RepoError, SqliteQuestionRepository, Subject,
};

fn trash_query() -> QuestionListQuery {
    QuestionListQuery {
        partition: Partition::Trashed,
        ..QuestionListQuery::default()
    }
}

#[test]
fn soft_delete_then_restore_round_trips() {
    let conn = open_db_in_memory().unwrap();
    let service = QuestionService::new(SqliteQuestionRepository::try_new(&conn).unwrap());

    let created = service
        .create_question(&Question::new("题目", "解析", "", Subject::Chemistry, 2))
        .unwrap();

    service.soft_delete(&created.id).unwrap();
    let trashed = service.get_question(&created.id).unwrap();
    assert_eq!(trashed.partition(), Partition::Trashed);
    assert!(trashed.deleted_at.unwrap() >= created.created_at);

    let active = service
        .list_questions(&QuestionListQuery::default())
        .unwrap();
    assert_eq!(active.total, 0);
    let trash = service.list_questions(&trash_query()).unwrap();
    assert_eq!(trash.total, 1);
    assert_eq!(trash.items[0].id, created.id);

    service.restore(&created.id).unwrap();
    let restored = service.get_question(&created.id).unwrap();
    assert_eq!(restored, created);
    assert_eq!(service.list_questions(&trash_query()).unwrap().total, 0);
}

#[test]
fn soft_delete_of_trashed_question_restamps() {
    let conn = open_db_in_memory().unwrap();
    let service = QuestionService::new(SqliteQuestionRepository::try_new(&conn).unwrap());
    let created = service
        .create_question(&Question::new("题目", "解析", "", Subject::Math, 1))
        .unwrap();

    service.soft_delete(&created.id).unwrap();
    service.soft_delete(&created.id).unwrap();
    assert!(!service.get_question(&created.id).unwrap().is_active());

    service.restore(&created.id).unwrap();
    service.restore(&created.id).unwrap();
    assert!(service.get_question(&created.id).unwrap().is_active());
}

#[test]
fn hard_delete_removes_from_both_partitions() {
    let conn = open_db_in_memory().unwrap();
    let service = QuestionService::new(SqliteQuestionRepository::try_new(&conn).unwrap());

    let active = service
        .create_question(&Question::new("留在列表", "解析", "", Subject::Math, 1))
        .unwrap();
    let trashed = service
        .create_question(&Question::new("先进回收站", "解析", "", Subject::Math, 1))
        .unwrap();
    service.soft_delete(&trashed.id).unwrap();

    service.hard_delete(&active.id).unwrap();
    service.apply(&trashed.id, LifecycleAction::HardDelete).unwrap();

    for id in [&active.id, &trashed.id] {
        assert!(matches!(
            service.get_question(id),
            Err(RepoError::NotFound(_))
        ));
    }
    assert_eq!(
        service
            .list_questions(&QuestionListQuery::default())
            .unwrap()
            .total,
        0
    );
    assert_eq!(service.list_questions(&trash_query()).unwrap().total, 0);
}

#[test]
fn lifecycle_on_missing_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = QuestionService::new(SqliteQuestionRepository::try_new(&conn).unwrap());

    for action in [
        LifecycleAction::SoftDelete,
        LifecycleAction::Restore,
        LifecycleAction::HardDelete,
    ] {
        match service.apply("does-not-exist", action) {
            Err(RepoError::NotFound(id)) => assert_eq!(id, "does-not-exist"),
            other => panic!("{action}: unexpected result {other:?}"),
        }
    }
}

#[test]
fn hard_delete_is_terminal() {
    let conn = open_db_in_memory().unwrap();
    let service = QuestionService::new(SqliteQuestionRepository::try_new(&conn).unwrap());
    let created = service
        .create_question(&Question::new("题目", "解析", "", Subject::English, 4))
        .unwrap();

    service.hard_delete(&created.id).unwrap();
    assert!(matches!(
        service.restore(&created.id),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        service.hard_delete(&created.id),
        Err(RepoError::NotFound(_))
    ));
}
