use ebu_core::backup::BACKUP_FORMAT_VERSION;
use ebu_core::{
    export_backup, import_backup_json, open_db_in_memory, BackupError, Question,
    QuestionRepository, SqliteQuestionRepository, Subject,
};
use std::collections::HashSet;

#[test]
fn export_includes_both_partitions() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteQuestionRepository::try_new(&conn).unwrap();

    let active = Question::new("活跃题", "解析", "", Subject::Math, 1);
    let trashed = Question::new("回收站题", "解析", "", Subject::Biology, 2);
    repo.create_question(&active).unwrap();
    repo.create_question(&trashed).unwrap();
    repo.set_deleted_at(&trashed.id, 42).unwrap();

    let backup = export_backup(&repo).unwrap();
    assert_eq!(backup.version, BACKUP_FORMAT_VERSION);
    assert!(backup.exported_at > 0);
    let exported = backup
        .data
        .iter()
        .map(|question| question.id.clone())
        .collect::<HashSet<_>>();
    assert_eq!(
        exported,
        [active.id.clone(), trashed.id.clone()]
            .into_iter()
            .collect::<HashSet<_>>()
    );
}

#[test]
fn import_replaces_store_with_fresh_ids() {
    let source_conn = open_db_in_memory().unwrap();
    let source = SqliteQuestionRepository::try_new(&source_conn).unwrap();
    let mut original = Question::new("导出的题", "解析", "指南", Subject::Physics, 4);
    original.knowledge_points = vec!["牛顿第二定律".to_string()];
    source.create_question(&original).unwrap();
    let json = serde_json::to_string(&export_backup(&source).unwrap()).unwrap();

    let target_conn = open_db_in_memory().unwrap();
    let target = SqliteQuestionRepository::try_new(&target_conn).unwrap();
    let stale = Question::new("旧数据", "解析", "", Subject::Math, 1);
    target.create_question(&stale).unwrap();

    assert_eq!(import_backup_json(&target, &json).unwrap(), 1);

    let all = target.list_all().unwrap();
    assert_eq!(all.len(), 1);
    let imported = &all[0];
    assert_ne!(imported.id, original.id);
    assert_eq!(imported.content, original.content);
    assert_eq!(imported.knowledge_points, original.knowledge_points);
    assert_eq!(imported.created_at, original.created_at);
    assert!(target.get_question(&stale.id).unwrap().is_none());
}

#[test]
fn invalid_document_leaves_store_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteQuestionRepository::try_new(&conn).unwrap();
    let kept = Question::new("保留", "解析", "", Subject::Math, 1);
    repo.create_question(&kept).unwrap();

    let err = import_backup_json(&repo, "{\"version\":\"1.2.0\"").unwrap_err();
    assert!(matches!(err, BackupError::Json(_)));

    let invalid_record = r#"{
        "version": "1.2.0",
        "exportedAt": 1700000000,
        "data": [{
            "id": "x",
            "content": "ok",
            "analysis": "",
            "subject": "数学",
            "difficulty": 9,
            "createdAt": 1
        }]
    }"#;
    let err = import_backup_json(&repo, invalid_record).unwrap_err();
    assert!(matches!(err, BackupError::Repo(_)));

    assert!(repo.get_question(&kept.id).unwrap().is_some());
}

#[test]
fn unknown_subject_in_backup_imports_as_other() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteQuestionRepository::try_new(&conn).unwrap();

    let document = r#"{
        "version": "1.2.0",
        "exportedAt": 1700000000,
        "data": [{
            "id": "x",
            "content": "恒星的光谱分类",
            "analysis": "",
            "subject": "天文",
            "difficulty": 2,
            "createdAt": 1
        }]
    }"#;
    assert_eq!(import_backup_json(&repo, document).unwrap(), 1);

    let all = repo.list_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].subject, Subject::Other);
    assert_eq!(all[0].content, "恒星的光谱分类");
}
