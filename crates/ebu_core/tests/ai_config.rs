use ebu_core::{
    open_db, open_db_in_memory, AiConfig, AiConfigRepository, AiConfigView, AiProviderType,
    DbError, RepoError, SqliteAiConfigRepository,
};
use rusqlite::Connection;

fn row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM ai_configs;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn startup_seeds_default_config() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAiConfigRepository::new(&conn);

    let config = repo.get_config().unwrap();
    assert_eq!(config.provider, AiProviderType::Gemini);
    assert!(config.api_key.is_none());
    assert!(config.config_data.is_none());
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn reopening_does_not_seed_a_second_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ebu.db");

    drop(open_db(&path).unwrap());
    let conn = open_db(&path).unwrap();
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn save_updates_the_singleton_in_place() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAiConfigRepository::new(&conn);

    repo.save_config(&AiConfig {
        provider: AiProviderType::Qwen,
        api_key: Some("sk-test".to_string()),
        model_name: Some("qwen-max".to_string()),
        ..AiConfig::default()
    })
    .unwrap();
    repo.save_config(&AiConfig {
        provider: AiProviderType::OpenAi,
        base_url: Some("https://api.example.com/v1".to_string()),
        ..AiConfig::default()
    })
    .unwrap();

    assert_eq!(row_count(&conn), 1);
    let config = repo.get_config().unwrap();
    assert_eq!(config.provider, AiProviderType::OpenAi);
    assert_eq!(config.base_url.as_deref(), Some("https://api.example.com/v1"));
    assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.model_name.as_deref(), Some("qwen-max"));
}

#[test]
fn schema_rejects_a_second_row() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute("INSERT INTO ai_configs (id, type) VALUES (2, 'QWEN');", []);
    assert!(result.is_err());
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn save_recreates_row_when_missing() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("DELETE FROM ai_configs;", []).unwrap();
    let repo = SqliteAiConfigRepository::new(&conn);

    assert!(matches!(
        repo.get_config(),
        Err(RepoError::Db(DbError::MissingAiConfig))
    ));

    repo.save_config(&AiConfig {
        provider: AiProviderType::Doubao,
        ..AiConfig::default()
    })
    .unwrap();
    assert_eq!(repo.get_config().unwrap().provider, AiProviderType::Doubao);
    assert_eq!(row_count(&conn), 1);
}

#[test]
fn custom_provider_round_trips() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAiConfigRepository::new(&conn);

    let provider = AiProviderType::Custom("custom-1700000000".to_string());
    repo.save_config(&AiConfig {
        provider: provider.clone(),
        ..AiConfig::default()
    })
    .unwrap();
    assert_eq!(repo.get_config().unwrap().provider, provider);
}

#[test]
fn view_switches_to_blob_once_config_data_is_saved() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAiConfigRepository::new(&conn);

    repo.save_config(&AiConfig {
        api_key: Some("sk-hidden".to_string()),
        system_prompt: Some("你是一位耐心的老师".to_string()),
        ..AiConfig::default()
    })
    .unwrap();
    match repo.get_config().unwrap().view() {
        AiConfigView::Legacy {
            provider,
            system_prompt,
            ..
        } => {
            assert_eq!(provider, AiProviderType::Gemini);
            assert_eq!(system_prompt.as_deref(), Some("你是一位耐心的老师"));
        }
        other => panic!("unexpected view: {other:?}"),
    }
    let legacy_json = serde_json::to_string(&repo.get_config().unwrap().view()).unwrap();
    assert!(!legacy_json.contains("sk-hidden"));

    let blob = r#"{"activeProvider":"QWEN","providers":[]}"#;
    repo.save_config(&AiConfig {
        config_data: Some(blob.to_string()),
        ..AiConfig::default()
    })
    .unwrap();
    assert_eq!(
        repo.get_config().unwrap().view(),
        AiConfigView::Blob {
            config_data: blob.to_string()
        }
    );
}
