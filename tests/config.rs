use std::path::PathBuf;
use std::time::Duration;

use assert_matches::assert_matches;

use cnpj_enrich::config::ConfigLoader;
use cnpj_enrich::error::EnrichError;

#[test]
fn load_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("cnpj-enrich.json");
    std::fs::write(
        &path,
        r#"{
            "input": "planilhas/empresas.xlsx",
            "output": "planilhas/empresas_out.xlsx",
            "delay_secs": 20,
            "checkpoint_every": 5,
            "backoff_base_ms": 250
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.input, PathBuf::from("planilhas/empresas.xlsx"));
    assert_eq!(resolved.checkpoint, PathBuf::from("planilhas/checkpoint.json"));
    assert_eq!(resolved.delay, Duration::from_secs(20));
    assert_eq!(resolved.checkpoint_every, 5);
    assert_eq!(resolved.retry.backoff(2), Duration::from_millis(500));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, EnrichError::ConfigRead(_));
}

#[test]
fn malformed_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("cnpj-enrich.json");
    std::fs::write(&path, "{\"delay_secs\": \"soon\"}").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, EnrichError::ConfigParse(_));
}
