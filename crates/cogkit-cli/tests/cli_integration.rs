//! Integration tests for the `cogkit` command line entry point.

use std::io::Write;

use cogkit_cli::{load_settings, run};
use cogkit_core::CogError;

fn settings_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_settings_from_toml() {
    let file = settings_file(".toml", "[template]\nrender_timeout_ms = 900\n");
    let settings = load_settings(Some(file.path())).unwrap();
    assert_eq!(settings.template.render_timeout_ms, 900);
    assert_eq!(settings.template.max_range, 100_000);
}

#[test]
fn test_load_settings_from_json() {
    let file = settings_file(".json", r#"{"template": {"max_output_len": 64}}"#);
    let settings = load_settings(Some(file.path())).unwrap();
    assert_eq!(settings.template.max_output_len, 64);
}

#[test]
fn test_load_settings_rejects_unknown_extension() {
    let file = settings_file(".yaml", "debug: true\n");
    let err = load_settings(Some(file.path())).unwrap_err();
    assert!(matches!(err, CogError::ConfigurationError(_)));
}

#[tokio::test]
async fn test_run_render() {
    let result = run([
        "cogkit",
        "render",
        "--template",
        "{{ username }}",
        "--context",
        r#"{"username": "amy"}"#,
    ])
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_run_with_settings_file() {
    let file = settings_file(".toml", "[template]\nmax_output_len = 3\n");
    let path = file.path().to_str().unwrap().to_string();

    let ok = run(["cogkit", "render", "-t", "abc", "--settings", path.as_str()]).await;
    assert!(ok.is_ok());

    let err = run(["cogkit", "render", "-t", "abcd", "--settings", path.as_str()])
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_run_check_reports_syntax_error() {
    let err = run(["cogkit", "check", "--template", "{% if x %}"]).await.unwrap_err();
    let CogError::Render(render_err) = err else {
        panic!("expected a render error");
    };
    assert!(render_err.user_message().contains("expected '{% endif %}'"));
}

#[tokio::test]
async fn test_run_preview() {
    assert!(run(["cogkit", "preview", "-t", "{{ dupenum }}", "--count", "2"]).await.is_ok());
}

#[tokio::test]
async fn test_run_usage_errors() {
    for args in [
        vec!["cogkit"],
        vec!["cogkit", "bogus"],
        vec!["cogkit", "render"],
        vec!["cogkit", "preview", "-t", "x", "--count", "many"],
    ] {
        let err = run(args.clone()).await.unwrap_err();
        assert!(matches!(err, CogError::UsageError(_)), "{args:?}: {err:?}");
        assert_eq!(err.exit_code(), 2);
    }
}

#[tokio::test]
async fn test_run_help_is_not_an_error() {
    assert!(run(["cogkit", "--help"]).await.is_ok());
}
