//! Integration tests for the promptkit CLI.
//!
//! Runs each subcommand of the built binary against manifests and registry
//! files written to a temporary directory.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

const MANIFEST: &str = r#"
name = "simple"
source = "{{ bos }}{{ query }} ({{ tone }}){{ eos }}"

[[params]]
name = "query"

[[params]]
name = "tone"
default = "neutral"

[variants]
"acme/variant" = "variant: {{ query }}"
"#;

const MODELS: &str = r#"
[models."acme/variant"]
bos = "<v>"

[models."acme/chat"]
[models."acme/chat".system]
begin = "<sys>"
end = "</sys>"
[models."acme/chat".user]
begin = "<usr>"
end = "</usr>"
"#;

fn promptkit(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_promptkit"))
        .args(args)
        .output()?)
}

fn write_fixtures() -> Result<(TempDir, PathBuf, PathBuf)> {
    let temp_dir = tempfile::tempdir()?;
    let manifest = temp_dir.path().join("prompt.toml");
    let models = temp_dir.path().join("models.toml");
    fs::write(&manifest, MANIFEST)?;
    fs::write(&models, MODELS)?;
    Ok((temp_dir, manifest, models))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn test_cli_version() -> Result<()> {
    let output = promptkit(&["--version"])?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("promptkit"));
    Ok(())
}

#[test]
fn test_render_plain() -> Result<()> {
    let (_temp, manifest, _) = write_fixtures()?;
    let output = promptkit(&["render", manifest.to_str().unwrap(), "question"])?;

    assert!(output.status.success());
    assert_eq!(stdout(&output), "question (neutral)");
    Ok(())
}

#[test]
fn test_render_for_builtin_model_with_kwarg() -> Result<()> {
    let (_temp, manifest, _) = write_fixtures()?;
    let output = promptkit(&[
        "render",
        manifest.to_str().unwrap(),
        "--arg",
        "query=question",
        "--arg",
        "tone=formal",
        "--model",
        "mistralai/Mistral-7B-v0.1",
    ])?;

    assert!(output.status.success());
    assert_eq!(stdout(&output), "<s>question (formal)</s>");
    Ok(())
}

#[test]
fn test_render_variant_from_models_file() -> Result<()> {
    let (_temp, manifest, models) = write_fixtures()?;
    let output = promptkit(&[
        "--models",
        models.to_str().unwrap(),
        "render",
        manifest.to_str().unwrap(),
        "q",
        "--model",
        "acme/variant",
    ])?;

    assert!(output.status.success());
    assert_eq!(stdout(&output), "variant: q");
    Ok(())
}

#[test]
fn test_render_unknown_model_fails() -> Result<()> {
    let (_temp, manifest, _) = write_fixtures()?;
    let output = promptkit(&[
        "render",
        manifest.to_str().unwrap(),
        "q",
        "--model",
        "nobody/nothing",
    ])?;

    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown model"));
    Ok(())
}

#[test]
fn test_render_missing_argument_fails() -> Result<()> {
    let (_temp, manifest, _) = write_fixtures()?;
    let output = promptkit(&["render", manifest.to_str().unwrap()])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing required argument"));
    Ok(())
}

#[test]
fn test_chat_command() -> Result<()> {
    let (_temp, _, models) = write_fixtures()?;
    let output = promptkit(&[
        "--models",
        models.to_str().unwrap(),
        "chat",
        "--model",
        "acme/chat",
        "--system",
        "S",
        "user:Q",
    ])?;

    assert!(output.status.success());
    assert_eq!(stdout(&output), "<sys>S</sys><usr>Q</usr>");

    let output = promptkit(&[
        "--models",
        models.to_str().unwrap(),
        "chat",
        "--model",
        "acme/chat",
        "--system",
        "S",
        "--drop-system",
        "user:Q",
    ])?;
    assert_eq!(stdout(&output), "<usr>Q</usr>");
    Ok(())
}

#[test]
fn test_models_command() -> Result<()> {
    let (_temp, _, models) = write_fixtures()?;
    let output = promptkit(&["--models", models.to_str().unwrap(), "models"])?;

    assert!(output.status.success());
    let listed = stdout(&output);
    assert!(listed.contains("google/gemma-2-9b"));
    assert!(listed.contains("acme/chat"));
    Ok(())
}

#[test]
fn test_missing_models_file_fails() -> Result<()> {
    let output = promptkit(&["--models", "/nonexistent/models.toml", "models"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("config file not found"));
    Ok(())
}
