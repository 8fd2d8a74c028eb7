use std::time::{Duration, Instant};

use clap::Parser;
use clap::error::ErrorKind;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl tagscan::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_parsed_args(args: tagscan::Args) -> anyhow::Result<String> {
    let mut output = Vec::new();
    let output_format = args
        .output_format()
        .unwrap_or(tagscan::OutputFormat::Pretty);
    let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
    let hardware_client = match maybe_fake_args {
        Some(fake_args) => tagscan::fake_hardware_client(fake_args),
        None => tagscan::real_hardware_client()?,
    };
    tagscan::run_with_clients(
        command,
        &mut output,
        &FakeTerminalClient,
        hardware_client,
        output_format,
    )
    .await?;
    Ok(String::from_utf8(output)?)
}

async fn run_with_argv<const N: usize>(argv: [&str; N]) -> anyhow::Result<String> {
    let parsed_args = tagscan::Args::try_parse_from(argv)?;
    run_with_parsed_args(parsed_args).await
}

#[tokio::test]
async fn inspect_command_prints_tag_details_from_fake_backend() -> anyhow::Result<()> {
    let fake = tagscan::FakeArgs::builder()
        .tag_fixture("mifare|04a1b2c3|read_write|137")?
        .build();
    let args = tagscan::Args::new(tagscan::Command::Inspect).with_fake(fake);

    let stdout = run_with_parsed_args(args).await?;
    assert_snapshot!("inspect_command_stdout", stdout.trim_end());

    Ok(())
}

#[tokio::test]
async fn read_command_stops_after_the_first_read() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "tagscan",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "--fake-payload",
        "D101055402656E6869",
        "read",
    ])
    .await?;

    assert_snapshot!("read_command_stdout", stdout.trim_end());
    Ok(())
}

#[tokio::test]
async fn read_command_keep_listening_drains_the_fixture() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "tagscan",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "--fake-payload",
        "D101055402656E6869",
        "--fake-max-detections",
        "2",
        "read",
        "--keep-listening",
    ])
    .await?;

    assert_snapshot!("read_keep_listening_stdout", stdout.trim_end());
    Ok(())
}

#[tokio::test]
async fn write_command_writes_text_records() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "tagscan",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "write",
        "hello",
    ])
    .await?;

    assert_snapshot!("write_command_stdout", stdout.trim_end());
    Ok(())
}

#[tokio::test]
async fn read_command_emits_json_events() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "tagscan",
        "--output",
        "json",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "--fake-payload",
        "D101055402656E6869",
        "read",
    ])
    .await?;

    assert_snapshot!("read_command_json_stdout", stdout.trim_end());
    Ok(())
}

#[tokio::test]
async fn inspect_command_emits_json_report() -> anyhow::Result<()> {
    let stdout = run_with_argv([
        "tagscan",
        "--output",
        "json",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "inspect",
    ])
    .await?;

    assert_snapshot!("inspect_command_json_stdout", stdout.trim_end());
    Ok(())
}

#[tokio::test]
async fn write_command_rejects_read_only_tags() -> anyhow::Result<()> {
    let result = run_with_argv([
        "tagscan",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_only|137",
        "write",
        "hello",
    ])
    .await;

    let error = result.expect_err("writing a read-only tag should fail the command");
    assert!(matches!(
        error.downcast_ref::<tagscan::ScanError>(),
        Some(tagscan::ScanError::ReadOnlyTag)
    ));
    Ok(())
}

#[test]
fn fake_args_fail_for_invalid_fixture() {
    let result = tagscan::FakeArgs::builder().tag_fixture("invalid-record");
    assert!(matches!(
        result,
        Err(tagscan::FixtureError::InvalidRecordFieldCount)
    ));
}

#[test]
fn read_command_rejects_bad_payload_hex() {
    let result = tagscan::Args::try_parse_from([
        "tagscan",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "--fake-payload",
        "zz",
        "read",
    ]);

    let error = result.expect_err("a non-hex payload should fail command parsing");
    assert_eq!(ErrorKind::ValueValidation, error.kind());
}

#[tokio::test]
async fn read_command_applies_fake_detect_delay() -> anyhow::Result<()> {
    let started_at = Instant::now();
    let _ = run_with_argv([
        "tagscan",
        "--fake",
        "--fake-tag",
        "mifare|04a1b2c3|read_write|137",
        "--fake-payload",
        "D101055402656E6869",
        "--fake-detect-delay",
        "40ms",
        "read",
    ])
    .await?;

    assert!(started_at.elapsed() >= Duration::from_millis(40));
    Ok(())
}
