//! Session loop behaviour: quitting, error isolation, plan display

mod common;

use chainer::executor::SequentialExecutor;
use chainer::pipeline::Pipeline;
use chainer::planner::PlanGenerator;
use chainer::session::SessionLoop;

use common::{RecordingCatalog, ScriptedProvider, output_dir};

fn session(
    catalog: RecordingCatalog,
    provider: &ScriptedProvider,
    show_plan: bool,
) -> SessionLoop<RecordingCatalog> {
    let pipeline = Pipeline::new(
        catalog,
        PlanGenerator::new(Box::new(provider.clone())),
        SequentialExecutor::default(),
        output_dir(),
    );
    SessionLoop::new(pipeline, show_plan)
}

async fn run(session: &mut SessionLoop<RecordingCatalog>, input: &str) -> String {
    let mut output = Vec::new();
    session.run(input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output).unwrap()
}

#[tokio::test]
async fn test_quit_ends_session_before_processing() {
    let provider = ScriptedProvider::new(["[]"]);
    let mut session = session(RecordingCatalog::with_tools(&["a"]), &provider, false);

    let output = run(&mut session, "QuIt\nnever processed\n").await;

    assert!(provider.requests().is_empty());
    assert_eq!(session.pipeline().catalog().list_calls, 0);
    assert!(!output.contains("🤖 AI:"));
}

#[tokio::test]
async fn test_end_of_input_ends_session() {
    let provider = ScriptedProvider::new(["[]"]);
    let mut session = session(RecordingCatalog::with_tools(&["a"]), &provider, false);

    let output = run(&mut session, "first query\n").await;

    assert_eq!(provider.requests().len(), 1);
    assert_eq!(output.matches("🤖 AI: Report saved to: ").count(), 1);
}

#[tokio::test]
async fn test_failing_tool_does_not_end_session() {
    let provider = ScriptedProvider::new([
        r#"[{"name": "broken", "arguments": {}}]"#,
        r#"[{"name": "search_google", "arguments": {"keyword": "ok"}}]"#,
    ]);
    let catalog = RecordingCatalog::with_tools(&["broken", "search_google"]).failing("broken");
    let mut session = session(catalog, &provider, false);

    let output = run(&mut session, "first\nsecond\nquit\n").await;

    assert!(output.contains("⚠️ Error: Tool 'broken' failed: tool 'broken' is unavailable"));
    assert_eq!(output.matches("🤖 AI: Report saved to: ").count(), 1);
    assert_eq!(
        session.pipeline().catalog().called_tools(),
        vec!["broken", "search_google"]
    );
}

#[tokio::test]
async fn test_model_failure_is_reported_and_session_continues() {
    let provider = ScriptedProvider::default();
    provider.push_failure("connection refused");
    let mut session = session(RecordingCatalog::with_tools(&["a"]), &provider, false);

    let output = run(&mut session, "first\nsecond\n").await;

    assert!(output.contains("⚠️ Error: Failed to generate tool plan: connection refused"));
    assert_eq!(provider.requests().len(), 2);
    assert!(output.contains("🤖 AI: Report saved to: "));
}

#[tokio::test]
async fn test_empty_query_is_still_processed() {
    let provider = ScriptedProvider::new(["[]"]);
    let mut session = session(RecordingCatalog::with_tools(&["a"]), &provider, false);

    run(&mut session, "\nquit\n").await;

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0][1].content.starts_with(" [md_filename=search__"));
}

#[tokio::test]
async fn test_show_plan_prints_plan_before_summary() {
    let provider = ScriptedProvider::new([r#"[{"name": "a", "arguments": {"x": 1}}]"#]);
    let mut session = session(RecordingCatalog::with_tools(&["a"]), &provider, true);

    let output = run(&mut session, "go\nquit\n").await;

    let plan_at = output.find("📋 Plan:").expect("plan printed");
    let summary_at = output.find("🤖 AI:").expect("summary printed");
    assert!(plan_at < summary_at);
    assert!(output.contains("\"name\": \"a\""));
}

#[tokio::test]
async fn test_invalid_utf8_line_is_reported_and_session_continues() {
    let provider = ScriptedProvider::new(["[]"]);
    let mut session = session(RecordingCatalog::with_tools(&["a"]), &provider, false);

    let mut output = Vec::new();
    session
        .run(&b"caf\xff\nsecond\nquit\n"[..], &mut output)
        .await
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    assert!(output.contains("⚠️ Error: input is not valid UTF-8"));
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0][1].content.starts_with("second [md_filename="));
    assert_eq!(output.matches("🤖 AI: Report saved to: ").count(), 1);
}
