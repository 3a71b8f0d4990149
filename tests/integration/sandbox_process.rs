//! Real subprocess runs against a fake renderer script.

#![cfg(unix)]

use leap::config::PipelineConfig;
use leap::generation::prompts::REFERENCE_EXAMPLE;
use leap::generation::OfflineGenerator;
use leap::logging::JobLoggerFactory;
use leap::pipeline::{Orchestrator, PipelineRequest};
use leap::sandbox::{
    stderr_log_path, ArtifactExecutor, ExecutionRequest, QualityTier, RenderSandbox, SandboxConfig,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const RENDERS: &str = r#"
media="$3"
stem=$(basename "$4" .py)
entry="$5"
mkdir -p "$media/videos/$stem/480p15"
printf 'video' > "$media/videos/$stem/480p15/$entry.mp4"
echo "rendered $entry with voice $LEAP_VOICE"
"#;

const RENDERS_ALONE: &str = r#"
media="$3"
stem=$(basename "$4" .py)
entry="$5"
if ! mkdir "$media/render.lock" 2>/dev/null; then
  echo "another render is running" >&2
  exit 1
fi
sleep 1
rmdir "$media/render.lock"
mkdir -p "$media/videos/$stem/480p15"
printf 'video' > "$media/videos/$stem/480p15/$entry.mp4"
"#;

const CRASHES: &str = r#"
echo "Manim Community v0.18" >&2
echo "Traceback (most recent call last):" >&2
echo "  File scene.py, line 12, in construct" >&2
echo "" >&2
echo "NameError: name 'Sqaure' is not defined" >&2
exit 1
"#;

const HANGS: &str = "sleep 10\n";

const SILENT: &str = "echo done\n";

fn sandbox(dir: &TempDir, script: &str) -> RenderSandbox {
    let script_path = dir.path().join("fake_renderer.sh");
    std::fs::write(&script_path, script).unwrap();
    RenderSandbox::new(SandboxConfig {
        program: "sh".to_string(),
        args: vec![script_path.display().to_string()],
        code_dir: dir.path().join("code"),
        media_dir: dir.path().join("media"),
        timeout_secs: 2,
        stderr_tail_lines: 2,
        ..SandboxConfig::default()
    })
}

fn request() -> ExecutionRequest {
    request_for("square_of_sum")
}

fn request_for(slug: &str) -> ExecutionRequest {
    ExecutionRequest {
        quality: QualityTier::Low,
        slug: slug.to_string(),
        voice: "alloy".to_string(),
    }
}

#[tokio::test]
async fn successful_render_locates_output() {
    let dir = TempDir::new().unwrap();
    let result = sandbox(&dir, RENDERS)
        .execute(REFERENCE_EXAMPLE, &request())
        .await
        .unwrap();

    assert!(result.success, "{:?}", result.error);
    let locator = result.output_locator.unwrap();
    assert!(locator.ends_with("480p15/SquareOfSum.mp4"), "{}", locator);
    assert!(result.log_tail.contains("voice alloy"));
    let artifact = result.artifact_path.unwrap();
    assert!(artifact.starts_with(dir.path().join("code")));
    assert!(artifact
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("square_of_sum_"));
}

#[tokio::test]
async fn crash_reports_stderr_tail_and_keeps_full_log() {
    let dir = TempDir::new().unwrap();
    let result = sandbox(&dir, CRASHES)
        .execute(REFERENCE_EXAMPLE, &request())
        .await
        .unwrap();

    assert!(!result.success);
    let error = result.error.unwrap();
    assert_eq!(
        error,
        "  File scene.py, line 12, in construct\nNameError: name 'Sqaure' is not defined"
    );
    let log = std::fs::read_to_string(stderr_log_path(&result.artifact_path.unwrap())).unwrap();
    assert!(log.contains("Manim Community v0.18"));
}

#[tokio::test]
async fn hung_renderer_is_killed_at_timeout() {
    let dir = TempDir::new().unwrap();
    let started = std::time::Instant::now();
    let result = sandbox(&dir, HANGS)
        .execute(REFERENCE_EXAMPLE, &request())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("timed out"));
    assert!(started.elapsed() < std::time::Duration::from_secs(8));
}

#[tokio::test]
async fn clean_exit_without_output_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let result = sandbox(&dir, SILENT)
        .execute(REFERENCE_EXAMPLE, &request())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("SquareOfSum.mp4"));
}

#[tokio::test]
async fn earlier_output_is_not_reused_after_silent_exit() {
    let dir = TempDir::new().unwrap();
    let first = sandbox(&dir, RENDERS)
        .execute(REFERENCE_EXAMPLE, &request_for("first_run"))
        .await
        .unwrap();
    assert!(first.success, "{:?}", first.error);

    let second = sandbox(&dir, SILENT)
        .execute(REFERENCE_EXAMPLE, &request_for("second_run"))
        .await
        .unwrap();

    assert!(!second.success, "reused {:?}", second.output_locator);
    assert!(second.output_locator.is_none());
    assert!(second.error.unwrap().contains("no output file"));
}

#[tokio::test]
async fn render_cap_serializes_renderer_processes() {
    let dir = TempDir::new().unwrap();
    let script_path = dir.path().join("fake_renderer.sh");
    std::fs::write(&script_path, RENDERS_ALONE).unwrap();
    let sandbox = RenderSandbox::new(SandboxConfig {
        program: "sh".to_string(),
        args: vec![script_path.display().to_string()],
        code_dir: dir.path().join("code"),
        media_dir: dir.path().join("media"),
        timeout_secs: 5,
        max_concurrent_renders: 1,
        ..SandboxConfig::default()
    });

    let left = request_for("left");
    let right = request_for("right");
    let (a, b) = tokio::join!(
        sandbox.execute(REFERENCE_EXAMPLE, &left),
        sandbox.execute(REFERENCE_EXAMPLE, &right),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(a.success, "{:?}", a.error);
    assert!(b.success, "{:?}", b.error);
    assert_ne!(a.output_locator, b.output_locator);
}

#[tokio::test]
async fn artifact_without_class_is_not_rendered() {
    let dir = TempDir::new().unwrap();
    let result = sandbox(&dir, RENDERS)
        .execute("print('no scene')\n", &request())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Could not extract class name"));
    assert!(!dir.path().join("media").exists());
}

#[tokio::test]
async fn offline_pipeline_renders_through_real_subprocess() {
    let dir = TempDir::new().unwrap();
    let executor = Arc::new(sandbox(&dir, RENDERS));
    let orch = Orchestrator::new(
        Arc::new(OfflineGenerator::new()),
        executor,
        &PipelineConfig::default(),
        JobLoggerFactory::tracing_only(),
    );

    let state = orch
        .invoke(PipelineRequest::new("Why is (a+b)^2 = a^2 + 2ab + b^2?"))
        .await;

    assert!(state.is_success(), "{:?}", state.failure);
    assert!(Path::new(state.output_locator().unwrap()).exists());
}
