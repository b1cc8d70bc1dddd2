#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use ampol_tgp::pipeline::{
    CommandChain, CommandError, CommandSpec, Pipeline, PipelineError, Provisioner, TaskRunner,
};

/// Fake installer: records each manifest line in `log`, fails on unknown packages
/// and reports already installed ones without failing.
const INSTALLER: &str = r#"
log="$0"; manifest="$1"
while IFS= read -r pkg; do
    [ -z "$pkg" ] && continue
    case "$pkg" in
        nonexistent*) echo "ERROR: No matching distribution found for $pkg" >&2; exit 1 ;;
    esac
    if grep -qx "installed $pkg" "$log" 2>/dev/null; then
        echo "Requirement already satisfied: $pkg" >> "$log"
    else
        echo "installed $pkg" >> "$log"
    fi
done < "$manifest"
"#;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new(manifest: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("requirements.txt"), manifest).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn log(&self) -> String {
        fs::read_to_string(self.path("output.log")).unwrap_or_default()
    }

    fn provisioner(&self) -> Provisioner {
        let installer = CommandSpec::new("sh")
            .args(["-c", INSTALLER])
            .arg(self.path("output.log"));
        Provisioner::new(installer, self.path("requirements.txt"))
    }

    fn scraper(&self, script: &str) -> CommandSpec {
        CommandSpec::new("sh").args(["-c", script]).arg(self.dir.path())
    }

    fn pipeline(&self, script: &str) -> Pipeline {
        Pipeline::new(
            self.provisioner(),
            TaskRunner::new(CommandChain::single(self.scraper(script))),
        )
    }
}

const SCRAPE_OK: &str = r#"echo run >> "$0/invocations"; echo done >> "$0/output.log""#;

fn invocations(ws: &Workspace) -> usize {
    fs::read_to_string(ws.path("invocations"))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[test]
fn test_success_runs_scraper_once_after_provisioning() {
    let ws = Workspace::new("requests==2.32.3\n");

    ws.pipeline(SCRAPE_OK).run().expect("Pipeline should succeed");

    assert_eq!(invocations(&ws), 1);
    assert_eq!(ws.log(), "installed requests==2.32.3\ndone\n");
}

#[test]
fn test_failed_provisioning_skips_scraper() {
    let ws = Workspace::new("requests\nnonexistent-package-xyz\n");

    let err = ws.pipeline(SCRAPE_OK).run().unwrap_err();

    assert!(matches!(err, PipelineError::Provisioning(_)));
    assert_ne!(err.exit_code(), 0);
    assert_eq!(invocations(&ws), 0, "scraper must not be invoked");
    assert!(!ws.log().contains("done"));
}

#[test]
fn test_scraper_exit_code_is_propagated() {
    let ws = Workspace::new("requests\n");

    let err = ws
        .pipeline(r#"echo run >> "$0/invocations"; exit 7"#)
        .run()
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Run(CommandError::Exited { code: 7, .. })
    ));
    assert_eq!(err.exit_code(), 7);
    assert_eq!(invocations(&ws), 1);
}

#[test]
fn test_failure_inside_pipe_is_not_masked() {
    let ws = Workspace::new("requests\n");
    let chain = CommandChain::new(vec![
        CommandSpec::new("sh").args(["-c", "echo partial; exit 3"]),
        CommandSpec::new("sh")
            .args(["-c", r#"cat > "$0/piped""#])
            .arg(ws.dir.path()),
    ])
    .unwrap();

    let err = Pipeline::new(ws.provisioner(), TaskRunner::new(chain))
        .run()
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert_eq!(fs::read_to_string(ws.path("piped")).unwrap(), "partial\n");
}

#[test]
fn test_rightmost_failing_stage_wins() {
    let chain = CommandChain::new(vec![
        CommandSpec::new("sh").args(["-c", "exit 3"]),
        CommandSpec::new("sh").args(["-c", "cat > /dev/null; exit 5"]),
        CommandSpec::new("true"),
    ])
    .unwrap();

    let err = chain.run().unwrap_err();
    assert!(matches!(err, CommandError::Exited { code: 5, .. }));
}

#[test]
fn test_pipe_carries_data_between_stages() {
    let ws = Workspace::new("");
    let chain = CommandChain::new(vec![
        CommandSpec::new("printf").arg("a\\nb\\nc\\n"),
        CommandSpec::new("sh")
            .args(["-c", r#"wc -l | tr -d ' ' > "$0/count""#])
            .arg(ws.dir.path()),
    ])
    .unwrap();

    chain.run().expect("Chain should succeed");
    assert_eq!(fs::read_to_string(ws.path("count")).unwrap().trim(), "3");
}

#[test]
fn test_rerun_with_satisfied_manifest_succeeds() {
    let ws = Workspace::new("requests\n");
    let pipeline = ws.pipeline(SCRAPE_OK);

    pipeline.run().expect("First run should succeed");
    pipeline.run().expect("Second run should succeed");

    assert_eq!(invocations(&ws), 2);
    assert!(ws.log().contains("Requirement already satisfied: requests"));
}

#[test]
fn test_missing_installer_maps_to_127() {
    let ws = Workspace::new("requests\n");
    let pipeline = Pipeline::new(
        Provisioner::new(
            CommandSpec::new("ampol-tgp-no-such-installer"),
            ws.path("requirements.txt"),
        ),
        TaskRunner::new(CommandChain::single(ws.scraper(SCRAPE_OK))),
    );

    let err = pipeline.run().unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Provisioning(CommandError::Spawn { .. })
    ));
    assert_eq!(err.exit_code(), 127);
    assert_eq!(invocations(&ws), 0);
}

#[test]
fn test_killed_scraper_reports_signal() {
    let ws = Workspace::new("requests\n");

    let err = ws.pipeline("kill -TERM $$").run().unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Run(CommandError::Signaled { signal: 15, .. })
    ));
    assert_eq!(err.exit_code(), 143);
}

#[test]
fn test_pipeline_from_settings_file() {
    let ws = Workspace::new("requests\n");
    let settings_path = ws.path("ampol-tgp.toml");
    let marker = ws.path("marker");
    fs::write(
        &settings_path,
        format!(
            r#"
[provision]
installer = ["true"]
manifest = "{manifest}"

[run]
stages = [["sh", "-c", "echo ran > {marker}"]]
"#,
            manifest = display(&ws.path("requirements.txt")),
            marker = display(&marker),
        ),
    )
    .unwrap();

    let settings = ampol_tgp::Settings::load(Some(&settings_path)).unwrap();
    Pipeline::from_settings(&settings).unwrap().run().unwrap();

    assert_eq!(fs::read_to_string(marker).unwrap(), "ran\n");
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
