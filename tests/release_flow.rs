use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use relman::engine::NoopObserver;
use relman::release::{self, ReleaseOptions};
use tempfile::{tempdir, TempDir};

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit(dir: &Path, file: &str, content: &str, message: &str) {
    fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-m", message]);
}

/// An npm project at v1.2.3 with two conventional commits since the tag and
/// a bare `origin` to push to.
struct Fixture {
    _root: TempDir,
    app: PathBuf,
    remote: PathBuf,
}

fn fixture(config: &str) -> Fixture {
    let root = tempdir().unwrap();
    let app = root.path().join("app");
    let remote = root.path().join("remote.git");
    fs::create_dir(&app).unwrap();

    git(root.path(), &["init", "--bare", "-q", remote.to_str().unwrap()]);

    git(&app, &["init", "-q"]);
    git(&app, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&app, &["config", "user.email", "ada@example.com"]);
    git(&app, &["config", "user.name", "Ada"]);
    git(&app, &["config", "commit.gpgsign", "false"]);
    git(&app, &["config", "tag.gpgsign", "false"]);
    git(&app, &["remote", "add", "origin", remote.to_str().unwrap()]);

    commit(&app, "relman.json", config, "chore: add release config");
    commit(
        &app,
        "package.json",
        "{\n  \"name\": \"app\",\n  \"version\": \"1.2.3\"\n}\n",
        "chore: initial package",
    );
    git(&app, &["tag", "-a", "v1.2.3", "-m", "v1.2.3"]);
    commit(&app, "widget.js", "module.exports = 1;\n", "feat: add widget");
    commit(&app, "widget.js", "module.exports = 2;\n", "fix(core): handle empty input");

    Fixture {
        _root: root,
        app,
        remote,
    }
}

const NOOP_COMMANDS: &str =
    r#"{"commands": {"lint": "true", "test": "true", "build": "true", "publish": "true"}}"#;

fn options(app: &Path) -> ReleaseOptions {
    ReleaseOptions {
        ghrelease: false,
        release_type: "minor".to_string(),
        project_dir: app.to_path_buf(),
        ..Default::default()
    }
}

/// Only Commit and Push run: the manifest stays at 1.2.3.
fn commit_only(app: &Path) -> ReleaseOptions {
    ReleaseOptions {
        lint: false,
        test: false,
        build: false,
        contributors: false,
        bump: false,
        changelog: false,
        ghrelease: false,
        publish: false,
        project_dir: app.to_path_buf(),
        ..Default::default()
    }
}

fn package_version(app: &Path) -> String {
    let content = fs::read_to_string(app.join("package.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    value["version"].as_str().unwrap().to_string()
}

#[test]
fn releases_bumps_tags_and_pushes() {
    let fx = fixture(NOOP_COMMANDS);

    let run = release::run(&options(&fx.app), &mut NoopObserver).unwrap();

    assert_eq!(run.previous_version.as_deref(), Some("1.2.3"));
    assert_eq!(run.new_version.as_deref(), Some("1.3.0"));
    assert_eq!(run.tag.as_deref(), Some("v1.3.0"));
    assert_eq!(run.contributors_updated, Some(true));
    assert!(run.release_url.is_none());
    assert_eq!(package_version(&fx.app), "1.3.0");

    let titles: Vec<&str> = run.steps.iter().map(|s| s.title.as_str()).collect();
    assert!(titles.contains(&"Bump Version: v1.2.3 -> v1.3.0"));
    assert!(titles.contains(&"Publish: v1.3.0"));

    let changelog = fs::read_to_string(fx.app.join("CHANGELOG.md")).unwrap();
    assert!(changelog.contains("# 1.3.0 ("));
    assert!(changelog.contains("### Features"));
    assert!(changelog.contains("* add widget"));
    assert!(changelog.contains("### Bug Fixes"));
    assert!(changelog.contains("* **core:** handle empty input"));

    assert_eq!(
        git(&fx.app, &["log", "-1", "--format=%s"]),
        "chore: release version v1.3.0"
    );
    assert_eq!(git(&fx.app, &["status", "--porcelain"]), "");

    let remote_tags = git(&fx.remote, &["tag", "--list"]);
    assert!(remote_tags.lines().any(|t| t == "v1.3.0"));
    assert_eq!(
        git(&fx.remote, &["log", "-1", "--format=%s", "main"]),
        "chore: release version v1.3.0"
    );
}

#[test]
fn dirty_tree_aborts_before_any_step() {
    let fx = fixture(NOOP_COMMANDS);
    fs::write(fx.app.join("scratch.txt"), "wip").unwrap();

    let err = release::run(&options(&fx.app), &mut NoopObserver).unwrap_err();

    assert_eq!(err.code.as_str(), "precondition.failed");
    assert_eq!(err.message, "Dirty git repo, aborting");
    assert_eq!(package_version(&fx.app), "1.2.3");
    assert!(!fx.app.join("CHANGELOG.md").exists());
}

#[test]
fn failing_test_command_stops_before_bump() {
    let fx = fixture(r#"{"commands": {"lint": "true", "test": "echo boom >&2; exit 3"}}"#);

    let err = release::run(&options(&fx.app), &mut NoopObserver).unwrap_err();

    assert_eq!(err.code.as_str(), "step.command_failed");
    assert_eq!(err.details["exitCode"], 3);
    assert_eq!(package_version(&fx.app), "1.2.3");
    assert_eq!(git(&fx.app, &["tag", "--list", "v1.3.0"]), "");
    assert_eq!(git(&fx.remote, &["tag", "--list"]), "");
}

#[test]
fn github_release_is_created_after_push() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let api_url = format!("http://{}", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        l.to_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        let body = r#"{"id": 7, "html_url": "https://github.com/acme/app/releases/tag/v1.2.4"}"#;
        let response = format!(
            "HTTP/1.1 201 Created\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8_lossy(&request).to_string()
    });

    let config = format!(
        r#"{{
            "commands": {{"lint": "true", "test": "true", "build": "true"}},
            "github": {{"api_url": "{}", "repo": "acme/app"}}
        }}"#,
        api_url
    );
    let fx = fixture(&config);
    let options = ReleaseOptions {
        contributors: false,
        publish: false,
        ghtoken: Some("t0ken".to_string()),
        project_dir: fx.app.clone(),
        ..Default::default()
    };

    let run = release::run(&options, &mut NoopObserver).unwrap();
    let request = server.join().unwrap();

    assert_eq!(
        run.release_url.as_deref(),
        Some("https://github.com/acme/app/releases/tag/v1.2.4")
    );
    assert!(request.starts_with("POST /repos/acme/app/releases "));
    assert!(request.contains("token t0ken"));
    assert!(request.contains("\"tag_name\":\"v1.2.4\""));
    assert!(request.contains("handle empty input"));
}

#[test]
fn plan_runs_nothing() {
    let fx = fixture(NOOP_COMMANDS);

    let plan = release::plan(&options(&fx.app)).unwrap();

    assert_eq!(plan.current_version.as_deref(), Some("1.2.3"));
    assert_eq!(plan.next_version.as_deref(), Some("1.3.0"));
    assert_eq!(package_version(&fx.app), "1.2.3");
    assert_eq!(git(&fx.app, &["status", "--porcelain"]), "");
}

#[test]
fn existing_tag_on_another_commit_fails_commit() {
    let fx = fixture(NOOP_COMMANDS);

    let err = release::run(&commit_only(&fx.app), &mut NoopObserver).unwrap_err();

    assert_eq!(err.code.as_str(), "validation.invalid_argument");
    assert_eq!(
        err.message,
        "Tag 'v1.2.3' exists but points to different commit"
    );
    assert_eq!(err.hints[0].message, "Delete stale tag: git tag -d v1.2.3");
    assert_eq!(
        git(&fx.app, &["log", "-1", "--format=%s"]),
        "fix(core): handle empty input"
    );
    assert_eq!(git(&fx.remote, &["tag", "--list"]), "");
}

#[test]
fn nothing_staged_skips_commit_and_reuses_tag_at_head() {
    let fx = fixture(NOOP_COMMANDS);
    git(&fx.app, &["tag", "-d", "v1.2.3"]);
    git(&fx.app, &["tag", "-a", "v1.2.3", "-m", "v1.2.3"]);
    let head = git(&fx.app, &["rev-parse", "HEAD"]);

    let run = release::run(&commit_only(&fx.app), &mut NoopObserver).unwrap();

    assert_eq!(run.tag.as_deref(), Some("v1.2.3"));
    assert!(run.new_version.is_none());
    assert_eq!(git(&fx.app, &["rev-parse", "HEAD"]), head);
    assert_eq!(git(&fx.app, &["rev-list", "-n", "1", "v1.2.3"]), head);
    assert_eq!(git(&fx.remote, &["rev-parse", "main"]), head);
    assert_eq!(git(&fx.remote, &["tag", "--list"]), "v1.2.3");

    let again = release::run(&commit_only(&fx.app), &mut NoopObserver).unwrap();
    assert_eq!(again.tag.as_deref(), Some("v1.2.3"));
    assert_eq!(git(&fx.app, &["rev-parse", "HEAD"]), head);
}

#[test]
fn push_uses_configured_remote_and_branch() {
    let fx = fixture(
        r#"{
            "remote": "upstream",
            "branch": "release",
            "commands": {"lint": "true", "test": "true", "build": "true", "publish": "true"}
        }"#,
    );
    let upstream = fx.app.parent().unwrap().join("upstream.git");
    git(
        fx.app.parent().unwrap(),
        &["init", "--bare", "-q", upstream.to_str().unwrap()],
    );
    git(&fx.app, &["remote", "add", "upstream", upstream.to_str().unwrap()]);
    git(&fx.app, &["branch", "release"]);

    let options = ReleaseOptions {
        contributors: false,
        ..options(&fx.app)
    };
    let run = release::run(&options, &mut NoopObserver).unwrap();

    assert_eq!(run.tag.as_deref(), Some("v1.3.0"));
    assert_eq!(
        git(&upstream, &["branch", "--format=%(refname:short)"]),
        "release"
    );
    assert_eq!(
        git(&upstream, &["log", "-1", "--format=%s", "release"]),
        "fix(core): handle empty input"
    );
    let upstream_tags = git(&upstream, &["tag", "--list"]);
    assert!(upstream_tags.lines().any(|t| t == "v1.3.0"));
    assert_eq!(git(&fx.remote, &["tag", "--list"]), "");
}
