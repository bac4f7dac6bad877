//! Foreground pipelines: pipe wiring, redirections and exit statuses.
//!
//! Nothing here reaps with `waitpid(-1)`, so every status is collected by
//! the launcher itself.

use std::fs;
use std::path::Path;

use pish::eval::{launch, Launched};
use pish::job::Signal;
use pish::parse::{Limits, Pipeline};
use pish::{JobRegistry, Shell, Status};

fn shell() -> Shell {
    Shell::new(JobRegistry::new(), Limits::default())
}

fn run(line: &str) -> Vec<Option<Status>> {
    let pipeline = Pipeline::parse(line, Limits::default()).unwrap();
    match launch(pipeline, &JobRegistry::new()).unwrap() {
        Launched::Foreground(statuses) => statuses,
        other => panic!("expected a foreground pipeline, got {:?}", other),
    }
}

fn path(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}

#[test]
fn output_redirect_truncates_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = path(dir.path(), "out.txt");
    fs::write(&out, "a much longer previous content\n").unwrap();

    let mut sh = shell();
    sh.eval(&format!("echo hello > {}", out), &mut Vec::new()).unwrap();

    assert_eq!(sh.status(), 0);
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
}

#[test]
fn input_redirect_feeds_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let input = path(dir.path(), "in.txt");
    let out = path(dir.path(), "out.txt");
    fs::write(&input, "pear\napple\nfig\n").unwrap();

    let statuses = run(&format!("sort < {} > {}", input, out));

    // Only the first directive counts; `> out.txt` was dropped.
    assert_eq!(statuses, vec![Some(Status::Exited(0))]);
    assert!(!Path::new(&out).exists());

    run(&format!("sort < {} | cat > {}", input, out));
    assert_eq!(fs::read_to_string(&out).unwrap(), "apple\nfig\npear\n");
}

#[test]
fn three_stage_chain() {
    let dir = tempfile::tempdir().unwrap();
    let out = path(dir.path(), "out.txt");

    let statuses = run(&format!("seq 1 5 | sort -r | head -n 2 > {}", out));

    assert_eq!(statuses.len(), 3);
    assert_eq!(fs::read_to_string(&out).unwrap(), "5\n4\n");
}

#[test]
fn status_comes_from_last_stage() {
    assert_eq!(
        run("true | false"),
        vec![Some(Status::Exited(0)), Some(Status::Exited(1))]
    );

    let mut sh = shell();
    sh.eval("true | false", &mut Vec::new()).unwrap();
    assert_eq!(sh.status(), 1);
    sh.eval("false | true", &mut Vec::new()).unwrap();
    assert_eq!(sh.status(), 0);
}

#[test]
fn missing_program_fails_only_its_stage() {
    let dir = tempfile::tempdir().unwrap();
    let out = path(dir.path(), "out.txt");

    let statuses = run(&format!("pish-no-such-program-4711 | echo ok > {}", out));

    assert_eq!(statuses, vec![Some(Status::Exited(127)), Some(Status::Exited(0))]);
    assert_eq!(fs::read_to_string(&out).unwrap(), "ok\n");
}

#[test]
fn unopenable_redirect_fails_only_its_stage() {
    let statuses = run("cat < /nonexistent/pish/input.txt");
    assert_eq!(statuses, vec![Some(Status::Exited(1))]);

    let statuses = run("echo hi > /nonexistent/pish/out.txt | true");
    assert_eq!(statuses, vec![Some(Status::Exited(1)), Some(Status::Exited(0))]);
}

#[test]
fn endless_writer_stops_when_reader_exits() {
    let dir = tempfile::tempdir().unwrap();
    let out = path(dir.path(), "out.txt");

    let statuses = run(&format!("yes | head -n 1 > {}", out));

    assert_eq!(
        statuses,
        vec![Some(Status::Signaled(Signal::SIGPIPE)), Some(Status::Exited(0))]
    );
    assert_eq!(fs::read_to_string(&out).unwrap(), "y\n");
}

#[test]
fn parse_errors_leave_nothing_running() {
    let mut sh = shell();
    let err = sh.eval("ls | | wc", &mut Vec::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<pish::Error>(),
        Some(pish::Error::EmptyStage)
    ));
    assert_eq!(sh.status(), 1);
    assert!(sh.jobs().list().unwrap().is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn adjacent_stages_share_one_pipe() {
    use pish::eval::{spawn, wait_all};
    use pish::job::Program;
    use std::time::{Duration, Instant};

    fn link(pid: pish::job::Pid, fd: u32) -> String {
        fs::read_link(format!("/proc/{}/fd/{}", pid, fd))
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    let pipeline = Pipeline::parse("sleep 5 | sleep 5", Limits::default()).unwrap();
    let programs = pipeline
        .stages
        .iter()
        .map(Program::new)
        .collect::<anyhow::Result<Vec<_>>>()
        .unwrap();
    let pids = spawn(&programs, false).unwrap();

    // The children may still be wiring themselves up.
    let deadline = Instant::now() + Duration::from_secs(5);
    let (write, read) = loop {
        let (w, r) = (link(pids[0], 1), link(pids[1], 0));
        if (w.starts_with("pipe:") && w == r) || Instant::now() > deadline {
            break (w, r);
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    for &pid in &pids {
        let _ = nix::sys::signal::kill(pid, Signal::SIGKILL);
    }
    let statuses = wait_all(&pids).unwrap();

    assert!(write.starts_with("pipe:"), "stage 0 stdout is {:?}", write);
    assert_eq!(write, read);
    assert!(statuses
        .iter()
        .all(|s| *s == Some(Status::Signaled(Signal::SIGKILL))));
}
