#![cfg(unix)]

use std::panic::{self, AssertUnwindSafe};
use std::process::Command;
use std::thread;
use std::time::Duration;

use ffwrap::{FfmpegCommand, FfmpegProcess, FfxError, ProcessOptions, ProcessState};

fn sh(script: &str) -> FfmpegCommand {
    let mut command = FfmpegCommand::with_binary("sh");
    command.add("-c", script);
    command
}

fn process_exists(pid: u32) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("kill -0 {pid} 2>/dev/null"))
        .status()
        .unwrap()
        .success()
}

#[test]
fn streams_lines_and_discards_unterminated_tail() {
    let mut process = sh(r"printf 'a\nb\r\nc'").run().unwrap();
    let lines: Vec<String> = process.read_lines(false).map(Result::unwrap).collect();
    assert_eq!(lines, vec!["a", "b"]);
    assert!(process.wait().unwrap().success());
}

#[test]
fn keeps_terminators_on_request() {
    let mut process = sh(r"printf 'one\ntwo\r'").run().unwrap();
    let lines: Vec<String> = process.read_lines(true).map(Result::unwrap).collect();
    assert_eq!(lines, vec!["one\n", "two\r"]);
}

#[test]
fn merges_stdout_and_stderr_in_write_order() {
    let mut process = sh("echo out1; echo err1 >&2; echo out2").run().unwrap();
    let lines: Vec<String> = process.lines().map(Result::unwrap).collect();
    assert_eq!(lines, vec!["out1", "err1", "out2"]);
}

#[test]
fn exit_status_is_exposed_not_interpreted() {
    let mut process = sh("echo failing; exit 3").run().unwrap();
    let lines: Vec<String> = process.lines().map(Result::unwrap).collect();
    assert_eq!(lines, vec!["failing"]);

    let status = process.wait().unwrap();
    assert_eq!(status.code(), Some(3));
    assert_eq!(process.state().unwrap(), ProcessState::Exited(status));
}

#[test]
fn stdin_is_forwarded() {
    let mut process = sh("read answer; echo got $answer").run().unwrap();
    process.write_stdin("y\n").unwrap();
    let lines: Vec<String> = process.lines().map(Result::unwrap).collect();
    assert_eq!(lines, vec!["got y"]);
}

#[test]
fn missing_binary_fails_at_spawn() {
    let command = FfmpegCommand::with_binary("definitely-not-an-installed-binary-ffwrap");
    assert!(matches!(
        command.run(),
        Err(FfxError::BinaryNotFound { .. })
    ));
}

#[test]
fn run_twice_is_rejected() {
    let mut process = FfmpegProcess::new(vec!["sh".into(), "-c".into(), "true".into()]);
    process.run().unwrap();
    assert!(matches!(process.run(), Err(FfxError::AlreadyStarted)));
    process.wait().unwrap();
}

#[test]
fn stalled_queue_is_reported_after_queued_lines() {
    let options = ProcessOptions {
        queue_capacity: 4,
        send_timeout: Duration::from_millis(100),
        ..ProcessOptions::default()
    };
    let command = sh("i=0; while [ $i -lt 100 ]; do echo line$i; i=$((i+1)); done");
    let mut process = command.run_with(options).unwrap();

    thread::sleep(Duration::from_millis(500));

    let items: Vec<_> = process.lines().collect();
    assert_eq!(items.len(), 5);
    for (index, item) in items[..4].iter().enumerate() {
        assert_eq!(item.as_ref().unwrap(), &format!("line{index}"));
    }
    assert!(matches!(items[4], Err(FfxError::QueueStalled { .. })));
}

#[test]
fn wait_reports_stall_when_lines_are_never_read() {
    let options = ProcessOptions {
        queue_capacity: 4,
        send_timeout: Duration::from_millis(100),
        ..ProcessOptions::default()
    };
    let command = sh("i=0; while [ $i -lt 100000 ]; do echo line$i; i=$((i+1)); done");
    let mut process = command.run_with(options).unwrap();

    assert!(matches!(process.wait(), Err(FfxError::QueueStalled { .. })));
    assert!(matches!(process.poll(), Err(FfxError::QueueStalled { .. })));
    assert!(matches!(process.state(), Err(FfxError::QueueStalled { .. })));
    assert!(process.exit_status().is_some());
    assert!(!process.is_running());
}

#[test]
fn last_line_before_exit_is_never_lost() {
    let options = ProcessOptions {
        poll_interval: Duration::from_millis(2),
        ..ProcessOptions::default()
    };
    for _ in 0..100 {
        let mut process = sh(r"printf 'last\n'").run_with(options.clone()).unwrap();
        let lines: Vec<String> = process.lines().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["last"]);
    }
}

#[test]
fn scoped_terminates_running_process() {
    let command = sh("echo ready; exec sleep 30");
    let pid = command
        .scoped(|process| {
            let first = process.lines().next().unwrap()?;
            assert_eq!(first, "ready");
            assert!(process.is_running());
            Ok::<_, FfxError>(process.pid())
        })
        .unwrap()
        .unwrap();
    assert!(!process_exists(pid));
}

#[test]
fn scoped_terminates_on_error() {
    let command = sh("exec sleep 30");
    let mut pid = None;
    let result: Result<(), FfxError> = command.scoped(|process| {
        assert!(process.is_running());
        pid = process.pid();
        Err(FfxError::InvalidCommand {
            message: "caller gave up".to_string(),
        })
    });
    assert!(matches!(result, Err(FfxError::InvalidCommand { .. })));
    assert!(!process_exists(pid.unwrap()));
}

#[test]
fn scoped_kills_process_when_closure_panics() {
    let command = sh("exec sleep 30");
    let mut pid = None;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        command.scoped(|process| -> Result<(), FfxError> {
            pid = process.pid();
            panic!("consumer crashed");
        })
    }));
    assert!(outcome.is_err());
    assert!(!process_exists(pid.unwrap()));
}

#[test]
fn terminate_moves_to_exited() {
    let mut process = sh("exec sleep 30").run().unwrap();
    assert_eq!(process.state().unwrap(), ProcessState::Running);
    process.terminate().unwrap();
    assert!(matches!(process.state().unwrap(), ProcessState::Exited(_)));
    assert!(process.lines().next().is_none());
}
