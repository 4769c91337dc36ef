use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::{FfxError, Result};

const SEND_RETRY: Duration = Duration::from_millis(5);

/// Tuning for the reader thread and the line consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Lines the reader may queue before it has to wait for the consumer.
    pub queue_capacity: usize,
    /// How long the reader waits on a full queue before giving up on the run.
    pub send_timeout: Duration,
    /// Consumer receive timeout between liveness checks.
    pub poll_interval: Duration,
    /// Bytes requested per read from the merged output pipe.
    pub chunk_size: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            send_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            chunk_size: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Exited(ExitStatus),
}

/// One execution of the external binary.
///
/// Stdout and stderr share a single pipe, so lines arrive in the order the
/// process wrote them. A still-running child is killed when this is dropped.
#[derive(Debug)]
pub struct FfmpegProcess {
    args: Vec<String>,
    options: ProcessOptions,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    lines: Option<Receiver<String>>,
    stalled: Arc<AtomicBool>,
    reader: Option<thread::JoinHandle<()>>,
    exit_status: Option<ExitStatus>,
}

impl FfmpegProcess {
    /// `args[0]` is the binary, the rest are passed through untouched.
    pub fn new(args: Vec<String>) -> Self {
        Self::with_options(args, ProcessOptions::default())
    }

    pub fn with_options(args: Vec<String>, options: ProcessOptions) -> Self {
        Self {
            args,
            options,
            child: None,
            stdin: None,
            lines: None,
            stalled: Arc::new(AtomicBool::new(false)),
            reader: None,
            exit_status: None,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Spawns the binary and starts the background reader.
    pub fn run(&mut self) -> Result<&mut Self> {
        if self.child.is_some() {
            return Err(FfxError::AlreadyStarted);
        }

        let (program, args) = self
            .args
            .split_first()
            .ok_or_else(|| FfxError::InvalidCommand {
                message: "empty argument vector".to_string(),
            })?;

        tracing::debug!(command = %shell_words::join(&self.args), "spawning process");

        let (output, output_writer) = io::pipe()?;
        let error_writer = output_writer.try_clone()?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(output_writer)
            .stderr(error_writer);

        let spawned = cmd.spawn();
        // The command still owns our copies of the write end; EOF only
        // arrives once they are gone.
        drop(cmd);

        let mut child = spawned.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                FfxError::BinaryNotFound {
                    binary: program.clone(),
                }
            } else {
                FfxError::Spawn(e)
            }
        })?;

        tracing::info!(pid = child.id(), binary = %program, "process started");

        let (line_tx, line_rx) = mpsc::sync_channel(self.options.queue_capacity.max(1));
        self.reader = Some(spawn_line_reader(
            output,
            line_tx,
            &self.options,
            Arc::clone(&self.stalled),
        ));
        self.stdin = child.stdin.take();
        self.lines = Some(line_rx);
        self.child = Some(child);

        Ok(self)
    }

    /// Fails with `QueueStalled` once the reader has abandoned the output.
    pub fn state(&mut self) -> Result<ProcessState> {
        if self.child.is_none() {
            return Ok(ProcessState::NotStarted);
        }
        let status = self.try_status()?;
        self.check_stall()?;
        Ok(match status {
            Some(status) => ProcessState::Exited(status),
            None => ProcessState::Running,
        })
    }

    /// Non-blocking exit check; `None` while the process is alive.
    ///
    /// Fails with `QueueStalled` once the reader has abandoned the output.
    pub fn poll(&mut self) -> Result<Option<ExitStatus>> {
        let status = self.try_status()?;
        self.check_stall()?;
        Ok(status)
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.try_status(), Ok(None))
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    /// Writes to the child's stdin, e.g. `"y\n"` for an overwrite prompt.
    pub fn write_stdin(&mut self, input: &str) -> Result<()> {
        if self.child.is_none() {
            return Err(FfxError::NotStarted);
        }
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            FfxError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdin already closed",
            ))
        })?;
        stdin.write_all(input.as_bytes())?;
        stdin.flush()?;
        Ok(())
    }

    /// Closes stdin so the child sees end of input.
    pub fn close_stdin(&mut self) {
        self.stdin = None;
    }

    /// Blocks until the process exits.
    ///
    /// If nobody drains the lines, the reader gives up after `send_timeout`
    /// on a full queue and closes the pipe, so the child's next write fails
    /// and it usually dies. That run is lost: this returns `QueueStalled`
    /// instead of the exit status, which stays readable via `exit_status`.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        let status = match self.exit_status {
            Some(status) => status,
            None => {
                let child = self.child.as_mut().ok_or(FfxError::NotStarted)?;
                let status = child.wait()?;
                self.exit_status = Some(status);
                status
            }
        };
        self.check_stall()?;
        Ok(status)
    }

    /// Kills the process if it is still running and reaps it.
    pub fn terminate(&mut self) -> Result<()> {
        if self.try_status()?.is_some() {
            return Ok(());
        }
        let child = self.child.as_mut().ok_or(FfxError::NotStarted)?;
        tracing::info!(pid = child.id(), "terminating process");
        match child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        self.exit_status = Some(child.wait()?);
        Ok(())
    }

    /// Lines of merged output as they arrive, with `\r`/`\n` stripped unless
    /// `keep_terminators` is set.
    ///
    /// `\r\n` counts as one terminator and is delivered as a line ending in
    /// `\r`; the `\n` is not part of any line, even with terminators kept.
    ///
    /// Ends once the process has exited and the queue is drained. A reader
    /// stall is reported as a final `Err` item after every line queued
    /// before it.
    pub fn read_lines(&mut self, keep_terminators: bool) -> Lines<'_> {
        Lines {
            process: self,
            keep_terminators,
            exit_seen: false,
            done: false,
        }
    }

    pub fn lines(&mut self) -> Lines<'_> {
        self.read_lines(false)
    }

    /// Runs `f` and terminates the process on every exit path, including a
    /// panic in `f` via `Drop`.
    pub fn scoped<T, E, F>(mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut FfmpegProcess) -> std::result::Result<T, E>,
        E: From<FfxError>,
    {
        let outcome = f(&mut self);
        let cleanup = self.shutdown();
        match (outcome, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), _) => Err(e),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.child.is_none() {
            return Ok(());
        }
        match self.try_status()? {
            Some(_) => Ok(()),
            None => {
                tracing::warn!(pid = ?self.pid(), "scope exited with process still running");
                self.terminate()
            }
        }
    }

    /// Exit check that ignores a stalled reader.
    fn try_status(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.exit_status {
            return Ok(Some(status));
        }
        let child = self.child.as_mut().ok_or(FfxError::NotStarted)?;
        let status = child.try_wait()?;
        self.exit_status = status;
        Ok(status)
    }

    /// The stall flag is never cleared; a stalled run stays failed.
    fn check_stall(&self) -> Result<()> {
        if self.stalled.load(Ordering::Acquire) {
            return Err(FfxError::QueueStalled {
                timeout: self.options.send_timeout,
            });
        }
        Ok(())
    }

    fn reader_finished(&self) -> bool {
        self.reader
            .as_ref()
            .map_or(true, thread::JoinHandle::is_finished)
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if self.exit_status.is_none() && matches!(child.try_wait(), Ok(None)) {
                tracing::debug!(pid = child.id(), "killing process on drop");
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Single-pass iterator over one run's output lines.
pub struct Lines<'a> {
    process: &'a mut FfmpegProcess,
    keep_terminators: bool,
    exit_seen: bool,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let poll_interval = self.process.options.poll_interval;
            let received = match self.process.lines.as_ref() {
                Some(lines) => lines.recv_timeout(poll_interval),
                None => {
                    self.done = true;
                    return Some(Err(FfxError::NotStarted));
                }
            };

            match received {
                Ok(line) => return Some(Ok(self.finish(line))),
                Err(RecvTimeoutError::Disconnected) => {
                    self.done = true;
                    return self.process.check_stall().err().map(Err);
                }
                Err(RecvTimeoutError::Timeout) => match self.process.try_status() {
                    Ok(None) => continue,
                    // The reader's sender is gone, so the next receive drains
                    // what it queued last or disconnects at once.
                    Ok(Some(_)) if self.process.reader_finished() => continue,
                    Ok(Some(_)) => {
                        // Give the reader one more interval to flush what the
                        // process wrote right before exiting.
                        if self.exit_seen {
                            self.done = true;
                            return self.process.check_stall().err().map(Err);
                        }
                        self.exit_seen = true;
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
            }
        }
    }
}

impl Lines<'_> {
    fn finish(&self, line: String) -> String {
        if self.keep_terminators {
            line
        } else {
            line.trim_end_matches(&['\r', '\n'][..]).to_string()
        }
    }
}

/// Splits a byte stream on `\n` and `\r`, keeping the terminator.
///
/// A `\n` directly after a `\r` terminator is swallowed so `\r\n` yields one
/// line. Bytes are decoded only once a line is complete, so multi-byte
/// characters split across reads survive.
#[derive(Debug, Default)]
struct LineSplitter {
    buf: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    fn push(&mut self, byte: u8) -> Option<String> {
        let after_cr = std::mem::replace(&mut self.after_cr, byte == b'\r');
        if byte == b'\n' && after_cr {
            return None;
        }

        self.buf.push(byte);
        match byte {
            b'\r' | b'\n' => {
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                Some(line)
            }
            _ => None,
        }
    }

    fn pending(&self) -> usize {
        self.buf.len()
    }
}

enum Delivery {
    Sent,
    Stalled,
    Closed,
}

fn deliver(sender: &SyncSender<String>, mut line: String, timeout: Duration) -> Delivery {
    let deadline = Instant::now() + timeout;
    loop {
        match sender.try_send(line) {
            Ok(()) => return Delivery::Sent,
            Err(TrySendError::Disconnected(_)) => return Delivery::Closed,
            Err(TrySendError::Full(back)) => {
                if Instant::now() >= deadline {
                    return Delivery::Stalled;
                }
                line = back;
                thread::sleep(SEND_RETRY);
            }
        }
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(
    mut reader: R,
    sender: SyncSender<String>,
    options: &ProcessOptions,
    stalled: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    let send_timeout = options.send_timeout;
    let chunk_size = options.chunk_size.max(1);

    thread::spawn(move || {
        let mut splitter = LineSplitter::default();
        let mut chunk = vec![0u8; chunk_size];

        loop {
            let read = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "reading process output failed");
                    break;
                }
            };

            for &byte in &chunk[..read] {
                let Some(line) = splitter.push(byte) else {
                    continue;
                };
                match deliver(&sender, line, send_timeout) {
                    Delivery::Sent => {}
                    Delivery::Closed => return,
                    Delivery::Stalled => {
                        tracing::error!(
                            timeout = ?send_timeout,
                            "output queue full, abandoning process output"
                        );
                        stalled.store(true, Ordering::Release);
                        return;
                    }
                }
            }
        }

        if splitter.pending() > 0 {
            tracing::debug!(
                bytes = splitter.pending(),
                "discarding unterminated output at end of stream"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn split(input: &[u8]) -> (Vec<String>, usize) {
        let mut splitter = LineSplitter::default();
        let lines = input.iter().filter_map(|&b| splitter.push(b)).collect();
        (lines, splitter.pending())
    }

    #[test]
    fn splits_on_either_terminator() {
        let (lines, pending) = split(b"a\nb\r\nc");
        assert_eq!(lines, vec!["a\n", "b\r"]);
        assert_eq!(pending, 1);
    }

    #[test]
    fn crlf_yields_one_line_ending_in_carriage_return() {
        let (lines, pending) = split(b"a\r\nb\n\r\n");
        assert_eq!(lines, vec!["a\r", "b\n", "\r"]);
        assert_eq!(pending, 0);
    }

    #[test]
    fn progress_updates_split_on_carriage_return() {
        let (lines, _) = split(b"frame=1\rframe=2\rdone\n");
        assert_eq!(lines, vec!["frame=1\r", "frame=2\r", "done\n"]);
    }

    #[test]
    fn blank_lines_are_kept() {
        let (lines, _) = split(b"\n\nx\n");
        assert_eq!(lines, vec!["\n", "\n", "x\n"]);
    }

    #[test]
    fn multibyte_characters_survive() {
        let (lines, _) = split("größe=1\n".as_bytes());
        assert_eq!(lines, vec!["größe=1\n"]);
    }

    #[test]
    fn reader_delivers_in_order_and_drops_partial_tail() {
        let (tx, rx) = mpsc::sync_channel(16);
        let options = ProcessOptions {
            chunk_size: 3,
            ..ProcessOptions::default()
        };
        let stalled = Arc::new(AtomicBool::new(false));
        let handle = spawn_line_reader(
            Cursor::new(b"one\ntwo\r\nthree".to_vec()),
            tx,
            &options,
            Arc::clone(&stalled),
        );
        handle.join().unwrap();

        let lines: Vec<String> = rx.iter().collect();
        assert_eq!(lines, vec!["one\n", "two\r"]);
        assert!(!stalled.load(Ordering::Acquire));
    }

    #[test]
    fn full_queue_stalls_instead_of_dropping() {
        let (tx, rx) = mpsc::sync_channel(2);
        let options = ProcessOptions {
            send_timeout: Duration::from_millis(50),
            ..ProcessOptions::default()
        };
        let stalled = Arc::new(AtomicBool::new(false));
        let handle = spawn_line_reader(
            Cursor::new(b"1\n2\n3\n4\n5\n".to_vec()),
            tx,
            &options,
            Arc::clone(&stalled),
        );
        handle.join().unwrap();

        assert!(stalled.load(Ordering::Acquire));
        let lines: Vec<String> = rx.iter().collect();
        assert_eq!(lines, vec!["1\n", "2\n"]);
    }

    #[test]
    fn unstarted_process_reports_state() {
        let mut process = FfmpegProcess::new(vec!["ffmpeg".to_string()]);
        assert_eq!(process.state().unwrap(), ProcessState::NotStarted);
        assert!(matches!(process.poll(), Err(FfxError::NotStarted)));
        assert!(!process.is_running());

        let mut lines = process.read_lines(false);
        assert!(matches!(lines.next(), Some(Err(FfxError::NotStarted))));
        assert!(lines.next().is_none());
    }

    #[test]
    fn empty_argument_vector_is_rejected() {
        let mut process = FfmpegProcess::new(Vec::new());
        assert!(matches!(
            process.run(),
            Err(FfxError::InvalidCommand { .. })
        ));
    }
}
