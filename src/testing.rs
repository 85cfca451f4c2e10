//! Scripted host adapters for unit tests

use crate::domain::ports::{CommandExecutor, CommandOutput, DeviceLookup};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    LaunchError(String),
}

struct Rule {
    pattern: Vec<String>,
    replies: VecDeque<Reply>,
}

/// Executor replying from a script and recording every invocation
///
/// Commands are matched by the longest token prefix (program included).
/// Replies queued for a pattern are handed out in order; the last one
/// repeats.
#[derive(Default)]
pub struct FakeExecutor {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, pattern: &[&str], output: CommandOutput) -> &Self {
        self.push(pattern, Reply::Output(output))
    }

    pub fn on_ok(&self, pattern: &[&str], output: &str) -> &Self {
        self.on(pattern, CommandOutput::ok(output))
    }

    pub fn on_launch_error(&self, pattern: &[&str], reason: &str) -> &Self {
        self.push(pattern, Reply::LaunchError(reason.to_string()))
    }

    fn push(&self, pattern: &[&str], reply: Reply) -> &Self {
        let pattern: Vec<String> = pattern.iter().map(|s| s.to_string()).collect();
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => rule.replies.push_back(reply),
            None => rules.push(Rule {
                pattern,
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    /// Every invocation so far, program first
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Number of invocations starting with `prefix`
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| starts_with(c, prefix))
            .count()
    }
}

fn starts_with(call: &[String], prefix: &[&str]) -> bool {
    call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b)
}

impl CommandExecutor for FakeExecutor {
    fn execute(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().push(call.clone());

        let mut rules = self.rules.lock();
        let rule = rules
            .iter_mut()
            .filter(|r| {
                let prefix: Vec<&str> = r.pattern.iter().map(String::as_str).collect();
                starts_with(&call, &prefix)
            })
            .max_by_key(|r| r.pattern.len());

        let reply = match rule {
            Some(rule) if rule.replies.len() > 1 => rule.replies.pop_front(),
            Some(rule) => rule.replies.front().cloned(),
            None => None,
        };

        match reply {
            Some(Reply::Output(out)) => Ok(out),
            Some(Reply::LaunchError(reason)) => Err(io::Error::new(io::ErrorKind::NotFound, reason)),
            None => Ok(CommandOutput::failed(127, format!("unexpected command: {}", call.join(" ")))),
        }
    }
}

/// Device namespace where paths show up after a number of misses
#[derive(Default)]
pub struct FakeDevices {
    pending: Mutex<HashMap<PathBuf, u32>>,
    stats: Mutex<Vec<PathBuf>>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn present(&self, path: &str) -> &Self {
        self.appear_after(path, 0)
    }

    /// `path` fails `misses` stats before it exists
    pub fn appear_after(&self, path: &str, misses: u32) -> &Self {
        self.pending.lock().insert(PathBuf::from(path), misses);
        self
    }

    pub fn stats(&self) -> Vec<PathBuf> {
        self.stats.lock().clone()
    }
}

impl DeviceLookup for FakeDevices {
    fn stat(&self, path: &Path) -> io::Result<()> {
        self.stats.lock().push(path.to_path_buf());

        let mut pending = self.pending.lock();
        match pending.get_mut(path) {
            Some(0) => Ok(()),
            Some(misses) => {
                *misses -= 1;
                Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
            }
            None => Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory")),
        }
    }
}
