#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use chrono::TimeDelta;
use jobloop::clock::ManualClock;
use jobloop::unit::{ResumableUnit, SourceFetcher};
use serde_json::{json, Value};

/// One scripted reaction of a [`ScriptedUnit`].
#[derive(Debug, Clone)]
pub enum Script {
    Yield(Value),
    Fail(String),
    End,
}

/// A unit that replays a fixed script instead of doing real work.
///
/// - Every call to `step` is counted (shared across clones of the counter),
///   so tests can assert that a gated job never touched its unit.
/// - Optionally advances a `ManualClock` on each call, which lets tests
///   exercise the working-time budget deterministically.
/// - Once the script runs out, the unit reports end of sequence forever.
#[derive(Debug)]
pub struct ScriptedUnit {
    script: VecDeque<Script>,
    calls: Arc<AtomicUsize>,
    clock: Option<(ManualClock, TimeDelta)>,
}

impl ScriptedUnit {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: script.into(),
            calls: Arc::new(AtomicUsize::new(0)),
            clock: None,
        }
    }

    /// Yields `0..n` as JSON numbers, then ends.
    pub fn yields(n: usize) -> Self {
        Self::new((0..n).map(|i| Script::Yield(json!(i))).collect())
    }

    /// Fails on every call.
    pub fn always_failing(times: usize) -> Self {
        Self::new(
            (0..times)
                .map(|i| Script::Fail(format!("scripted failure {i}")))
                .collect(),
        )
    }

    /// Advance `clock` by `per_step` each time the unit is invoked.
    pub fn advancing(mut self, clock: ManualClock, per_step: TimeDelta) -> Self {
        self.clock = Some((clock, per_step));
        self
    }

    /// Counter of `step` calls; keep it before boxing the unit.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn boxed(self) -> Box<dyn ResumableUnit> {
        Box::new(self)
    }
}

impl ResumableUnit for ScriptedUnit {
    fn step(&mut self) -> Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((clock, per_step)) = &self.clock {
            clock.advance(*per_step);
        }

        match self.script.pop_front() {
            Some(Script::Yield(value)) => Ok(Some(value)),
            Some(Script::Fail(msg)) => Err(anyhow!(msg)),
            Some(Script::End) | None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("scripted({} left)", self.script.len())
    }
}

/// Read a shared call counter.
pub fn call_count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

/// One scripted answer of a [`ScriptedFetcher`].
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
}

/// In-memory [`SourceFetcher`] replaying per-URL answers in order.
///
/// Clones share the script and the request log. A URL with no answer left
/// fails like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFetcher {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, url: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl SourceFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Status(code)) => bail!("{url} returned {code}"),
            None => bail!("connection refused: {url}"),
        }
    }
}
