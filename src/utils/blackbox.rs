//! Flight recorder for the operator loop.
//!
//! Keeps the most recent tick summaries, chain-access failures and task
//! failures in memory. On panic (or Ctrl-C from `main`) the ring is written to
//! `operator_crash_<ms>.json` so the last minutes before an outage survive the
//! process.

use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_CAPACITY: usize = 512;
const CAPACITY_BOUNDS: (usize, usize) = (16, 50_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Startup,
    Tick,
    ChainAccess,
    TaskFailure,
    Signal,
    Panic,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlightEvent {
    pub at_ms: u64,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Serialize)]
struct FlightDump<'a> {
    trigger: &'a str,
    written_at_ms: u64,
    capacity: usize,
    events: &'a [FlightEvent],
}

struct Recorder {
    capacity: usize,
    events: Mutex<VecDeque<FlightEvent>>,
}

impl Recorder {
    fn from_env() -> Self {
        let capacity = std::env::var("BLACKBOX_BUFFER_SIZE")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .map(|n| n.clamp(CAPACITY_BOUNDS.0, CAPACITY_BOUNDS.1))
            .unwrap_or(DEFAULT_CAPACITY);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    // A panic while holding the lock must not disable the recorder.
    fn events(&self) -> MutexGuard<'_, VecDeque<FlightEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, kind: EventKind, detail: String) {
        let mut events = self.events();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(FlightEvent {
            at_ms: unix_ms(),
            kind,
            detail,
        });
    }
}

fn recorder() -> &'static Recorder {
    static RECORDER: OnceLock<Recorder> = OnceLock::new();
    RECORDER.get_or_init(Recorder::from_env)
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

pub fn record(kind: EventKind, detail: impl Into<String>) {
    recorder().push(kind, detail.into());
}

pub fn snapshot() -> Vec<FlightEvent> {
    recorder().events().iter().cloned().collect()
}

pub fn capacity() -> usize {
    recorder().capacity
}

fn write_dump(dir: &Path, trigger: &str) -> Option<PathBuf> {
    let events = snapshot();
    let written_at_ms = unix_ms();
    let body = serde_json::to_vec_pretty(&FlightDump {
        trigger,
        written_at_ms,
        capacity: capacity(),
        events: &events,
    })
    .ok()?;
    let path = dir.join(format!("operator_crash_{written_at_ms}.json"));
    std::fs::write(&path, body).ok()?;
    Some(path)
}

/// Writes the ring to `BLACKBOX_DUMP_DIR` (default: working directory).
pub fn dump(trigger: &str) -> Option<PathBuf> {
    let dir = std::env::var_os("BLACKBOX_DUMP_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    write_dump(&dir, trigger)
}

pub fn install_panic_hook_once() {
    static HOOKED: OnceLock<()> = OnceLock::new();
    HOOKED.get_or_init(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            record(EventKind::Panic, info.to_string());
            match dump("panic") {
                Some(path) => eprintln!("[BLACKBOX] flight recorder written to {}", path.display()),
                None => eprintln!("[BLACKBOX] flight recorder dump failed"),
            }
            default_hook(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::{capacity, record, snapshot, write_dump, EventKind};

    #[test]
    fn test_ring_never_exceeds_capacity() {
        for i in 0..(capacity() + 25) {
            record(EventKind::Tick, format!("walked tick {i}"));
        }
        let events = snapshot();
        assert!(events.len() <= capacity());
        assert!(events.iter().any(|e| e.kind == EventKind::Tick));
    }

    #[test]
    fn test_dump_writes_json_with_trigger() {
        record(EventKind::Signal, "ctrl_c_received");
        let dir = std::env::temp_dir();
        let path = write_dump(&dir, "unit-test").expect("temp dir is writable");
        let body = std::fs::read_to_string(&path).expect("dump readable");
        let _ = std::fs::remove_file(&path);
        assert!(body.contains("\"trigger\": \"unit-test\""));
        assert!(body.contains("\"events\""));
    }
}
