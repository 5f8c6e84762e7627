use ordered_pipe::Task;
use std::sync::{Arc, Mutex, Once};

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

pub type Log = Arc<Mutex<Vec<u64>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(log: &Log, seq: u64) -> Task {
    let log = log.clone();
    Task::infallible(move || log.lock().unwrap().push(seq)).with_name(format!("record-{seq}"))
}
