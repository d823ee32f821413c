use std::io::{self, Write};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Runs alone in this binary: both the log bridge and the subscriber are process-wide.
#[test]
fn log_bridge_failure_is_reported_once_logging_is_up() {
    tracing_log::LogTracer::init().unwrap();
    let logs = CapturedLogs::default();
    let writer = logs.clone();

    rabbit_listen::config::init_logging_with(move || writer.clone()).unwrap();

    assert!(
        logs.contents().contains("failure to bridge log records into tracing"),
        "{}",
        logs.contents()
    );
}
