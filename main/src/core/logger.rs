//! A background-thread logger attaching simulation context (current
//! simulated time, when on a worker) to every record: records are pushed
//! into a lock-free queue and drained by a dedicated thread so hot worker
//! threads never block on I/O.

use std::io::Write;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam::queue::ArrayQueue;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::{Lazy, OnceCell};

use crate::core::support::simulation_time::SimulationTime;
use crate::core::worker::Worker;

const ASYNC_FLUSH_QD_LINES_THRESHOLD: usize = 10_000;
const SYNC_FLUSH_QD_LINES_THRESHOLD: usize = 10 * ASYNC_FLUSH_QD_LINES_THRESHOLD;
const MIN_FLUSH_FREQUENCY: Duration = Duration::from_secs(10);

static LOGGER: Lazy<NetsimLogger> = Lazy::new(NetsimLogger::new);
static START: Lazy<Instant> = Lazy::new(Instant::now);

pub fn init(max_log_level: LevelFilter) -> Result<(), SetLoggerError> {
    Lazy::force(&START);
    LOGGER.max_log_level.set(max_log_level).ok();
    log::set_logger(&*LOGGER)?;
    log::set_max_level(LevelFilter::Trace);

    std::thread::Builder::new()
        .name("netsim-logger".to_string())
        .spawn(|| LOGGER.run())
        .expect("failed to spawn logger thread");

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        LOGGER.flush_records(None);
        default_hook(info);
    }));

    Ok(())
}

enum Command {
    Flush(Option<Sender<()>>),
}

struct LogRecord {
    level: Level,
    target: String,
    message: String,
    elapsed: Duration,
    sim_time: Option<SimulationTime>,
    thread_name: String,
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>12.6}s ", self.elapsed.as_secs_f64())?;
        match self.sim_time {
            Some(t) => write!(f, "[sim {:>15}ns] ", t.as_nanos())?,
            None => write!(f, "[sim n/a] ")?,
        }
        writeln!(f, "[{}] [{}] [{}] {}", self.thread_name, self.level, self.target, self.message)
    }
}

pub struct NetsimLogger {
    command_tx: Mutex<Sender<Command>>,
    command_rx: Mutex<Receiver<Command>>,
    records: ArrayQueue<LogRecord>,
    max_log_level: OnceCell<LevelFilter>,
}

impl NetsimLogger {
    fn new() -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        Self {
            command_tx: Mutex::new(tx),
            command_rx: Mutex::new(rx),
            records: ArrayQueue::new(SYNC_FLUSH_QD_LINES_THRESHOLD),
            max_log_level: OnceCell::new(),
        }
    }

    fn max_level(&self) -> LevelFilter {
        self.max_log_level.get().copied().unwrap_or(LevelFilter::Info)
    }

    fn run(&self) {
        let rx = self.command_rx.lock().unwrap();
        loop {
            use std::sync::mpsc::RecvTimeoutError;
            match rx.recv_timeout(MIN_FLUSH_FREQUENCY) {
                Ok(Command::Flush(done)) => self.flush_records(done),
                Err(RecvTimeoutError::Timeout) => self.flush_records(None),
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn flush_records(&self, done: Option<Sender<()>>) {
        let stdout = std::io::stdout();
        let mut out = std::io::BufWriter::new(stdout.lock());
        while let Some(record) = self.records.pop() {
            let _ = write!(out, "{record}");
        }
        let _ = out.flush();
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    fn flush_sync(&self) {
        let (tx, rx) = std::sync::mpsc::channel();
        self.send(Command::Flush(Some(tx)));
        let _ = rx.recv();
    }

    fn send(&self, cmd: Command) {
        if let Ok(tx) = self.command_tx.lock() {
            let _ = tx.send(cmd);
        }
    }
}

impl Log for NetsimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let sim_time = Worker::with(|ctx| ctx.clock.now);
        let thread_name = std::thread::current().name().unwrap_or("?").to_string();

        let mut entry = LogRecord {
            level: record.level(),
            target: record.target().to_string(),
            message: std::fmt::format(*record.args()),
            elapsed: START.elapsed(),
            sim_time,
            thread_name,
        };

        loop {
            match self.records.push(entry) {
                Ok(()) => break,
                Err(r) => {
                    entry = r;
                    self.flush_sync();
                }
            }
        }

        if record.level() == Level::Error || self.records.len() > ASYNC_FLUSH_QD_LINES_THRESHOLD {
            self.flush_sync();
        } else {
            self.send(Command::Flush(None));
        }
    }

    fn flush(&self) {
        self.flush_sync();
    }
}
