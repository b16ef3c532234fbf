use super::*;
use regex::Regex;
use std::fs::File;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

pub const NONE: u8 = 0;
pub const ERROR: u8 = 0x01;
pub const WARN: u8 = 0x02;
pub const INFO: u8 = 0x04;
pub const DEBUG: u8 = 0x08;
pub const ALL: u8 = ERROR | WARN | INFO | DEBUG;

pub const DEFAULT_LOGLEVEL: &str = "error|warning";

lazy_static! {
    static ref RE_LOGLEVEL: Regex = Regex::new(r"([^|]+)").unwrap();
    static ref DEFAULT_LOGGER: Logger = Logger::new(DEFAULT_LOGLEVEL).unwrap_or_else(|_| Logger::with_level(ERROR | WARN));
}

/// Process-wide default logger. Only the outermost layer (the runner) should
/// use this; everything else receives a handle at construction.
pub fn default_logger() -> Logger { DEFAULT_LOGGER.clone() }

fn to_loglevel(name: &str) -> Option<u8> {
    match name {
        "" | "none" => Some(NONE),
        "error" => Some(ERROR),
        "warning" | "warn" => Some(WARN),
        "info" => Some(INFO),
        "debug" => Some(DEBUG),
        "all" => Some(ALL),
        _ => None,
    }
}

/// Parse a level specification such as `"error|warning|info"` into a bitmask.
pub fn parse_loglevel(levels: &str) -> Result<u8, Error> {
    let mut lv = NONE;
    for cap in RE_LOGLEVEL.captures_iter(levels) {
        let name = cap[1].trim();
        match to_loglevel(name) {
            Some(l) => lv |= l,
            None => {
                return Err(config_err!(
                    "Invalid log level: \"{}\", complete log level specification: \"{}\"",
                    name,
                    levels
                ))
            }
        }
    }
    Ok(lv)
}

struct Inner {
    level: AtomicU8,
    sink: Mutex<Box<dyn Write + Send>>,
}

/// Cloneable logger handle. Clones share the level and the output sink.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Logger writing to stderr with the given level specification.
    pub fn new(levels: &str) -> Result<Logger, Error> { Ok(Logger::with_level(parse_loglevel(levels)?)) }

    pub fn with_level(level: u8) -> Logger { Logger::with_sink(level, Box::new(io::stderr())) }

    pub fn with_sink(level: u8, sink: Box<dyn Write + Send>) -> Logger {
        Logger {
            inner: Arc::new(Inner {
                level: AtomicU8::new(level),
                sink: Mutex::new(sink),
            }),
        }
    }

    /// A logger that discards everything.
    pub fn silent() -> Logger { Logger::with_sink(NONE, Box::new(io::sink())) }

    pub fn set_loglevel(&self, levels: &str) -> Result<(), Error> {
        self.inner.level.store(parse_loglevel(levels)?, Ordering::Relaxed);
        Ok(())
    }

    pub fn loglevel(&self) -> u8 { self.inner.level.load(Ordering::Relaxed) }

    /// Redirect output to a file. An empty name keeps the current sink.
    pub fn set_logfile(&self, fname: &str) -> Result<(), Error> {
        if fname.is_empty() {
            return Ok(());
        }
        let file = File::create(fname).map_err(|e| {
            Error::new(ErrorKind::IO, None, format!("Can't open logfile: {}: {}", fname, e).as_str())
        })?;
        if let Ok(mut sink) = self.inner.sink.lock() {
            *sink = Box::new(file);
        }
        Ok(())
    }

    pub fn enabled(&self, lv: u8) -> bool { self.loglevel() & lv != 0 }
    pub fn is_debug(&self) -> bool { self.enabled(DEBUG) }

    pub fn write(&self, lv: u8, args: std::fmt::Arguments) {
        let msg = args.to_string();
        if msg.is_empty() || !self.enabled(lv) {
            return;
        }
        let color = match lv {
            ERROR => "\x1b[97;41m",
            WARN => "\x1b[93m",
            DEBUG => "\x1b[92m",
            _ => "\x1b[0m",
        };
        if let Ok(mut sink) = self.inner.sink.lock() {
            // a failing sink must not take the emulation down with it
            let _ = writeln!(sink, "{}{}\x1b[0m", color, msg.trim_end_matches('\n'));
            let _ = sink.flush();
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result { write!(f, "Logger({:#04x})", self.loglevel()) }
}
