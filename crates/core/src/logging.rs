//! Centralized logging configuration for the CPU core.
//!
//! # Architecture
//!
//! - **LogConfig**: Thread-safe global configuration using atomic operations
//! - **LogLevel**: Hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: Logging categories (CPU, Interrupts, Decode)
//! - **log()**: Common logging function, rate limited per category
//!
//! Messages that pass the level check and the rate limiter are handed to the
//! [`log`](https://docs.rs/log) facade with the target `emu_6502::<category>`,
//! so the host decides where they end up (`env_logger`, a file, a GUI pane).
//! Level checks are a couple of relaxed atomic loads and the message closure
//! is never called when a category is disabled.
//!
//! # Usage
//!
//! ```rust
//! use emu_6502::logging::{log, LogCategory, LogConfig, LogLevel};
//!
//! LogConfig::global().set_level(LogCategory::Interrupts, LogLevel::Debug);
//! log(LogCategory::Interrupts, LogLevel::Debug, || {
//!     format!("CPU: BRK at PC={:04X}", 0x1234)
//! });
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }

    /// The matching `log` crate level, `None` for `Off`.
    pub fn to_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }
}

/// Log category for the parts of the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Instruction execution (per-instruction trace, reset, halts)
    CPU,
    /// BRK, NMI, IRQ entry and RTI
    Interrupts,
    /// Opcode decoding (illegal opcodes)
    Decode,
}

const CATEGORY_COUNT: usize = 3;

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] =
        [LogCategory::CPU, LogCategory::Interrupts, LogCategory::Decode];

    fn index(self) -> usize {
        match self {
            LogCategory::CPU => 0,
            LogCategory::Interrupts => 1,
            LogCategory::Decode => 2,
        }
    }

    /// Target string used with the `log` facade.
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::CPU => "emu_6502::cpu",
            LogCategory::Interrupts => "emu_6502::interrupts",
            LogCategory::Decode => "emu_6502::decode",
        }
    }

    /// Environment variable holding this category's level override.
    pub fn env_var(self) -> &'static str {
        match self {
            LogCategory::CPU => "EMU_LOG_CPU",
            LogCategory::Interrupts => "EMU_LOG_INTERRUPTS",
            LogCategory::Decode => "EMU_LOG_DECODE",
        }
    }
}

/// Environment variable holding the global level.
pub const ENV_GLOBAL_LEVEL: &str = "EMU_LOG_LEVEL";

/// Default maximum messages per second per category.
pub const DEFAULT_RATE_LIMIT: usize = 60;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Window {
    /// Timestamps of recent messages
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

/// Sliding-window rate limiter, one window per category.
struct RateLimiter {
    max_per_second: AtomicUsize,
    window_duration: Duration,
    windows: Mutex<[Window; CATEGORY_COUNT]>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            window_duration: Duration::from_secs(1),
            windows: Mutex::new(Default::default()),
        }
    }

    /// Returns (allowed, dropped) where `dropped` is `Some(n)` when a
    /// summary of `n` dropped messages is due.
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut windows = lock(&self.windows);
        let w = &mut windows[category.index()];

        while let Some(&front) = w.timestamps.front() {
            if now.duration_since(front) > self.window_duration {
                w.timestamps.pop_front();
            } else {
                break;
            }
        }

        if w.timestamps.len() < self.max_per_second.load(Ordering::Relaxed) {
            w.timestamps.push_back(now);
            if w.dropped > 0 {
                let dropped = std::mem::take(&mut w.dropped);
                w.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        w.dropped += 1;
        let report_due = w
            .last_drop_report
            .map_or(true, |last| now.duration_since(last) >= self.window_duration);
        if report_due {
            let dropped = std::mem::take(&mut w.dropped);
            w.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    /// Global log level (applies to all categories unless overridden)
    global_level: AtomicU8,
    /// Per-category overrides, `Off` meaning "use the global level"
    levels: [AtomicU8; CATEGORY_COUNT],
    rate_limiter: RateLimiter,
}

impl LogConfig {
    /// All logging disabled, default rate limit.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            levels: [
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
                AtomicU8::new(LogLevel::Off as u8),
            ],
            rate_limiter: RateLimiter::new(DEFAULT_RATE_LIMIT),
        }
    }

    /// Get the global singleton instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Set log level for a specific category
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    /// Get log level for a specific category
    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.levels[category.index()].load(Ordering::Relaxed))
    }

    /// Check if a message should be logged for the given category and level
    ///
    /// A category level other than `Off` wins; otherwise the global level
    /// decides.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let category_level = self.get_level(category);
        if category_level != LogLevel::Off {
            level <= category_level
        } else {
            level <= self.get_global_level()
        }
    }

    /// Reset all logging to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    /// Set the maximum logs per second per category
    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .max_per_second
            .store(max_logs_per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.rate_limiter.max_per_second.load(Ordering::Relaxed)
    }

    /// Read levels from `EMU_LOG_LEVEL` and the per-category variables
    /// (`EMU_LOG_CPU`, `EMU_LOG_INTERRUPTS`, `EMU_LOG_DECODE`). Unset or
    /// unparsable variables leave the current setting alone.
    pub fn apply_env(&self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars<F: Fn(&str) -> Option<String>>(&self, get: F) {
        if let Some(level) = get(ENV_GLOBAL_LEVEL).and_then(|v| LogLevel::from_str(&v)) {
            self.set_global_level(level);
        }
        for category in LogCategory::ALL {
            if let Some(level) = get(category.env_var()).and_then(|v| LogLevel::from_str(&v)) {
                self.set_level(category, level);
            }
        }
    }

    fn emit(&self, category: LogCategory, level: LogLevel, message: &str) {
        if let Some(level) = level.to_log_level() {
            log::log!(target: category.target(), level, "{}", message);
        }
    }
}

/// Log a message with the specified category and level
///
/// The message is lazily evaluated via a closure, so formatting only happens
/// when the category is enabled at `level` and the category's rate limit
/// has room. When messages are dropped a one-line summary is emitted at
/// `Warn` once the window allows it.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }
    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.emit(
            category,
            LogLevel::Warn,
            &format!(
                "[{:?}] rate limit exceeded, {} log message(s) dropped in the last second",
                category, count
            ),
        );
    }
    if allowed {
        config.emit(category, level, &message_fn());
    }
}
