use std::cell::RefCell;
use std::future::Future;
use std::{sync::Arc, sync::OnceLock};

use crate::primitives::config::{configured_environment, KeyStateEnvironment};

thread_local! {
    static THREAD_LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

tokio::task_local! {
    /// Task-local logging context. Takes precedence over the thread-local one inside a scope.
    pub static LOG_CONTEXT: RefCell<Option<String>>;
}

/// Logger implemented by the host platform.
///
/// Everything this library logs through the `log` facade ends up here once
/// [`set_logger`] has been called.
///
/// ```rust
/// use keystate::primitives::logger::{LogLevel, Logger};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class KeyStateLoggerBridge: KeyState.Logger {
///     func log(level: KeyState.LogLevel, message: String) {
///         Log.log(level.toCoreLevel(), message)
///     }
/// }
///
/// KeyState.setLogger(logger: KeyStateLoggerBridge())
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs a message at the given level.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very low priority, extremely detailed messages
    Trace,
    /// Debugging information
    Debug,
    /// Progress of the migration run
    Info,
    /// Potentially harmful situations
    Warn,
    /// Failures
    Error,
}

/// Forwards `log` records to the host's [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records are only forwarded when they come from this crate and the
/// library runs in `Staging`.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    if level < log::Level::Debug {
        return true;
    }

    let is_from_keystate =
        module_path.is_some_and(|module_path| module_path.starts_with("keystate"));
    let is_staging = configured_environment() == Some(KeyStateEnvironment::Staging);

    is_from_keystate && is_staging
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Sets the global logger.
///
/// Should be called once, before [`crate::migration::MigrationController::migrate_if_needed`].
/// Later calls are ignored.
#[allow(clippy::module_name_repetitions)]
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to install logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Logs a debug-level message, prefixed with the current [`LogContext`]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::debug!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::debug!($($arg)*)
        }
    };
}

/// Logs an info-level message, prefixed with the current [`LogContext`]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::info!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::info!($($arg)*)
        }
    };
}

/// Logs a warning, prefixed with the current [`LogContext`]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::warn!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::warn!($($arg)*)
        }
    };
}

/// Logs an error, prefixed with the current [`LogContext`]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        if let Some(ctx) = $crate::primitives::logger::get_context() {
            log::error!("{} {}", ctx, format_args!($($arg)*))
        } else {
            log::error!($($arg)*)
        }
    };
}

/// Which storage a [`LogContext`] wrote to, so `Drop` restores the right one.
enum LogContextStorage {
    TaskLocal,
    ThreadLocal,
}

/// Scope guard that sets the logging context and restores the previous one on drop.
///
/// ```rust
/// use keystate::primitives::logger::{get_context, LogContext};
///
/// {
///     let _ctx = LogContext::new("MigrationController");
///     assert_eq!(get_context().as_deref(), Some("[KeyState][MigrationController]"));
/// }
/// assert_eq!(get_context(), None);
/// ```
pub struct LogContext {
    previous: Option<String>,
    storage: LogContextStorage,
}

impl LogContext {
    /// Activates `[KeyState][<module>]` until the returned guard is dropped.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let new_context = Some(format!("[KeyState][{module}]"));

        // task_local survives .await points; thread_local covers sync callers
        match LOG_CONTEXT.try_with(|ctx| ctx.replace(new_context.clone())) {
            Ok(previous) => Self {
                previous,
                storage: LogContextStorage::TaskLocal,
            },
            Err(_) => Self {
                previous: THREAD_LOG_CONTEXT.with(|ctx| ctx.replace(new_context)),
                storage: LogContextStorage::ThreadLocal,
            },
        }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        let previous = self.previous.take();
        match self.storage {
            LogContextStorage::TaskLocal => {
                let _ = LOG_CONTEXT.try_with(|ctx| ctx.replace(previous));
            }
            LogContextStorage::ThreadLocal => {
                THREAD_LOG_CONTEXT.with(|ctx| ctx.replace(previous));
            }
        }
    }
}

/// Runs `future` inside a task-local logging context of `[KeyState][<module>]`.
///
/// The context moves with the task across `.await` points and worker threads, and ends
/// with the future. `#[keystate_export]` wraps every exported async method in it.
pub async fn in_log_context<T, F>(module: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let context = RefCell::new(Some(format!("[KeyState][{module}]")));
    LOG_CONTEXT.scope(context, future).await
}

/// Gets the current logging context, if any.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT
        .try_with(|ctx| ctx.borrow().clone())
        .unwrap_or_else(|_| THREAD_LOG_CONTEXT.with(|ctx| ctx.borrow().clone()))
}
