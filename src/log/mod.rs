#![allow(unused_macros)]
use self::simple_logger::SimpleLogger;
use std::fmt;
use std::ops::Deref;

mod simple_logger;

macro_rules! logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => (::log::log!(target: $target, ::log::Level::$rule_level, $d($d arg)+));
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        logger_macro!($name is $rule_level to $target, $);
    };
}

logger_macro!(user_warn is Warn to "tsh::user");
logger_macro!(user_info is Info to "tsh::user");

macro_rules! dev_logger_macro {
    ($name:ident is $rule_level:ident to $target:expr, $d:tt) => {
        macro_rules! $name {
            ($d($d arg:tt)+) => {
                if std::cfg!(feature = "dev") {
                    (::log::log!(
                        target: $target,
                        ::log::Level::$rule_level,
                        "{}: {}",
                        std::panic::Location::caller(),
                        format_args!($d($d arg)+)
                    ));
                }
            };
        }

        pub(crate) use $name;
    };
    ($name:ident is $rule_level:ident to $target:expr) => {
        dev_logger_macro!($name is $rule_level to $target, $);
    };
}

dev_logger_macro!(dev_error is Error to "tsh::dev");
dev_logger_macro!(dev_warn is Warn to "tsh::dev");
dev_logger_macro!(dev_info is Info to "tsh::dev");

/// Routes records to a logger per target prefix.
///
/// `tsh::user` goes to stderr and carries the diagnostics enabled by `--verbose`; `tsh::dev` is
/// only wired up when the `dev` feature is enabled.
pub struct ShellLogger {
    loggers: Vec<(String, Box<dyn Log>)>,
    user_level: log::LevelFilter,
}

impl ShellLogger {
    pub fn new(prefix: &'static str) -> Self {
        let mut logger = Self {
            loggers: Vec::new(),
            user_level: log::LevelFilter::Warn,
        };

        logger.add_logger("tsh::user", SimpleLogger::to_stderr(prefix));

        #[cfg(feature = "dev")]
        {
            let path = option_env!("TSH_DEV_LOGS")
                .map(|s| s.into())
                .unwrap_or_else(|| {
                    std::env::temp_dir().join(format!("tsh-dev-{}.log", std::process::id()))
                });
            if let Ok(file_logger) = SimpleLogger::to_file(path, "") {
                logger.add_logger("tsh::dev", file_logger);
            }
        }

        logger
    }

    /// Install this logger as the global logger. User records more verbose than `user_level` are
    /// discarded.
    pub fn into_global_logger(mut self, user_level: log::LevelFilter) {
        self.user_level = user_level;
        let max_level = if cfg!(feature = "dev") {
            log::LevelFilter::Trace
        } else {
            user_level
        };

        // only the first shell of a process gets to install its logger
        if log::set_boxed_logger(Box::new(self)).is_ok() {
            log::set_max_level(max_level);
        }
    }

    /// Add a logger for a specific prefix to the stack
    fn add_logger(
        &mut self,
        prefix: impl ToString + Deref<Target = str>,
        logger: impl Log + 'static,
    ) {
        let prefix = if prefix.ends_with("::") {
            prefix.to_string()
        } else {
            // given a prefix `my::prefix`, we want to match `my::prefix::somewhere`
            // but not `my::prefix_to_somewhere`
            format!("{}::", prefix.to_string())
        };
        self.loggers.push((prefix, Box::new(logger)))
    }
}

impl log::Log for ShellLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        for (prefix, l) in self.loggers.iter() {
            let target = &prefix[..prefix.len() - 2];
            if record.target() == target || record.target().starts_with(prefix.as_str()) {
                if target == "tsh::user" && record.level() > self.user_level {
                    continue;
                }
                let level = match record.level() {
                    log::Level::Error => Level::Error,
                    log::Level::Warn => Level::Warn,
                    log::Level::Info => Level::Info,
                    log::Level::Debug => Level::Debug,
                    log::Level::Trace => Level::Trace,
                };
                l.log(level, record.args());
            }
        }
    }

    fn flush(&self) {
        for (_, l) in self.loggers.iter() {
            l.flush();
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

trait Log: Send + Sync {
    fn log(&self, level: Level, args: &fmt::Arguments<'_>);
    fn flush(&self);
}
