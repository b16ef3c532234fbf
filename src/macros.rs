// Logging macros take the logger handle first so nothing in the core reaches
// for a global. Formatting is skipped entirely when the level is disabled.
#[macro_export]
macro_rules! error {
    ($log:expr, $($p:expr),+) => {
        if $log.enabled($crate::logger::ERROR) {
            $log.write($crate::logger::ERROR, format_args!($($p),+))
        }
    }
}
#[macro_export]
macro_rules! warn {
    ($log:expr, $($p:expr),+) => {
        if $log.enabled($crate::logger::WARN) {
            $log.write($crate::logger::WARN, format_args!($($p),+))
        }
    }
}
#[macro_export]
macro_rules! info {
    ($log:expr, $($p:expr),+) => {
        if $log.enabled($crate::logger::INFO) {
            $log.write($crate::logger::INFO, format_args!($($p),+))
        }
    }
}
#[macro_export]
macro_rules! debug {
    ($log:expr, $($p:expr),+) => {
        if $log.enabled($crate::logger::DEBUG) {
            $log.write($crate::logger::DEBUG, format_args!($($p),+))
        }
    }
}
macro_rules! general_err {
    ($($msg:expr),+) => {
        Error::new(crate::ErrorKind::General, None, format!($($msg),+).as_str())
    };
}
macro_rules! config_err {
    ($($msg:expr),+) => {
        Error::new(
            crate::ErrorKind::Config,
            None,
            format!("{} {}", red!("Configuration Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! decode_err {
    ($ctx:expr, $($msg:expr),+) => {
        Error::new(
            crate::ErrorKind::Decode,
            $ctx,
            format!("{} {}", red!("Decode Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! monitor_err {
    ($($msg:expr),+) => {
        Error::new(crate::ErrorKind::Monitor, None, format!($($msg),+).as_str())
    };
}
#[macro_export]
macro_rules! color {
    ($color: literal, $msg: expr) => {
        concat!("\x1b[", $color, "m", $msg, "\x1b[0m")
    };
}
#[macro_export]
macro_rules! red {
    ($msg:expr) => {
        $crate::color!(91, $msg)
    };
}
#[macro_export]
macro_rules! green {
    ($msg:expr) => {
        $crate::color!(92, $msg)
    };
}
#[macro_export]
macro_rules! blue {
    ($msg:expr) => {
        $crate::color!(94, $msg)
    };
}
