//! Process termination capability used by the fatal path.

use std::sync::Mutex;

/// Exit code used by `fatal` and the panic hook
pub const FATAL_EXIT_CODE: i32 = 1;

/// Ends the process. Injected so the fatal path can run under test.
pub trait Terminator: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Calls `std::process::exit`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, code: i32) {
        std::process::exit(code)
    }
}

/// Records requested exit codes instead of exiting
#[derive(Debug, Default)]
pub struct RecordingTerminator {
    codes: Mutex<Vec<i32>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codes(&self) -> Vec<i32> {
        self.codes
            .lock()
            .map(|codes| codes.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn terminated(&self) -> bool {
        !self.codes().is_empty()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.codes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(code);
    }
}

/// Returned by `Logger::fatal` once the entry is written and termination
/// was requested.
#[must_use = "a fatal log is a terminal transition; exit with `Fatal::exit` or return it"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal {
    pub exit_code: i32,
}

impl Fatal {
    pub fn new(exit_code: i32) -> Self {
        Self { exit_code }
    }

    pub fn exit(self) -> ! {
        std::process::exit(self.exit_code)
    }
}
