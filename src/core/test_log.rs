// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Log capture for unit tests
//!
//! Records go to a per-thread buffer, so tests running in parallel only see
//! their own output.

use log::{LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::sync::Once;

thread_local! {
    static RECORDS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push(format!("{} {}", record.level(), record.args()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Run `f` and return its result with every record it logged, as
/// `"LEVEL message"`
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });

    RECORDS.with(|records| records.borrow_mut().clear());
    let result = f();
    let records = RECORDS.with(|records| records.take());
    (result, records)
}

/// Records at `WARN` level
pub fn warnings(records: &[String]) -> Vec<&str> {
    records
        .iter()
        .map(String::as_str)
        .filter(|r| r.starts_with("WARN "))
        .collect()
}
