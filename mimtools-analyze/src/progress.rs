use std::sync::Mutex;

/// Monotone progress channel for a long-running analysis.
///
/// Values delivered to the callback are non-decreasing integers in `0..=100`.
/// [`ProgressReporter::report`] handles milestones and is clamped to 99; only
/// [`ProgressReporter::finish`] emits the terminal 100, and it does so exactly
/// once no matter how many times it is called or on which path the analysis
/// ends. The callback runs under an internal lock so concurrent workers can
/// never deliver values out of order.
pub struct ProgressReporter {
    callback: Option<Box<dyn Fn(u8) + Send + Sync>>,
    state: Mutex<ProgressState>,
}

struct ProgressState {
    last: u8,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        ProgressReporter {
            callback: Some(Box::new(callback)),
            state: Mutex::new(ProgressState {
                last: 0,
                finished: false,
            }),
        }
    }

    /// A reporter that tracks progress but calls nobody.
    pub fn disabled() -> Self {
        ProgressReporter {
            callback: None,
            state: Mutex::new(ProgressState {
                last: 0,
                finished: false,
            }),
        }
    }

    /// Reports a milestone. Values are clamped to 99 and anything at or below
    /// the last delivered value is dropped.
    pub fn report(&self, pct: u8) {
        let pct = pct.min(99);
        if let Ok(mut state) = self.state.lock() {
            if !state.finished && pct > state.last {
                state.last = pct;
                if let Some(cb) = &self.callback {
                    cb(pct);
                }
            }
        }
    }

    /// Delivers the terminal 100, exactly once.
    pub fn finish(&self) {
        if let Ok(mut state) = self.state.lock() {
            if !state.finished {
                state.finished = true;
                state.last = 100;
                if let Some(cb) = &self.callback {
                    cb(100);
                }
            }
        }
    }

    pub fn last(&self) -> u8 {
        self.state.lock().map(|s| s.last).unwrap_or(0)
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().map(|s| s.finished).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn recording() -> (ProgressReporter, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(move |pct| sink.lock().unwrap().push(pct));
        (reporter, seen)
    }

    #[test]
    fn reports_are_monotone_and_deduplicated() {
        let (reporter, seen) = recording();
        reporter.report(5);
        reporter.report(30);
        reporter.report(30);
        reporter.report(10);
        reporter.report(90);
        reporter.finish();

        assert_eq!(*seen.lock().unwrap(), vec![5, 30, 90, 100]);
    }

    #[test]
    fn report_never_emits_one_hundred() {
        let (reporter, seen) = recording();
        reporter.report(100);
        reporter.report(255);
        assert_eq!(*seen.lock().unwrap(), vec![99]);
        assert!(!reporter.is_finished());
    }

    #[test]
    fn finish_is_idempotent() {
        let (reporter, seen) = recording();
        reporter.report(40);
        reporter.finish();
        reporter.finish();
        reporter.report(50);

        let values = seen.lock().unwrap();
        assert_eq!(*values, vec![40, 100]);
        assert_eq!(values.iter().filter(|&&v| v == 100).count(), 1);
        assert_eq!(reporter.last(), 100);
    }

    #[test]
    fn disabled_reporter_still_tracks_state() {
        let reporter = ProgressReporter::disabled();
        reporter.report(50);
        assert_eq!(reporter.last(), 50);
        reporter.finish();
        assert!(reporter.is_finished());
        assert_eq!(reporter.last(), 100);
    }
}
