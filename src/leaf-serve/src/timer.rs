use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Wall-clock timer for a named pipeline stage
pub struct Timer {
    name: String,
    tstamp: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

impl Timer {
    /// Create a stopped timer
    pub fn new(name: &str) -> Self {
        Timer {
            name: name.to_owned(),
            tstamp: None,
            duration: None,
        }
    }

    pub fn new_start(name: &str) -> Self {
        let mut t = Timer::new(name);
        t.start();
        t
    }

    pub fn start(&mut self) {
        debug!("{}: starting", self.name);

        self.tstamp = Some(Utc::now());
        self.duration = None;
    }

    /// Stop the timer and log how long the stage took
    pub fn stop(&mut self) {
        match self.tstamp.take() {
            None => debug!("{}: not running!", self.name),
            Some(tstamp) => {
                let d = Utc::now() - tstamp;
                self.duration = Some(d);
                info!("{} duration: {} msec", self.name, d.num_milliseconds());
            }
        }
    }

    /// Milliseconds measured by the last start/stop pair, 0 if never stopped
    pub fn millis(&self) -> i64 {
        self.duration.map_or(0, |d| d.num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_records_nothing() {
        let mut t = Timer::new("idle");
        t.stop();
        assert_eq!(t.millis(), 0);
        assert!(t.duration.is_none());
    }

    #[test]
    fn restart_clears_previous_measurement() {
        let mut t = Timer::new_start("stage");
        t.stop();
        assert!(t.duration.is_some());
        assert!(t.millis() >= 0);

        t.start();
        assert!(t.duration.is_none());
        assert_eq!(t.millis(), 0);

        // A second stop on a stopped timer keeps the measurement
        t.stop();
        assert!(t.duration.is_some());
        t.stop();
        assert!(t.duration.is_some());
    }
}
