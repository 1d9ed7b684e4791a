use std::time::{Duration, Instant};

use tracing::info;

/// Accumulated duration of one named pipeline step.
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub total: Duration,
    pub count: u32,
}

impl StepTiming {
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count
        }
    }
}

/// Per-step timings in first-seen order.
#[derive(Debug, Default)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        match self.steps.iter_mut().find(|step| step.name == name) {
            Some(step) => {
                step.total += duration;
                step.count += 1;
            }
            None => self.steps.push(StepTiming {
                name,
                total: duration,
                count: 1,
            }),
        }
    }

    pub fn record(&mut self, timer: Timer) {
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.total).sum()
    }

    pub fn get_step(&self, name: &str) -> Option<&StepTiming> {
        self.steps.iter().find(|step| step.name == name)
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn log_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        for step in &self.steps {
            let share = if total > 0.0 {
                step.total.as_secs_f64() / total * 100.0
            } else {
                0.0
            };
            info!(
                step = %step.name,
                count = step.count,
                "{:>10.3}ms total, {:>8.3}ms mean ({:>5.1}%)",
                step.total.as_secs_f64() * 1000.0,
                step.mean().as_secs_f64() * 1000.0,
                share
            );
        }
    }
}

pub struct Timer {
    start: Instant,
    name: &'static str,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    pub fn stop(self) -> (&'static str, Duration) {
        (self.name, self.start.elapsed())
    }
}
