// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rolling history of usage-ratio samples.

use std::collections::VecDeque;

/// Number of usage samples kept by the monitor.
pub const USAGE_HISTORY_LEN: usize = 120;

/// A bounded, oldest-first window of `f64` samples.
#[derive(Debug, Clone)]
pub struct UsageHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for UsageHistory {
    fn default() -> Self {
        Self::with_capacity(USAGE_HISTORY_LEN)
    }
}

impl UsageHistory {
    /// Creates a window holding at most `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, dropping the oldest one when full.
    pub fn push(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Arithmetic mean, `0.0` when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Mean of the newer half minus mean of the older half.
    ///
    /// Positive when usage is climbing.
    pub fn trend(&self) -> f64 {
        let half = self.samples.len() / 2;
        if half == 0 {
            return 0.0;
        }
        let older: f64 = self.samples.iter().take(half).sum::<f64>() / half as f64;
        let newer: f64 = self.samples.iter().rev().take(half).sum::<f64>() / half as f64;
        newer - older
    }

    /// Highest sample, `0.0` when empty.
    pub fn peak(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest_samples() {
        let mut history = UsageHistory::with_capacity(3);
        for sample in [0.1, 0.2, 0.3, 0.4] {
            history.push(sample);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest(), Some(0.4));
        assert!((history.average() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn trend_sign_follows_direction() {
        let mut rising = UsageHistory::default();
        let mut falling = UsageHistory::default();
        for i in 0..10 {
            rising.push(i as f64 * 0.1);
            falling.push(1.0 - i as f64 * 0.1);
        }
        assert!(rising.trend() > 0.0);
        assert!(falling.trend() < 0.0);
        assert!((rising.peak() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn empty_and_non_finite() {
        let mut history = UsageHistory::default();
        history.push(f64::INFINITY);
        assert!(history.is_empty());
        assert_eq!(history.average(), 0.0);
        assert_eq!(history.trend(), 0.0);
        assert_eq!(history.peak(), 0.0);
    }
}
