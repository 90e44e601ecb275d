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

use flume::{Receiver, Sender, TrySendError};

/// A thread-safe event channel, generic over the transported event type.
///
/// The bus can be bounded: when the consumer falls behind, new events are
/// dropped rather than blocking the producer.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Creates a bus that holds at most `capacity` undelivered events.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        Self { sender, receiver }
    }

    /// Publishes an event without blocking. Returns `false` if it was dropped.
    pub fn publish(&self, event: T) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("EventBus full, dropping event.");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::error!("EventBus receiver disconnected, dropping event.");
                false
            }
        }
    }

    /// Returns a clone of the sending end.
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// Returns the receiving end.
    pub fn receiver(&self) -> &Receiver<T> {
        &self.receiver
    }

    /// Removes and returns every pending event.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
