// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;

use crate::Packet;

/// A router input FIFO with hardware-like read/write visibility.
///
/// A FIFO cannot be written and read for the same packet within one cycle.
/// Two latched flags model this:
///  - `available`: the FIFO held a packet at the start of the cycle, so its
///    head may be read during this cycle. Packets written during the cycle
///    stay invisible until the next [`PortBuffer::commit_cycle`].
///  - `sent`: a packet was read during this cycle. Its slot is only released
///    at commit, so a full FIFO that was read this cycle still reports full.
///
/// ```text
///  cycle t                                  | commit | cycle t+1
///  push(p) -> queue=[p], available=false     |        | available=true, peek()=p
///  pop()   -> queue=[],  sent=true, full=yes |        | sent=false,     full=no
/// ```
#[derive(Debug)]
pub struct PortBuffer {
    queue: VecDeque<Packet>,
    /// `None` for the unbounded local injection port.
    capacity: Option<usize>,
    available: bool,
    sent: bool,
}

impl PortBuffer {
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "a bounded port needs at least one slot");
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
            available: false,
            sent: false,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: None,
            available: false,
            sent: false,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Actual number of packets held, regardless of visibility.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the head packet may be sent during the current cycle.
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn packet_sent(&self) -> bool {
        self.sent
    }

    /// Occupancy as seen during the current cycle: a slot freed by a read this
    /// cycle is still counted.
    pub fn visible_occupancy(&self) -> usize {
        self.queue.len() + usize::from(self.sent)
    }

    pub fn is_full(&self) -> bool {
        match self.capacity {
            Some(capacity) => self.visible_occupancy() >= capacity,
            None => false,
        }
    }

    /// At or above half of the capacity (rounded up). Never true for the
    /// unbounded port.
    pub fn is_half_full(&self) -> bool {
        match self.capacity {
            Some(capacity) => 2 * self.visible_occupancy() >= capacity,
            None => false,
        }
    }

    /// Append `packet`, or hand it back if the FIFO is full this cycle.
    pub fn push(&mut self, packet: Packet) -> Result<(), Packet> {
        if self.is_full() {
            return Err(packet);
        }
        self.queue.push_back(packet);
        Ok(())
    }

    /// Append `packet` at commit time, when the slots read during the cycle have
    /// been released. Only the actual occupancy is checked; callers decide
    /// whether the port may take the packet in this cycle.
    pub fn refill(&mut self, packet: Packet) -> Result<(), Packet> {
        match self.capacity {
            Some(capacity) if self.queue.len() >= capacity => Err(packet),
            _ => {
                self.queue.push_back(packet);
                Ok(())
            }
        }
    }

    /// The head packet, if it can be sent this cycle. At most one packet
    /// leaves a FIFO per cycle.
    pub fn peek(&self) -> Option<&Packet> {
        if self.available && !self.sent {
            self.queue.front()
        } else {
            None
        }
    }

    /// Remove the head packet. Only valid when [`PortBuffer::peek`] returned a
    /// packet during this cycle.
    pub fn pop(&mut self) -> Packet {
        assert!(
            self.available && !self.sent,
            "removing a packet from a buffer with nothing to send this cycle"
        );
        match self.queue.pop_front() {
            Some(packet) => {
                self.sent = true;
                packet
            }
            None => panic!("removing a packet from an empty buffer"),
        }
    }

    /// Undo a [`PortBuffer::pop`] whose hand-off was refused downstream.
    pub fn requeue(&mut self, packet: Packet) {
        assert!(self.sent, "requeue without a preceding pop");
        self.queue.push_front(packet);
        self.sent = false;
    }

    /// Latch the state for the next cycle. Must only run once every router has
    /// finished sending for the current cycle.
    pub fn commit_cycle(&mut self) {
        self.available = !self.queue.is_empty();
        self.sent = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn packet(source: usize) -> Packet {
        Packet::new(source, Coordinate::new(0, 0), Coordinate::new(1, 1), 0)
    }

    #[test]
    fn test_written_packet_invisible_until_commit() {
        let mut buffer = PortBuffer::bounded(2);
        assert!(buffer.push(packet(1)).is_ok());
        assert_eq!(buffer.len(), 1);
        assert!(buffer.peek().is_none());
        buffer.commit_cycle();
        assert_eq!(buffer.peek().map(|p| p.source()), Some(1));
    }

    #[test]
    fn test_full_buffer_stays_full_in_cycle_of_send() {
        let mut buffer = PortBuffer::bounded(2);
        assert!(buffer.push(packet(1)).is_ok());
        assert!(buffer.push(packet(2)).is_ok());
        assert!(buffer.is_full());
        assert!(buffer.push(packet(3)).is_err());
        buffer.commit_cycle();

        assert_eq!(buffer.pop().source(), 1);
        assert_eq!(buffer.len(), 1);
        assert!(buffer.is_full(), "slot freed this cycle must not be reusable");
        let rejected = buffer.push(packet(3)).unwrap_err();
        assert_eq!(rejected.source(), 3);

        buffer.commit_cycle();
        assert!(!buffer.is_full());
        assert!(buffer.push(packet(3)).is_ok());
    }

    #[test]
    fn test_one_read_per_cycle() {
        let mut buffer = PortBuffer::bounded(4);
        buffer.push(packet(1)).unwrap();
        buffer.push(packet(2)).unwrap();
        buffer.commit_cycle();
        buffer.pop();
        assert!(buffer.peek().is_none());
        buffer.commit_cycle();
        assert_eq!(buffer.peek().map(|p| p.source()), Some(2));
    }

    #[test]
    fn test_requeue_restores_head() {
        let mut buffer = PortBuffer::bounded(2);
        buffer.push(packet(1)).unwrap();
        buffer.push(packet(2)).unwrap();
        buffer.commit_cycle();
        let head = buffer.pop();
        buffer.requeue(head);
        assert!(!buffer.packet_sent());
        assert_eq!(buffer.peek().map(|p| p.source()), Some(1));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let mut buffer = PortBuffer::bounded(2);
        buffer.push(packet(1)).unwrap();
        buffer.commit_cycle();
        let (available, sent) = (buffer.is_available(), buffer.packet_sent());
        buffer.commit_cycle();
        assert_eq!((buffer.is_available(), buffer.packet_sent()), (available, sent));

        buffer.pop();
        buffer.commit_cycle();
        assert!(!buffer.is_available());
        buffer.commit_cycle();
        assert!(!buffer.is_available());
    }

    #[test]
    fn test_unbounded_never_full() {
        let mut buffer = PortBuffer::unbounded();
        for i in 0..100 {
            assert!(buffer.push(packet(i)).is_ok());
        }
        assert!(!buffer.is_full());
        assert!(!buffer.is_half_full());
    }

    #[test]
    fn test_half_full_rounds_up() {
        let mut buffer = PortBuffer::bounded(3);
        buffer.push(packet(1)).unwrap();
        assert!(!buffer.is_half_full());
        buffer.push(packet(2)).unwrap();
        assert!(buffer.is_half_full());
    }

    #[test]
    #[should_panic]
    fn test_pop_empty_panics() {
        let mut buffer = PortBuffer::bounded(2);
        buffer.commit_cycle();
        buffer.pop();
    }

    #[test]
    #[should_panic]
    fn test_pop_invisible_packet_panics() {
        let mut buffer = PortBuffer::bounded(2);
        buffer.push(packet(1)).unwrap();
        buffer.pop();
    }
}
