use std::collections::VecDeque;

use tracing::debug;

use crate::error::QueueFull;
use crate::msgb::MsgBuf;

/// FIFO of message buffers.
///
/// Enqueue moves a buffer into the queue and dequeue moves it back out, so
/// a buffer is never reachable from two places. An optional limit turns the
/// queue into a bounded one whose `enqueue` fails instead of growing.
#[derive(Debug, Default)]
pub struct MsgQueue {
    entries: VecDeque<MsgBuf>,
    limit: Option<usize>,
}

impl MsgQueue {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue holding at most `limit` buffers.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit: Some(limit),
        }
    }

    /// Append `msg` at the tail.
    ///
    /// A full bounded queue hands the buffer back inside [`QueueFull`]
    /// and leaves the queued entries untouched.
    pub fn enqueue(&mut self, msg: MsgBuf) -> Result<(), QueueFull> {
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                return Err(QueueFull { limit, msg });
            }
        }
        self.entries.push_back(msg);
        Ok(())
    }

    /// Put a buffer back at the head, e.g. after a write that consumed
    /// nothing. Subject to the same limit as [`enqueue`](Self::enqueue).
    pub fn requeue(&mut self, msg: MsgBuf) -> Result<(), QueueFull> {
        if let Some(limit) = self.limit {
            if self.entries.len() >= limit {
                return Err(QueueFull { limit, msg });
            }
        }
        self.entries.push_front(msg);
        Ok(())
    }

    /// Remove the buffer at the head, or `None` when the queue is empty.
    pub fn dequeue(&mut self) -> Option<MsgBuf> {
        self.entries.pop_front()
    }

    /// Buffer at the head, without removing it.
    pub fn front(&self) -> Option<&MsgBuf> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.entries.len() >= limit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MsgBuf> {
        self.entries.iter()
    }

    /// Release every queued buffer without delivering it. Returns how many
    /// were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        if dropped > 0 {
            debug!(target: "gsmcore::buffer", dropped, "releasing queued message buffers");
        }
        self.entries.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: u8) -> MsgBuf {
        let mut msg = MsgBuf::alloc(4, "queue-test").unwrap();
        msg.put_u8(tag).unwrap();
        msg
    }

    #[test]
    fn dequeue_empty_is_none() {
        let mut queue = MsgQueue::new();
        assert!(queue.dequeue().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn fifo_order() {
        let mut queue = MsgQueue::new();
        for tag in 0..10u8 {
            queue.enqueue(tagged(tag)).unwrap();
        }
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.front().map(|m| m.data()[0]), Some(0));

        let order: Vec<u8> = std::iter::from_fn(|| queue.dequeue())
            .map(|m| m.data()[0])
            .collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn interleaved_enqueue_dequeue_keeps_order() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut queue = MsgQueue::new();
        let mut next_in = 0u8;
        let mut next_out = 0u8;

        for _ in 0..1_000 {
            if rng.bool() {
                queue.enqueue(tagged(next_in)).unwrap();
                next_in = next_in.wrapping_add(1);
            } else if let Some(msg) = queue.dequeue() {
                assert_eq!(msg.data()[0], next_out);
                next_out = next_out.wrapping_add(1);
            }
        }
    }

    #[test]
    fn bounded_queue_rejects_when_full() {
        let mut queue = MsgQueue::with_limit(64);
        for i in 0..64u8 {
            queue.enqueue(tagged(i)).unwrap();
        }
        assert!(queue.is_full());

        let rejected = queue.enqueue(tagged(200)).unwrap_err();
        assert_eq!(rejected.limit, 64);
        assert_eq!(rejected.into_inner().data(), &[200]);
        assert_eq!(queue.len(), 64);

        for i in 0..64u8 {
            assert_eq!(queue.dequeue().unwrap().data(), &[i]);
        }
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn requeue_puts_back_at_head() {
        let mut queue = MsgQueue::with_limit(2);
        queue.enqueue(tagged(1)).unwrap();
        queue.enqueue(tagged(2)).unwrap();

        let head = queue.dequeue().unwrap();
        queue.requeue(head).unwrap();
        assert_eq!(queue.dequeue().unwrap().data(), &[1]);

        queue.enqueue(tagged(3)).unwrap();
        assert!(queue.requeue(tagged(9)).is_err());
    }

    #[test]
    fn clear_releases_everything() {
        let mut queue = MsgQueue::with_limit(4);
        queue.enqueue(tagged(1)).unwrap();
        queue.enqueue(tagged(2)).unwrap();
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.limit(), Some(4));
    }
}
