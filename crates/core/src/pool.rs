//! ColorPool - per-queue cursors over a shared [`ColorTable`]
//!
//! Despite feeding "random" piece colors to the game, the pool is a
//! deterministic forward walk: each advance moves a queue's cursor to the
//! next slot index if that slot was retained, and back to 0 otherwise.
//! Adjacency is decided on raw slot indices, so every hole in the source
//! data is a wrap point.
//!
//! Queues are independent: advancing one never moves another. A queue that
//! has never been seen reads as position 0.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::notify::{CursorChanged, CursorObserver, Observers, SubscriptionId};
use crate::source::PoolConfig;
use crate::table::ColorTable;
use crate::types::{color_name, PieceColor, QueueId, SlotIndex, DEFAULT_QUEUE};

/// Maximum number of upcoming colors [`ColorPool::peek`] returns.
pub const PEEK_MAX: usize = 8;

/// Upcoming colors for a queue, nearest first. `None` entries are "no color".
pub type Preview = ArrayVec<Option<PieceColor>, PEEK_MAX>;

/// Color sequence generator with one cursor per queue.
#[derive(Debug)]
pub struct ColorPool {
    table: Arc<ColorTable>,
    cursors: BTreeMap<QueueId, SlotIndex>,
    observers: Observers,
}

impl ColorPool {
    pub fn new(table: ColorTable) -> Self {
        Self::shared(Arc::new(table))
    }

    /// Build a pool over a table shared with other pools.
    pub fn shared(table: Arc<ColorTable>) -> Self {
        Self {
            table,
            cursors: BTreeMap::new(),
            observers: Observers::new(),
        }
    }

    /// Load the configured source (never fails, see [`ColorTable::load`]).
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(ColorTable::load(&config.source))
    }

    pub fn table(&self) -> &ColorTable {
        &self.table
    }

    /// Advance `queue` from its stored cursor and return the color there.
    ///
    /// ```
    /// use color_pool_core::{ColorPool, ColorTable};
    /// use color_pool_core::types::PieceColor;
    ///
    /// let mut pool = ColorPool::new(ColorTable::parse(b"0123"));
    /// assert_eq!(pool.advance(0), Some(PieceColor::Blue));
    /// assert_eq!(pool.advance(0), Some(PieceColor::Yellow));
    /// assert_eq!(pool.advance(0), Some(PieceColor::Green));
    /// assert_eq!(pool.advance(0), Some(PieceColor::Red)); // slot 4 absent: wrap
    /// assert_eq!(pool.cursor(0), 0);
    /// ```
    pub fn advance(&mut self, queue: QueueId) -> Option<PieceColor> {
        self.advance_from(queue, None)
    }

    /// Advance `queue`, first forcing its cursor to `resume` when given.
    ///
    /// This is for callers that track the last shown slot themselves. The
    /// forced position and the step are committed together: observers see a
    /// single event with the final position.
    pub fn advance_from(
        &mut self,
        queue: QueueId,
        resume: Option<SlotIndex>,
    ) -> Option<PieceColor> {
        let current = resume.unwrap_or_else(|| self.cursor(queue));
        let position = self.successor(current);
        self.commit(queue, position);
        self.table.get(position)
    }

    /// [`advance_from`](Self::advance_from) mapped to a color name.
    pub fn next_color_name(&mut self, queue: QueueId, resume: Option<SlotIndex>) -> &'static str {
        color_name(self.advance_from(queue, resume))
    }

    /// Color stored at `slot`, without touching any cursor.
    pub fn color_at(&self, slot: SlotIndex) -> Option<PieceColor> {
        self.table.get(slot)
    }

    /// Name of the color at `slot`; absent slots read as the fallback name.
    pub fn color_name_at(&self, slot: SlotIndex) -> &'static str {
        color_name(self.color_at(slot))
    }

    pub fn cursor(&self, queue: QueueId) -> SlotIndex {
        self.cursors.get(&queue).copied().unwrap_or(0)
    }

    /// Set a queue's cursor from outside and notify.
    ///
    /// Positions that are neither 0 nor a retained slot are stored as 0.
    /// Returns the committed position. Setting the current value still
    /// notifies.
    pub fn set_cursor(&mut self, queue: QueueId, position: SlotIndex) -> SlotIndex {
        let position = if position == 0 || self.table.contains(position) {
            position
        } else {
            log::debug!("queue {queue}: slot {position} is not in the table, cursor set to 0");
            0
        };
        self.commit(queue, position);
        position
    }

    /// Put a queue back at slot 0.
    pub fn reset(&mut self, queue: QueueId) {
        self.set_cursor(queue, 0);
    }

    /// The next `count` colors `queue` would draw (at most [`PEEK_MAX`]).
    ///
    /// Pure: no cursor moves and no observer fires.
    pub fn peek(&self, queue: QueueId, count: usize) -> Preview {
        let mut out = Preview::new();
        let mut position = self.cursor(queue);
        for _ in 0..count.min(PEEK_MAX) {
            position = self.successor(position);
            out.push(self.table.get(position));
        }
        out
    }

    /// Queues that have a stored cursor, ascending by id.
    pub fn queues(&self) -> impl Iterator<Item = (QueueId, SlotIndex)> + '_ {
        self.cursors.iter().map(|(&q, &p)| (q, p))
    }

    pub fn subscribe<O>(&mut self, observer: O) -> SubscriptionId
    where
        O: CursorObserver + Send + 'static,
    {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Borrow a single queue.
    pub fn lane(&mut self, queue: QueueId) -> Lane<'_> {
        Lane { pool: self, queue }
    }

    /// The single-cursor view used by hosts that only ever show one queue.
    pub fn default_lane(&mut self) -> Lane<'_> {
        self.lane(DEFAULT_QUEUE)
    }

    #[inline]
    fn successor(&self, position: SlotIndex) -> SlotIndex {
        match position.checked_add(1) {
            Some(next) if self.table.contains(next) => next,
            _ => 0,
        }
    }

    fn commit(&mut self, queue: QueueId, position: SlotIndex) {
        self.cursors.insert(queue, position);
        self.observers.emit(CursorChanged { queue, position });
    }
}

/// One queue of a [`ColorPool`].
#[derive(Debug)]
pub struct Lane<'a> {
    pool: &'a mut ColorPool,
    queue: QueueId,
}

impl Lane<'_> {
    pub fn id(&self) -> QueueId {
        self.queue
    }

    pub fn advance(&mut self) -> Option<PieceColor> {
        self.pool.advance(self.queue)
    }

    pub fn advance_from(&mut self, resume: Option<SlotIndex>) -> Option<PieceColor> {
        self.pool.advance_from(self.queue, resume)
    }

    pub fn next_color_name(&mut self) -> &'static str {
        self.pool.next_color_name(self.queue, None)
    }

    pub fn cursor(&self) -> SlotIndex {
        self.pool.cursor(self.queue)
    }

    pub fn set_cursor(&mut self, position: SlotIndex) -> SlotIndex {
        self.pool.set_cursor(self.queue, position)
    }

    pub fn peek(&self, count: usize) -> Preview {
        self.pool.peek(self.queue, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn pool(data: &[u8]) -> ColorPool {
        ColorPool::new(ColorTable::parse(data))
    }

    fn record(pool: &mut ColorPool) -> Arc<Mutex<Vec<CursorChanged>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        pool.subscribe(move |e: CursorChanged| sink.lock().unwrap().push(e));
        seen
    }

    #[test]
    fn test_walks_forward_then_wraps() {
        let mut pool = pool(b"0123");
        let names: Vec<_> = (0..4).map(|_| pool.next_color_name(0, None)).collect();
        assert_eq!(names, vec!["blue", "yellow", "green", "red"]);
        assert_eq!(pool.cursor(0), 0);
    }

    #[test]
    fn test_gap_is_a_wrap_point() {
        // slot 2 is a hole ('7'), so the cycle is 0 -> 1 -> 0.
        let mut pool = pool(b"01723");
        let positions: Vec<_> = (0..4)
            .map(|_| {
                pool.advance(0);
                pool.cursor(0)
            })
            .collect();
        assert_eq!(positions, vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_empty_table_yields_no_color() {
        let mut pool = pool(b"9");
        for _ in 0..3 {
            assert_eq!(pool.advance(0), None);
            assert_eq!(pool.next_color_name(0, None), "black");
            assert_eq!(pool.cursor(0), 0);
        }
    }

    #[test]
    fn test_missing_slot_zero_reads_as_no_color() {
        let mut pool = pool(b"812");
        assert_eq!(pool.advance(0), Some(PieceColor::Blue));
        assert_eq!(pool.advance(0), Some(PieceColor::Yellow));
        assert_eq!(pool.advance(0), None);
        assert_eq!(pool.cursor(0), 0);
        assert_eq!(pool.advance(0), Some(PieceColor::Blue));
    }

    #[test]
    fn test_resume_forces_position_first() {
        let mut pool = pool(b"0123");
        assert_eq!(pool.advance_from(7, Some(1)), Some(PieceColor::Yellow));
        assert_eq!(pool.cursor(7), 2);
        // Resume past the domain wraps.
        assert_eq!(pool.advance_from(7, Some(3)), Some(PieceColor::Red));
        assert_eq!(pool.advance_from(7, Some(usize::MAX)), Some(PieceColor::Red));
    }

    #[test]
    fn test_queues_are_independent() {
        let mut pool = pool(b"0123");
        pool.advance(1);
        pool.advance(1);
        pool.advance(2);
        assert_eq!(pool.cursor(1), 2);
        assert_eq!(pool.cursor(2), 1);
        assert_eq!(pool.cursor(3), 0);
        let queues: Vec<_> = pool.queues().collect();
        assert_eq!(queues, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn test_set_cursor_then_advance_notifies_once() {
        let mut pool = pool(b"0123");
        pool.set_cursor(2, 1);
        let seen = record(&mut pool);

        assert_eq!(pool.next_color_name(2, None), "yellow");
        assert_eq!(*seen.lock().unwrap(), vec![CursorChanged { queue: 2, position: 2 }]);
    }

    #[test]
    fn test_set_cursor_notifies_even_when_unchanged() {
        let mut pool = pool(b"0123");
        let seen = record(&mut pool);
        pool.set_cursor(0, 0);
        pool.set_cursor(0, 0);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_set_cursor_to_absent_slot_stores_zero() {
        let mut pool = pool(b"0153");
        assert_eq!(pool.set_cursor(0, 2), 0);
        assert_eq!(pool.set_cursor(0, 99), 0);
        assert_eq!(pool.set_cursor(0, 3), 3);
        assert_eq!(pool.cursor(0), 3);
    }

    #[test]
    fn test_advance_on_empty_table_still_notifies() {
        let mut pool = pool(b"");
        let seen = record(&mut pool);
        pool.advance(4);
        assert_eq!(*seen.lock().unwrap(), vec![CursorChanged { queue: 4, position: 0 }]);
    }

    #[test]
    fn test_color_name_at_is_pure() {
        let mut pool = pool(b"0123");
        let seen = record(&mut pool);
        assert_eq!(pool.color_name_at(100), "black");
        assert_eq!(pool.color_name_at(3), "green");
        assert_eq!(pool.cursor(0), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(pool.queues().count(), 0);
    }

    #[test]
    fn test_peek_matches_following_advances() {
        let mut pool = pool(b"0123902");
        let preview = pool.peek(0, 6);
        let drawn: Vec<_> = (0..6).map(|_| pool.advance(0)).collect();
        assert_eq!(preview.as_slice(), drawn.as_slice());
    }

    #[test]
    fn test_peek_is_clamped_and_silent() {
        let mut pool = pool(b"0123");
        let seen = record(&mut pool);
        assert_eq!(pool.peek(0, 100).len(), PEEK_MAX);
        assert!(pool.peek(0, 0).is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let mut pool = pool(b"0123");
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);
        let id = pool.subscribe(move |_e: CursorChanged| *sink.lock().unwrap() += 1);
        pool.advance(0);
        assert!(pool.unsubscribe(id));
        pool.advance(0);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_lane_handle() {
        let mut pool = pool(b"0123");
        {
            let mut lane = pool.default_lane();
            assert_eq!(lane.id(), DEFAULT_QUEUE);
            assert_eq!(lane.next_color_name(), "blue");
            assert_eq!(lane.cursor(), 1);
            assert_eq!(
                lane.peek(2).as_slice(),
                &[Some(PieceColor::Yellow), Some(PieceColor::Green)]
            );
        }
        let mut other = pool.lane(5);
        assert_eq!(other.set_cursor(2), 2);
        assert_eq!(other.advance(), Some(PieceColor::Green));
    }

    #[test]
    fn test_shared_table_between_pools() {
        let table = Arc::new(ColorTable::parse(b"0123"));
        let mut a = ColorPool::shared(Arc::clone(&table));
        let mut b = ColorPool::shared(table);
        a.advance(0);
        a.advance(0);
        assert_eq!(b.advance(0), Some(PieceColor::Blue));
        assert_eq!(a.cursor(0), 2);
    }
}
