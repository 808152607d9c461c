//! Bounded conversation history.

use mediconnect_core::ConversationTurn;

/// Ordered turns of one session, oldest first, never longer than
/// `capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: Vec::new(),
            capacity,
        }
    }

    /// Rebuild a history from stored turns, dropping the oldest beyond
    /// `capacity`.
    pub fn from_turns(turns: Vec<ConversationTurn>, capacity: usize) -> Self {
        let mut history = Self { turns, capacity };
        history.truncate();
        history
    }

    /// Record one exchange, user turn first, then drop the oldest turns
    /// beyond capacity.
    pub fn append(mut self, user: ConversationTurn, assistant: ConversationTurn) -> Self {
        self.turns.push(user);
        self.turns.push(assistant);
        self.truncate();
        self
    }

    /// The trailing `size` turns supplied to the model as context.
    pub fn context_window(&self, size: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(size);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn truncate(&mut self) {
        if self.turns.len() > self.capacity {
            let excess = self.turns.len() - self.capacity;
            self.turns.drain(..excess);
        }
    }
}
