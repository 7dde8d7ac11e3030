/// Fixed pool of desk slots, each held by at most one live agent.
#[derive(Debug, Clone, Default)]
pub struct DeskPool {
    holders: Vec<Option<String>>,
}

impl DeskPool {
    pub fn new(slots: usize) -> Self {
        Self {
            holders: vec![None; slots],
        }
    }

    /// First free slot in pool order, now held by `agent_id`.
    /// `None` when the pool is exhausted; the agent stays deskless.
    pub fn assign(&mut self, agent_id: &str) -> Option<usize> {
        if let Some(held) = self.desk_of(agent_id) {
            return Some(held);
        }
        let slot = self.holders.iter().position(Option::is_none)?;
        self.holders[slot] = Some(agent_id.to_string());
        Some(slot)
    }

    /// Free whatever desk `agent_id` holds.
    pub fn release(&mut self, agent_id: &str) -> Option<usize> {
        let slot = self.desk_of(agent_id)?;
        self.holders[slot] = None;
        Some(slot)
    }

    pub fn holder(&self, slot: usize) -> Option<&str> {
        self.holders.get(slot)?.as_deref()
    }

    pub fn desk_of(&self, agent_id: &str) -> Option<usize> {
        self.holders
            .iter()
            .position(|h| h.as_deref() == Some(agent_id))
    }

    pub fn free_count(&self) -> usize {
        self.holders.iter().filter(|h| h.is_none()).count()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}
