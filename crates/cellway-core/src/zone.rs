// ── Zone occupancy model ──

/// Occupancy state of one storage zone.
///
/// Owned exclusively by the coordinator; external readers only ever see
/// [`ZoneSnapshot`] copies. The capacity is fixed at construction, the
/// count moves with occupancy updates (or a manual reset).
#[derive(Debug, Clone)]
pub struct ZoneState {
    name: String,
    current: u32,
    capacity: u32,
}

impl ZoneState {
    /// Create a zone. A zero capacity is clamped to 1 — a zone that is
    /// always full could never produce a rising edge.
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            current: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// A zone is full at or above capacity.
    pub fn is_full(&self) -> bool {
        self.current >= self.capacity
    }

    pub fn set_count(&mut self, count: u32) {
        self.current = count;
    }

    /// Immutable copy for observers.
    pub fn snapshot(&self) -> ZoneSnapshot {
        ZoneSnapshot {
            name: self.name.clone(),
            current: self.current,
            capacity: self.capacity,
            is_full: self.is_full(),
        }
    }
}

/// Point-in-time view of a zone, handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSnapshot {
    pub name: String,
    pub current: u32,
    pub capacity: u32,
    pub is_full: bool,
}

impl ZoneSnapshot {
    /// Display form, e.g. `"3 / 4"`.
    pub fn status_text(&self) -> String {
        format!("{} / {}", self.current, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_at_and_above_capacity() {
        let mut zone = ZoneState::new("A", 4);
        assert!(!zone.is_full());

        zone.set_count(3);
        assert!(!zone.is_full());

        zone.set_count(4);
        assert!(zone.is_full());

        zone.set_count(6);
        assert!(zone.is_full());

        zone.set_count(2);
        assert!(!zone.is_full());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let zone = ZoneState::new("X", 0);
        assert_eq!(zone.capacity(), 1);
        assert!(!zone.is_full());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut zone = ZoneState::new("B", 4);
        zone.set_count(2);

        let snap = zone.snapshot();
        assert_eq!(snap.status_text(), "2 / 4");
        assert!(!snap.is_full);
    }
}
