//! Contact begin/end notification

use std::cell::RefCell;
use std::rc::Rc;

use crate::body::BodyKey;
use crate::collider::ColliderKey;

/// Type of contact event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactEventType {
    /// First step the pair touches
    Begin,
    /// The pair stopped touching, or its contact was destroyed while touching
    End,
}

/// A contact transition between two colliders
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactEvent {
    pub event_type: ContactEventType,
    pub collider_a: ColliderKey,
    pub collider_b: ColliderKey,
    /// Opaque integer ids of the two colliders
    pub id_a: u64,
    pub id_b: u64,
    /// Caller-supplied collider tags
    pub tag_a: u64,
    pub tag_b: u64,
    pub body_a: BodyKey,
    pub body_b: BodyKey,
    /// Either collider is a sensor
    pub sensor: bool,
}

impl ContactEvent {
    /// True when the event involves the given collider
    pub fn involves(&self, collider: ColliderKey) -> bool {
        self.collider_a == collider || self.collider_b == collider
    }
}

/// Receives contact transitions, each exactly once
pub trait ContactListener {
    fn begin_contact(&mut self, event: &ContactEvent);
    fn end_contact(&mut self, event: &ContactEvent);
}

/// A shared listener, so the caller can keep a handle while the world owns a clone
impl<T: ContactListener> ContactListener for Rc<RefCell<T>> {
    fn begin_contact(&mut self, event: &ContactEvent) {
        self.borrow_mut().begin_contact(event);
    }

    fn end_contact(&mut self, event: &ContactEvent) {
        self.borrow_mut().end_contact(event);
    }
}

/// Listener that records every event in order
#[derive(Clone, Debug, Default)]
pub struct EventCollector {
    events: Vec<ContactEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ContactEvent] {
        &self.events
    }

    pub fn count(&self, event_type: ContactEventType) -> usize {
        self.events.iter().filter(|e| e.event_type == event_type).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn drain(&mut self) -> impl Iterator<Item = ContactEvent> + '_ {
        self.events.drain(..)
    }
}

impl ContactListener for EventCollector {
    fn begin_contact(&mut self, event: &ContactEvent) {
        self.events.push(*event);
    }

    fn end_contact(&mut self, event: &ContactEvent) {
        self.events.push(*event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::Key;

    fn event(event_type: ContactEventType) -> ContactEvent {
        ContactEvent {
            event_type,
            collider_a: ColliderKey::null(),
            collider_b: ColliderKey::null(),
            id_a: 1,
            id_b: 2,
            tag_a: 10,
            tag_b: 20,
            body_a: BodyKey::null(),
            body_b: BodyKey::null(),
            sensor: false,
        }
    }

    #[test]
    fn test_collector_records_in_order() {
        let mut collector = EventCollector::new();
        collector.begin_contact(&event(ContactEventType::Begin));
        collector.end_contact(&event(ContactEventType::End));
        assert_eq!(collector.count(ContactEventType::Begin), 1);
        assert_eq!(collector.events()[1].event_type, ContactEventType::End);
        assert_eq!(collector.drain().count(), 2);
        assert!(collector.events().is_empty());
    }

    #[test]
    fn test_shared_listener() {
        let shared = Rc::new(RefCell::new(EventCollector::new()));
        let mut boxed: Box<dyn ContactListener> = Box::new(shared.clone());
        boxed.begin_contact(&event(ContactEventType::Begin));
        assert_eq!(shared.borrow().events().len(), 1);
    }
}
