//! Contact lifecycle: creation from broadphase pairs, narrow-phase refresh
//! and destruction, with begin/end notification

use std::collections::HashMap;

use log::{debug, trace};
use slotmap::SlotMap;

use crate::body::{BodyKey, ContactEdge, RigidBody4D};
use crate::broadphase::BroadPhase;
use crate::collide::ClipBuffers;
use crate::collider::{Collider, ColliderKey};
use crate::contact::{Contact, ContactKey};
use crate::listener::{ContactEvent, ContactEventType, ContactListener};

/// Owns every contact, the broadphase, and the optional listener
pub struct ContactManager {
    contacts: SlotMap<ContactKey, Contact>,
    /// Pair (ordered by collider id) to contact, guaranteeing one contact per pair
    pairs: HashMap<(ColliderKey, ColliderKey), ContactKey>,
    pub(crate) broadphase: BroadPhase,
    listener: Option<Box<dyn ContactListener>>,
    pair_buffer: Vec<(ColliderKey, ColliderKey)>,
    stale: Vec<ContactKey>,
    scratch: ClipBuffers,
}

impl std::fmt::Debug for ContactManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactManager")
            .field("contacts", &self.contacts.len())
            .field("proxies", &self.broadphase.proxy_count())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

fn ordered(a: ColliderKey, b: ColliderKey) -> (ColliderKey, ColliderKey) {
    if a.id() <= b.id() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Whether two bodies may generate contacts at all
pub(crate) fn can_collide(a_key: BodyKey, a: &RigidBody4D, b_key: BodyKey, b: &RigidBody4D) -> bool {
    if a_key == b_key {
        return false;
    }
    if !a.is_dynamic() && !b.is_dynamic() {
        return false;
    }
    if !a.layers().shares_layer(b.layers()) {
        return false;
    }
    a.is_active() && b.is_active()
}

fn make_event(
    event_type: ContactEventType,
    contact: &Contact,
    colliders: &SlotMap<ColliderKey, Collider>,
) -> ContactEvent {
    let tag = |key: ColliderKey| colliders.get(key).map(|c| c.tag).unwrap_or(0);
    ContactEvent {
        event_type,
        collider_a: contact.collider_a,
        collider_b: contact.collider_b,
        id_a: contact.collider_a.id(),
        id_b: contact.collider_b.id(),
        tag_a: tag(contact.collider_a),
        tag_b: tag(contact.collider_b),
        body_a: contact.body_a,
        body_b: contact.body_b,
        sensor: contact.sensor,
    }
}

impl ContactManager {
    pub fn new(aabb_margin: f32) -> Self {
        Self {
            contacts: SlotMap::with_key(),
            pairs: HashMap::new(),
            broadphase: BroadPhase::new(aabb_margin),
            listener: None,
            pair_buffer: Vec::new(),
            stale: Vec::new(),
            scratch: ClipBuffers::new(),
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn contacts(&self) -> impl Iterator<Item = (ContactKey, &Contact)> {
        self.contacts.iter()
    }

    pub fn get(&self, key: ContactKey) -> Option<&Contact> {
        self.contacts.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: ContactKey) -> Option<&mut Contact> {
        self.contacts.get_mut(key)
    }

    pub(crate) fn contacts_mut(&mut self) -> &mut SlotMap<ContactKey, Contact> {
        &mut self.contacts
    }

    /// Find the contact for a pair of colliders, in either order
    pub fn find(&self, a: ColliderKey, b: ColliderKey) -> Option<ContactKey> {
        self.pairs.get(&ordered(a, b)).copied()
    }

    pub fn broadphase(&self) -> &BroadPhase {
        &self.broadphase
    }

    pub fn set_listener(&mut self, listener: Option<Box<dyn ContactListener>>) {
        self.listener = listener;
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Create a contact for a pair unless one already exists or the pair is filtered.
    ///
    /// Returns the key of the newly created contact.
    pub(crate) fn add_contact(
        &mut self,
        a: ColliderKey,
        b: ColliderKey,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
    ) -> Option<ContactKey> {
        let pair = ordered(a, b);
        if self.pairs.contains_key(&pair) {
            return None;
        }
        let (ca, cb) = (colliders.get(pair.0)?, colliders.get(pair.1)?);
        if ca.sensor && cb.sensor {
            debug!("Rejected sensor pair {} / {}", pair.0.id(), pair.1.id());
            return None;
        }
        {
            let (ba, bb) = (bodies.get(ca.body)?, bodies.get(cb.body)?);
            if !can_collide(ca.body, ba, cb.body, bb) {
                return None;
            }
        }

        let key = self.contacts.insert(Contact::new(pair.0, ca, pair.1, cb));
        self.pairs.insert(pair, key);

        if let Some(body) = bodies.get_mut(ca.body) {
            body.edges.push(ContactEdge {
                other: cb.body,
                contact: key,
            });
        }
        if let Some(body) = bodies.get_mut(cb.body) {
            body.edges.push(ContactEdge {
                other: ca.body,
                contact: key,
            });
        }
        trace!("Contact created between colliders {} and {}", pair.0.id(), pair.1.id());
        Some(key)
    }

    /// Destroy a contact, unlinking it from both bodies.
    ///
    /// A contact destroyed while touching reports `end_contact`, and unless
    /// it was a sensor contact both bodies wake, so nothing stays asleep
    /// resting on a support that is gone.
    pub(crate) fn remove_contact(
        &mut self,
        key: ContactKey,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
    ) {
        let Some(contact) = self.contacts.remove(key) else {
            return;
        };
        self.pairs.remove(&(contact.collider_a, contact.collider_b));

        let supporting = contact.is_colliding() && !contact.sensor;
        for body_key in [contact.body_a, contact.body_b] {
            if let Some(body) = bodies.get_mut(body_key) {
                body.edges.retain(|edge| edge.contact != key);
                if supporting {
                    body.wake();
                }
            }
        }

        if contact.is_colliding() {
            if let Some(listener) = self.listener.as_mut() {
                listener.end_contact(&make_event(ContactEventType::End, &contact, colliders));
            }
        }
        trace!(
            "Contact destroyed between colliders {} and {}",
            contact.collider_a.id(),
            contact.collider_b.id()
        );
    }

    /// Destroy every contact touching a body
    pub(crate) fn remove_contacts_of_body(
        &mut self,
        body: BodyKey,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
    ) {
        let Some(edges) = bodies.get(body).map(|b| b.edges.clone()) else {
            return;
        };
        for edge in edges {
            self.remove_contact(edge.contact, bodies, colliders);
        }
    }

    /// Destroy every contact involving one collider
    pub(crate) fn remove_contacts_of_collider(
        &mut self,
        collider: ColliderKey,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
    ) {
        let Some(body) = colliders.get(collider).map(|c| c.body) else {
            return;
        };
        let Some(edges) = bodies.get(body).map(|b| b.edges.clone()) else {
            return;
        };
        for edge in edges {
            let involved = self
                .contacts
                .get(edge.contact)
                .is_some_and(|c| c.collider_a == collider || c.collider_b == collider);
            if involved {
                self.remove_contact(edge.contact, bodies, colliders);
            }
        }
    }

    /// Turn broadphase pairs into contacts
    pub(crate) fn find_new_contacts(
        &mut self,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
    ) {
        let mut pairs = std::mem::take(&mut self.pair_buffer);
        pairs.clear();
        self.broadphase.update_pairs(&mut pairs);
        for &(a, b) in &pairs {
            self.add_contact(a, b, bodies, colliders);
        }
        self.pair_buffer = pairs;
    }

    /// Refresh every contact's manifold and drop contacts that no longer apply.
    ///
    /// Pairs where neither body is awake keep their previous manifold. Pairs
    /// that fail the body filter or whose fat bounds separated are destroyed.
    pub(crate) fn test_collisions(
        &mut self,
        bodies: &mut SlotMap<BodyKey, RigidBody4D>,
        colliders: &SlotMap<ColliderKey, Collider>,
    ) {
        self.stale.clear();

        for (key, contact) in self.contacts.iter_mut() {
            let (Some(ba), Some(bb)) = (bodies.get(contact.body_a), bodies.get(contact.body_b)) else {
                self.stale.push(key);
                continue;
            };
            if !ba.is_awake() && !bb.is_awake() {
                continue;
            }
            if !can_collide(contact.body_a, ba, contact.body_b, bb) {
                self.stale.push(key);
                continue;
            }

            let proxies = colliders
                .get(contact.collider_a)
                .and_then(|c| c.proxy)
                .zip(colliders.get(contact.collider_b).and_then(|c| c.proxy));
            let overlapping = proxies.is_some_and(|(pa, pb)| self.broadphase.test_overlap(pa, pb));
            if !overlapping {
                self.stale.push(key);
                continue;
            }

            contact.solve_collision(bodies, colliders, &mut self.scratch);

            if let Some(listener) = self.listener.as_mut() {
                if contact.began() {
                    listener.begin_contact(&make_event(ContactEventType::Begin, contact, colliders));
                } else if contact.ended() {
                    listener.end_contact(&make_event(ContactEventType::End, contact, colliders));
                }
            }
            if contact.began() {
                trace!("Begin contact {} / {}", contact.collider_a.id(), contact.collider_b.id());
            } else if contact.ended() {
                trace!("End contact {} / {}", contact.collider_a.id(), contact.collider_b.id());
            }
        }

        let stale = std::mem::take(&mut self.stale);
        for &key in &stale {
            self.remove_contact(key, bodies, colliders);
        }
        self.stale = stale;
    }
}
