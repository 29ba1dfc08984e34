//! Contact Manager
//!
//! Owns the broad-phase and the contact set. New contacts are born only
//! from broad-phase pairs; contacts die when their fat AABBs separate, when
//! re-filtering rejects them, or when a fixture or body goes away.

use slotmap::SlotMap;

use crate::body::{Body, BodyHandle, BodyType, ContactEdge};
use crate::broad_phase::BroadPhase;
use crate::contact::{contact_order, Contact, ContactFlags, ContactHandle};
use crate::filter::Filter;
use crate::fixture::{Fixture, FixtureHandle, FixtureProxyKey};
use crate::joint::{Joint, JointHandle};
use crate::world_callbacks::{ContactFilter, ContactListener};

/// Contact lifecycle management.
#[derive(Default)]
pub struct ContactManager {
    pub(crate) broad_phase: BroadPhase<FixtureProxyKey>,
    pub(crate) contacts: SlotMap<ContactHandle, Contact>,
    pub(crate) contact_filter: Option<Box<dyn ContactFilter>>,
    pub(crate) contact_listener: Option<Box<dyn ContactListener>>,
    scratch: Vec<ContactHandle>,
}

impl core::fmt::Debug for ContactManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContactManager")
            .field("proxy_count", &self.broad_phase.proxy_count())
            .field("contact_count", &self.contacts.len())
            .field("has_filter", &self.contact_filter.is_some())
            .field("has_listener", &self.contact_listener.is_some())
            .finish()
    }
}

fn filter_allows(filter: &mut Option<Box<dyn ContactFilter>>, fa: &Fixture, fb: &Fixture) -> bool {
    match filter {
        Some(filter) => filter.should_collide(fa, fb),
        None => Filter::should_collide(&fa.filter, &fb.filter),
    }
}

impl ContactManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live contacts
    #[inline]
    #[must_use]
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Turn newly overlapping broad-phase pairs into contacts.
    pub(crate) fn find_new_contacts(
        &mut self,
        bodies: &mut SlotMap<BodyHandle, Body>,
        fixtures: &SlotMap<FixtureHandle, Fixture>,
        joints: &SlotMap<JointHandle, Joint>,
    ) {
        let Self {
            broad_phase,
            contacts,
            contact_filter,
            ..
        } = self;
        broad_phase.update_pairs(|proxy_a, proxy_b| {
            add_pair(contacts, contact_filter, bodies, fixtures, joints, proxy_a, proxy_b);
        });
    }

    /// Update every contact: drop stale ones, re-filter flagged ones and
    /// re-evaluate the manifolds of active ones.
    pub(crate) fn collide(
        &mut self,
        bodies: &mut SlotMap<BodyHandle, Body>,
        fixtures: &SlotMap<FixtureHandle, Fixture>,
        joints: &SlotMap<JointHandle, Joint>,
    ) {
        let mut handles = core::mem::take(&mut self.scratch);
        handles.clear();
        handles.extend(self.contacts.keys());

        for &handle in &handles {
            let Some(contact) = self.contacts.get(handle) else {
                continue;
            };
            let (fh_a, fh_b) = (contact.fixture_a, contact.fixture_b);
            let (bh_a, bh_b) = (contact.body_a, contact.body_b);
            let (ia, ib) = (contact.child_index_a, contact.child_index_b);
            let needs_filter = contact.flags.contains(ContactFlags::FILTER);

            let (Some(fa), Some(fb)) = (fixtures.get(fh_a), fixtures.get(fh_b)) else {
                self.destroy(handle, bodies, fixtures);
                continue;
            };
            let (Some(body_a), Some(body_b)) = (bodies.get(bh_a), bodies.get(bh_b)) else {
                self.destroy(handle, bodies, fixtures);
                continue;
            };

            if needs_filter {
                if !body_b.should_collide(bh_a, body_a, joints)
                    || !filter_allows(&mut self.contact_filter, fa, fb)
                {
                    self.destroy(handle, bodies, fixtures);
                    continue;
                }
                if let Some(c) = self.contacts.get_mut(handle) {
                    c.flags.remove(ContactFlags::FILTER);
                }
            }

            let active_a = body_a.is_awake() && body_a.body_type != BodyType::Static;
            let active_b = body_b.is_awake() && body_b.body_type != BodyType::Static;
            if !active_a && !active_b {
                continue;
            }

            let overlap = match (fa.proxies.get(ia), fb.proxies.get(ib)) {
                (Some(pa), Some(pb)) => self.broad_phase.test_overlap(pa.proxy_id, pb.proxy_id),
                _ => false,
            };
            if !overlap {
                self.destroy(handle, bodies, fixtures);
                continue;
            }

            let xf_a = body_a.xf;
            let xf_b = body_b.xf;
            let listener = self.contact_listener.as_deref_mut();
            let changed = match self.contacts.get_mut(handle) {
                Some(c) => c.update(fa, &xf_a, fb, &xf_b, listener),
                None => false,
            };
            if changed {
                if let Some(b) = bodies.get_mut(bh_a) {
                    b.set_awake(true);
                }
                if let Some(b) = bodies.get_mut(bh_b) {
                    b.set_awake(true);
                }
            }
        }

        self.scratch = handles;
    }

    /// Destroy a contact, reporting `end_contact` if it was touching.
    pub(crate) fn destroy(
        &mut self,
        handle: ContactHandle,
        bodies: &mut SlotMap<BodyHandle, Body>,
        fixtures: &SlotMap<FixtureHandle, Fixture>,
    ) {
        let Some(contact) = self.contacts.remove(handle) else {
            return;
        };

        if contact.is_touching() {
            if let Some(listener) = self.contact_listener.as_deref_mut() {
                tracing::trace!(contact = ?handle, "end contact (destroyed)");
                listener.end_contact(&contact);
            }
        }

        let sensor = fixtures.get(contact.fixture_a).is_some_and(|f| f.is_sensor)
            || fixtures.get(contact.fixture_b).is_some_and(|f| f.is_sensor);
        let wake = contact.manifold.point_count > 0 && !sensor;

        for body_handle in [contact.body_a, contact.body_b] {
            if let Some(body) = bodies.get_mut(body_handle) {
                body.contact_edges.retain(|e| e.contact != handle);
                if wake {
                    body.set_awake(true);
                }
            }
        }
    }
}

/// Create a contact for a reported pair unless a rule forbids it.
fn add_pair(
    contacts: &mut SlotMap<ContactHandle, Contact>,
    contact_filter: &mut Option<Box<dyn ContactFilter>>,
    bodies: &mut SlotMap<BodyHandle, Body>,
    fixtures: &SlotMap<FixtureHandle, Fixture>,
    joints: &SlotMap<JointHandle, Joint>,
    proxy_a: FixtureProxyKey,
    proxy_b: FixtureProxyKey,
) {
    let (Some(fixture_a), Some(fixture_b)) = (fixtures.get(proxy_a.fixture), fixtures.get(proxy_b.fixture)) else {
        return;
    };
    let (bh_a, bh_b) = (fixture_a.body, fixture_b.body);

    // fixtures on the same body never collide
    if bh_a == bh_b {
        return;
    }
    let (Some(body_a), Some(body_b)) = (bodies.get(bh_a), bodies.get(bh_b)) else {
        return;
    };

    let already = body_b.contact_edges.iter().any(|edge| {
        if edge.other != bh_a {
            return false;
        }
        contacts.get(edge.contact).is_some_and(|c| {
            let same = c.fixture_a == proxy_a.fixture
                && c.fixture_b == proxy_b.fixture
                && c.child_index_a == proxy_a.child_index
                && c.child_index_b == proxy_b.child_index;
            let swapped = c.fixture_a == proxy_b.fixture
                && c.fixture_b == proxy_a.fixture
                && c.child_index_a == proxy_b.child_index
                && c.child_index_b == proxy_a.child_index;
            same || swapped
        })
    });
    if already {
        return;
    }

    if !body_b.should_collide(bh_a, body_a, joints) {
        return;
    }
    if !filter_allows(contact_filter, fixture_a, fixture_b) {
        return;
    }

    let Some(swap) = contact_order(fixture_a.shape_type(), fixture_b.shape_type()) else {
        return;
    };
    let (ka, kb) = if swap { (proxy_b, proxy_a) } else { (proxy_a, proxy_b) };
    let (fa, fb) = if swap { (fixture_b, fixture_a) } else { (fixture_a, fixture_b) };

    let handle = contacts.insert_with_key(|handle| {
        Contact::new(handle, ka.fixture, ka.child_index, fa, kb.fixture, kb.child_index, fb)
    });

    if let Some(b) = bodies.get_mut(fa.body) {
        b.contact_edges.push(ContactEdge {
            other: fb.body,
            contact: handle,
        });
    }
    if let Some(b) = bodies.get_mut(fb.body) {
        b.contact_edges.push(ContactEdge {
            other: fa.body,
            contact: handle,
        });
    }
}
