use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    bridge::waitlist::RemoteWaitlist,
    class::{Class, ClassFlags, ClassId, HookSlot, HookTable},
    error::ClassError,
    event::events,
    instance::{Instance, InstanceAddr, InstanceId},
    outgoing::OutgoingSync,
    value::{HookOutcome, ScriptFn, Value},
};

/// Name of the root class every hierarchy grows from.
pub const ROOT_CLASS_NAME: &str = "Object";

/// Which side of the wire this registry is authoritative for. Each process
/// owns exactly one side; the replication protocol is the only bridge
/// between the two copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRole {
    Server,
    Client,
}

/// Scope selector for event operations: the subscriber lists of a whole
/// class, or of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Class(ClassId),
    Instance(InstanceAddr),
}

/// The process-wide class/instance registry.
///
/// Owns the class directory, every live instance, the deferred remote-event
/// waitlist and the outgoing replication queue. Constructed empty apart from
/// the root class; classes are never torn down during normal operation.
pub struct Registry {
    role: HostRole,
    classes: Vec<Class>,
    by_name: HashMap<String, ClassId>,
    root: ClassId,
    pub(crate) waitlist: RemoteWaitlist,
    pub(crate) outgoing: VecDeque<OutgoingSync>,
}

impl Registry {
    pub fn new(role: HostRole) -> Self {
        let root = ClassId(0);
        let root_class = Class::new(
            ROOT_CLASS_NAME.to_owned(),
            None,
            ClassFlags::NONE,
            HookTable::new(),
        );
        let mut by_name = HashMap::new();
        by_name.insert(ROOT_CLASS_NAME.to_owned(), root);
        Self {
            role,
            classes: vec![root_class],
            by_name,
            root,
            waitlist: RemoteWaitlist::new(),
            outgoing: VecDeque::new(),
        }
    }

    pub fn role(&self) -> HostRole {
        self.role
    }

    pub fn is_server(&self) -> bool {
        self.role == HostRole::Server
    }

    pub fn root_class(&self) -> ClassId {
        self.root
    }

    // Class directory

    /// Creates a new class under `parent`. The child starts with a copy of
    /// the parent's hook table, so overloaded behaviors inherit until the
    /// child overrides a slot. Fires `ClassRegister` on the parent with the
    /// new class's name.
    pub fn inherit(
        &mut self,
        parent: ClassId,
        name: &str,
        flags: ClassFlags,
    ) -> Result<ClassId, ClassError> {
        if parent.index() >= self.classes.len() {
            return Err(ClassError::UnknownParent);
        }
        if self.by_name.contains_key(name) {
            return Err(ClassError::DuplicateName(name.to_owned()));
        }
        if flags.contains(ClassFlags::REPLICATED) && flags.contains(ClassFlags::CLIENT_LOCAL) {
            return Err(ClassError::FlagConflict("Replicated", "ClientLocal"));
        }
        if flags.contains(ClassFlags::SHARED_ID) && flags.contains(ClassFlags::CLIENT_LOCAL) {
            return Err(ClassError::FlagConflict("SharedId", "ClientLocal"));
        }

        let hooks = HookTable::inherited(&self.classes[parent.index()].hooks);
        let id = ClassId(self.classes.len() as u32);
        self.classes
            .push(Class::new(name.to_owned(), Some(parent), flags, hooks));
        self.by_name.insert(name.to_owned(), id);
        self.classes[parent.index()].children.push(id);

        self.emit(
            EventTarget::Class(parent),
            events::CLASS_REGISTER,
            &[Value::str(name)],
        );
        Ok(id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Direct access to a class. Class ids are produced by this registry and
    /// never freed, so the lookup cannot miss for ids it handed out.
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.index()]
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        &self.classes[id.index()].name
    }

    // Inheritance queries

    /// Nearest ancestor, or `None` for the root.
    pub fn super_class(&self, class: ClassId) -> Option<ClassId> {
        self.classes[class.index()].parent
    }

    /// Full ancestor chain, nearest to farthest. Stops at the root, or on
    /// cycle detection; well-formed hierarchies never cycle, this is a
    /// defensive bound.
    pub fn super_chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut seen: HashSet<ClassId> = HashSet::new();
        seen.insert(class);
        let mut cursor = self.classes[class.index()].parent;
        while let Some(current) = cursor {
            if !seen.insert(current) {
                log::warn!("cycle detected in ancestor chain of `{}`", self.class_name(class));
                break;
            }
            chain.push(current);
            cursor = self.classes[current.index()].parent;
        }
        chain
    }

    /// Exact-class match, or (recursively) ancestor match.
    pub fn class_is_a(&self, class: ClassId, ancestor: ClassId, recursive: bool) -> bool {
        if class == ancestor {
            return true;
        }
        if !recursive {
            return false;
        }
        self.super_chain(class).contains(&ancestor)
    }

    /// `IsA` over an arbitrary value: true only for live instance references
    /// whose class matches.
    pub fn is_a(&self, value: &Value, class: ClassId, recursive: bool) -> bool {
        match value {
            Value::Instance(addr) => self.class_is_a(addr.class, class, recursive),
            _ => false,
        }
    }

    /// Direct children only.
    pub fn child_classes(&self, class: ClassId) -> &[ClassId] {
        &self.classes[class.index()].children
    }

    // Instance enumeration

    /// Live instances of one class, ordered by id.
    pub fn all(&self, class: ClassId) -> Vec<InstanceAddr> {
        let mut ids: Vec<InstanceId> = self.classes[class.index()].instances.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(|id| InstanceAddr::new(class, id)).collect()
    }

    pub fn count(&self, class: ClassId) -> usize {
        self.classes[class.index()].count()
    }

    pub fn instance_by_id(&self, class: ClassId, id: InstanceId) -> Option<InstanceAddr> {
        self.classes[class.index()]
            .instances
            .contains_key(&id)
            .then(|| InstanceAddr::new(class, id))
    }

    /// Live instances of the class and, recursively, of every descendant
    /// class, depth-first.
    pub fn all_instances_deep(&self, class: ClassId) -> Vec<InstanceAddr> {
        let mut out = self.all(class);
        for child in self.classes[class.index()].children.clone() {
            out.extend(self.all_instances_deep(child));
        }
        out
    }

    // Hooks

    pub fn set_hook(&mut self, class: ClassId, slot: HookSlot, hook: ScriptFn) {
        self.classes[class.index()].hooks.set(slot, hook);
    }

    pub fn hook(&self, class: ClassId, slot: HookSlot) -> Option<ScriptFn> {
        self.classes[class.index()].hooks.get(slot).cloned()
    }

    /// Invokes an operator hook on a live instance, prepending the instance
    /// reference to the arguments. `None` when the class has no hook in that
    /// slot.
    pub fn invoke_hook(
        &mut self,
        addr: InstanceAddr,
        slot: HookSlot,
        args: &[Value],
    ) -> Option<HookOutcome> {
        let hook = self.hook(addr.class, slot)?;
        let mut full_args = Vec::with_capacity(args.len() + 1);
        full_args.push(Value::Instance(addr));
        full_args.extend_from_slice(args);
        Some(hook.call(self, &full_args))
    }

    // Instance plumbing shared by the lifecycle/value/bridge modules

    pub(crate) fn instance(&self, addr: InstanceAddr) -> Option<&Instance> {
        self.classes[addr.class.index()].instances.get(&addr.id)
    }

    pub(crate) fn instance_mut(&mut self, addr: InstanceAddr) -> Option<&mut Instance> {
        self.classes[addr.class.index()].instances.get_mut(&addr.id)
    }

    /// A live, not-yet-invalidated instance. Instances mid-teardown still
    /// count as live here; writes are rejected separately.
    pub fn is_valid(&self, addr: InstanceAddr) -> bool {
        self.instance(addr).is_some()
    }

    pub fn is_being_destroyed(&self, addr: InstanceAddr) -> bool {
        self.instance(addr).map(|i| i.being_destroyed).unwrap_or(false)
    }

    // Local event bus

    pub fn subscribe(&mut self, target: EventTarget, event: &str, callback: ScriptFn) {
        match target {
            EventTarget::Class(class) => {
                self.classes[class.index()].events.subscribe(event, callback);
            }
            EventTarget::Instance(addr) => {
                if let Some(instance) = self.instance_mut(addr) {
                    instance.events.subscribe(event, callback);
                }
            }
        }
    }

    pub fn unsubscribe(&mut self, target: EventTarget, event: &str, callback: Option<&ScriptFn>) {
        match target {
            EventTarget::Class(class) => {
                self.classes[class.index()].events.unsubscribe(event, callback);
            }
            EventTarget::Instance(addr) => {
                if let Some(instance) = self.instance_mut(addr) {
                    instance.events.unsubscribe(event, callback);
                }
            }
        }
    }

    /// Synchronous dispatch. The subscriber list is snapshotted before the
    /// first invocation; callbacks returning `Detach` are unsubscribed once
    /// the dispatch completes.
    pub fn emit(&mut self, target: EventTarget, event: &str, args: &[Value]) {
        let snapshot = match target {
            EventTarget::Class(class) => self.classes[class.index()].events.snapshot(event),
            EventTarget::Instance(addr) => match self.instance(addr) {
                Some(instance) => instance.events.snapshot(event),
                None => return,
            },
        };

        let mut detached = Vec::new();
        for callback in &snapshot {
            if callback.call(self, args) == HookOutcome::Detach {
                detached.push(callback.clone());
            }
        }
        for callback in detached {
            self.unsubscribe(target, event, Some(&callback));
        }
    }

    /// Fires the same event at class scope, then at instance scope; the
    /// pattern every lifecycle notification follows.
    pub(crate) fn emit_pair(&mut self, addr: InstanceAddr, event: &str, args: &[Value]) {
        self.emit(EventTarget::Class(addr.class), event, args);
        self.emit(EventTarget::Instance(addr), event, args);
    }

    // Outgoing replication queue

    pub(crate) fn push_outgoing(&mut self, sync: OutgoingSync) {
        self.outgoing.push_back(sync);
    }

    /// Drains the recorded replication side effects, in mutation order.
    pub fn take_outgoing(&mut self) -> Vec<OutgoingSync> {
        self.outgoing.drain(..).collect()
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }
}
