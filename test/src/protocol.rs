//! The class hierarchy used by the integration tests. Both sides must
//! register the same classes, in the same shape, before any packets flow.

use mimic_shared::{ClassFlags, ClassId, Registry};

#[derive(Debug, Clone, Copy)]
pub struct Protocol {
    /// Replicated by default: observed-by-all the moment it spawns
    pub person: ClassId,
    /// Server-internal, never replicated unless scoped explicitly
    pub prop: ClassId,
    /// Client-local UI object, negative id space
    pub hud_panel: ClassId,
    /// Replicated singleton session state
    pub session: ClassId,
}

pub fn register_protocol(registry: &mut Registry) -> Protocol {
    let root = registry.root_class();
    Protocol {
        person: registry
            .inherit(root, "Person", ClassFlags::REPLICATED)
            .expect("register Person"),
        prop: registry
            .inherit(root, "Prop", ClassFlags::NONE)
            .expect("register Prop"),
        hud_panel: registry
            .inherit(root, "HudPanel", ClassFlags::CLIENT_LOCAL)
            .expect("register HudPanel"),
        session: registry
            .inherit(root, "Session", ClassFlags::REPLICATED | ClassFlags::SINGLETON)
            .expect("register Session"),
    }
}
