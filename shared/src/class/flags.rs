use std::{fmt, ops::{BitOr, BitOrAssign}};

/// Bitmask of traits altering a class's allocation, replication and
/// construction rules. Combined with `|` at class-creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassFlags(u16);

impl ClassFlags {
    /// No special behavior
    pub const NONE: ClassFlags = ClassFlags(0);
    /// Instances are observed by every connected player as soon as they spawn
    pub const REPLICATED: ClassFlags = ClassFlags(1 << 0);
    /// Clients allocate from the shared non-negative id pool instead of the
    /// negative client-local space
    pub const SHARED_ID: ClassFlags = ClassFlags(1 << 1);
    /// At most one valid instance at a time; construction returns the
    /// existing one
    pub const SINGLETON: ClassFlags = ClassFlags(1 << 2);
    /// Only the server may construct instances
    pub const SERVER_ONLY: ClassFlags = ClassFlags(1 << 3);
    /// No public construction at all
    pub const ABSTRACT: ClassFlags = ClassFlags(1 << 4);
    /// Instances always allocate from the negative id space and never
    /// replicate
    pub const CLIENT_LOCAL: ClassFlags = ClassFlags(1 << 5);

    pub fn contains(&self, other: ClassFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ClassFlags {
    type Output = ClassFlags;

    fn bitor(self, rhs: ClassFlags) -> ClassFlags {
        ClassFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClassFlags {
    fn bitor_assign(&mut self, rhs: ClassFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ClassFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (ClassFlags::REPLICATED, "Replicated"),
            (ClassFlags::SHARED_ID, "SharedId"),
            (ClassFlags::SINGLETON, "Singleton"),
            (ClassFlags::SERVER_ONLY, "ServerOnly"),
            (ClassFlags::ABSTRACT, "Abstract"),
            (ClassFlags::CLIENT_LOCAL, "ClientLocal"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if first {
            write!(f, "None")?;
        }
        Ok(())
    }
}
