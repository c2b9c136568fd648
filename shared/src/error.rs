use thiserror::Error;

use crate::instance::InstanceId;

/// Errors raised by class-level operations on the registry.
///
/// These are all programmer errors in the calling script: they surface
/// immediately and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    /// A class with this name is already registered
    #[error("class name `{0}` is already registered")]
    DuplicateName(String),

    /// The given parent class id does not exist
    #[error("parent class does not exist")]
    UnknownParent,

    /// Requested flags that cannot be combined
    #[error("flags `{0}` and `{1}` are mutually exclusive")]
    FlagConflict(&'static str, &'static str),
}

/// Errors raised by instance-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    /// Operation on an instance that has been destroyed or never existed
    #[error("instance {class}:{id} is invalid or unknown")]
    Invalid { class: String, id: InstanceId },

    /// Construction attempted on an abstract class
    #[error("class `{0}` is abstract and cannot be instantiated")]
    Abstract(String),

    /// Construction attempted on a server-only class from a client
    #[error("class `{0}` may only be instantiated by the server")]
    ServerOnly(String),

    /// A forced id is already occupied by a live instance
    #[error("id {id} is already live in class `{class}`")]
    IdCollision { class: String, id: InstanceId },

    /// Destroy re-entered while the teardown sequence is running
    #[error("instance {class}:{id} is already being destroyed")]
    AlreadyDestroying { class: String, id: InstanceId },

    /// Value-store keys must be non-empty identifiers
    #[error("value key must be a non-empty string")]
    EmptyKey,

    /// Function values never enter the value store
    #[error("function values cannot be stored or serialized")]
    FunctionValue,

    /// The `id` key was assigned a non-integer value
    #[error("the `id` key must hold an integer")]
    NonIntegerId,
}

/// Errors raised while converting values to their wire representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Function values have no wire representation
    #[error("function values cannot be serialized")]
    FunctionValue,
}
