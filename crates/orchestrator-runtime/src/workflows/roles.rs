//! Role manager contract surface.

use shared_types::{Capability, CapabilityTable, EventDescriptor, Mutability, ParamKind};
use std::sync::LazyLock;

/// `addAdmin(address)`
pub const ADD_ADMIN: &str = "addAdmin";
/// `removeAdmin(address)`
pub const REMOVE_ADMIN: &str = "removeAdmin";
/// `isAdmin(address) -> bool`
pub const IS_ADMIN: &str = "isAdmin";

/// `AdminAdded(account indexed, sender indexed)`
pub const ADMIN_ADDED: &str = "AdminAdded";
/// `AdminRemoved(account indexed, sender indexed)`
pub const ADMIN_REMOVED: &str = "AdminRemoved";

/// The role manager's capability table.
pub static ROLE_MANAGER_ABI: LazyLock<CapabilityTable> = LazyLock::new(|| {
    use Mutability::{Mutating, View};
    use ParamKind::{Address, Bool};

    CapabilityTable::new()
        .with_function(Capability::new(ADD_ADMIN, vec![Address], vec![], Mutating))
        .with_function(Capability::new(REMOVE_ADMIN, vec![Address], vec![], Mutating))
        .with_function(Capability::new(IS_ADMIN, vec![Address], vec![Bool], View))
        .with_event(
            EventDescriptor::new(ADMIN_ADDED)
                .indexed("account", Address)
                .indexed("sender", Address),
        )
        .with_event(
            EventDescriptor::new(ADMIN_REMOVED)
                .indexed("account", Address)
                .indexed("sender", Address),
        )
});
