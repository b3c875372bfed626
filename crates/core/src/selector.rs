//! Field selection
//!
//! Evaluates the initiation's desired flags once so every connector
//! populates optional sections from the same decision.

use crate::ncip::{LookupUserInitiationData, RequestElementType};

/// Set of optional Lookup User sections the initiator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct UserSections(u16);

impl UserSections {
    pub const FISCAL_ACCOUNTS: Self = Self(1 << 0);
    pub const LOANED_ITEMS: Self = Self(1 << 1);
    pub const REQUESTED_ITEMS: Self = Self(1 << 2);
    pub const BLOCKS_OR_TRAPS: Self = Self(1 << 3);
    pub const NAME_INFORMATION: Self = Self(1 << 4);
    pub const ADDRESSES: Self = Self(1 << 5);
    pub const USER_IDS: Self = Self(1 << 6);
    pub const PRIVILEGES: Self = Self(1 << 7);

    /// The five sections carried in the user optional fields bundle
    pub const OPTIONAL_FIELDS: Self = Self(
        Self::BLOCKS_OR_TRAPS.0
            | Self::NAME_INFORMATION.0
            | Self::ADDRESSES.0
            | Self::USER_IDS.0
            | Self::PRIVILEGES.0,
    );

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// True when at least one bundle section was requested
    pub const fn has_optional_fields(self) -> bool {
        self.0 & Self::OPTIONAL_FIELDS.0 != 0
    }

    /// Read the desired flags of a Lookup User initiation
    pub fn from_initiation(init: &LookupUserInitiationData) -> Self {
        let flags = [
            (init.user_fiscal_account_desired, Self::FISCAL_ACCOUNTS),
            (init.loaned_items_desired, Self::LOANED_ITEMS),
            (init.requested_items_desired, Self::REQUESTED_ITEMS),
            (init.block_or_trap_desired, Self::BLOCKS_OR_TRAPS),
            (init.name_information_desired, Self::NAME_INFORMATION),
            (init.user_address_information_desired, Self::ADDRESSES),
            (init.user_id_desired, Self::USER_IDS),
            (init.user_privilege_desired, Self::PRIVILEGES),
        ];

        flags
            .into_iter()
            .filter(|(desired, _)| *desired)
            .fold(Self::empty(), |sections, (_, section)| sections.union(section))
    }
}

/// Pick the request elements to populate
///
/// Keeps the order of first appearance, drops duplicates, unrecognized tags
/// and the elements the backend advertises as permanently unimplemented.
pub fn select_request_elements(
    requested: &[RequestElementType],
    unsupported: &[RequestElementType],
) -> Vec<RequestElementType> {
    let mut selected: Vec<RequestElementType> = Vec::with_capacity(requested.len());

    for element in requested {
        if *element == RequestElementType::Unrecognized
            || unsupported.contains(element)
            || selected.contains(element)
        {
            continue;
        }
        selected.push(*element);
    }

    selected
}
