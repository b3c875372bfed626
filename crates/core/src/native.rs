//! Backend-neutral read models produced by the ILS decoders
//!
//! A section that is `None` means the backend has no data for it at all,
//! as opposed to `Some(vec![])` which is an empty result.

use chrono::{DateTime, Utc};

use crate::ncip::{
    Address, BlockOrTrap, FiscalActionType, NameInformation, RequestStatusType, RequestType,
    ShippingInformation, UserAddressRoleType, UserPrivilege,
};

/// Money as reported by the backend; its currency is never trusted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeMoney {
    /// Value in minor units
    pub value: i64,
    pub currency: Option<String>,
}

impl NativeMoney {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            currency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTransaction {
    pub action: FiscalActionType,
    pub transaction_type: Option<String>,
    pub amount: NativeMoney,
    pub description: Option<String>,
    pub accrual_date: Option<DateTime<Utc>>,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeFiscalAccount {
    pub balance: Option<NativeMoney>,
    pub transactions: Vec<NativeTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeLoan {
    pub item_id: String,
    pub title: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub checkout_date: Option<DateTime<Utc>>,
    pub reminder_level: Option<u32>,
    pub fine: Option<NativeMoney>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeHold {
    pub request_id: Option<String>,
    pub item_id: Option<String>,
    pub bibliographic_id: Option<String>,
    pub title: Option<String>,
    pub request_type: RequestType,
    pub status: RequestStatusType,
    pub date_placed: Option<DateTime<Utc>>,
    pub pickup_location: Option<String>,
    pub pickup_expiry_date: Option<DateTime<Utc>>,
    pub queue_position: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeAddress {
    pub role: UserAddressRoleType,
    pub address: Address,
}

/// A patron record as read from the ILS
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeUser {
    pub id: String,
    pub fiscal_accounts: Option<Vec<NativeFiscalAccount>>,
    pub loans: Option<Vec<NativeLoan>>,
    pub holds: Option<Vec<NativeHold>>,
    pub blocks: Option<Vec<BlockOrTrap>>,
    pub name: Option<NameInformation>,
    pub addresses: Option<Vec<NativeAddress>>,
    pub alternate_ids: Option<Vec<String>>,
    pub privileges: Option<Vec<UserPrivilege>>,
}

/// A hold/request record as read from the ILS
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeRequest {
    pub request_id: String,
    pub item_id: Option<String>,
    pub user_id: Option<String>,
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatusType>,
    pub date_placed: Option<DateTime<Utc>>,
    pub date_available: Option<DateTime<Utc>>,
    pub earliest_date_needed: Option<DateTime<Utc>>,
    pub need_before_date: Option<DateTime<Utc>>,
    pub pickup_date: Option<DateTime<Utc>>,
    pub pickup_expiry_date: Option<DateTime<Utc>>,
    pub pickup_location: Option<String>,
    pub queue_position: Option<u32>,
    pub acknowledged_fee: Option<NativeMoney>,
    pub paid_fee: Option<NativeMoney>,
    pub shipping: Option<ShippingInformation>,
}

/// Largest minor unit whose scale (`10^minor_unit`) fits in an `i64`
pub const MAX_MINOR_UNIT: u32 = 18;

/// Convert a decimal string such as `"7.5"`, `"-7.50"` or `"(7.50)"` into minor units
///
/// Parentheses are accounting notation for a negative value. Extra fraction
/// digits beyond `minor_unit` are truncated. Returns `None` for anything
/// that is not a plain decimal number.
pub fn to_minor_units(decimal: &str, minor_unit: u32) -> Option<i64> {
    let trimmed = decimal.trim();
    let (negative, digits) = if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        (true, inner.trim())
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (true, rest)
    } else {
        (false, trimmed.strip_prefix('+').unwrap_or(trimmed))
    };

    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let scale = 10_i64.checked_pow(minor_unit)?;
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().ok()?
    };

    let mut fraction_digits: String = fraction.chars().take(minor_unit as usize).collect();
    while fraction_digits.len() < minor_unit as usize {
        fraction_digits.push('0');
    }
    let fraction_value = if fraction_digits.is_empty() {
        0
    } else {
        fraction_digits.parse::<i64>().ok()?
    };

    let value = whole_value.checked_mul(scale)?.checked_add(fraction_value)?;
    Some(if negative { -value } else { value })
}
