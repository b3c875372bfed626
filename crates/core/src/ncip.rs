//! Canonical NCIP data model
//!
//! Initiation and response messages for the services the connectors
//! implement, plus the building blocks they share (identifiers, money,
//! fiscal accounts, items). Every optional response section is an `Option`
//! and is skipped when serializing, so a section that was not requested is
//! absent while a requested-but-empty section is an empty container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::problem::Problem;

// =============================================================================
// Identifiers
// =============================================================================

/// Agency identifier (ISIL or locally agreed code)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct AgencyId(pub String);

impl AgencyId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// NCIP Version 1 value for identifiers verified by the ILS
pub const INSTITUTION_ID_NUMBER: &str = "Institution Id Number";

/// Patron identifier
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct UserId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_identifier_type: Option<String>,
    pub user_identifier_value: String,
}

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            agency_id: None,
            user_identifier_type: None,
            user_identifier_value: value.into(),
        }
    }
}

/// Item (copy) identifier
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ItemId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    pub item_identifier_value: String,
}

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            agency_id: None,
            item_identifier_value: value.into(),
        }
    }
}

/// Request (hold) identifier
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RequestId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    pub request_identifier_value: String,
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            agency_id: None,
            request_identifier_value: value.into(),
        }
    }
}

/// Returns true when the identifier value is missing or whitespace only
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

// =============================================================================
// Headers
// =============================================================================

/// Routing header of an initiation message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct InitiationHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agency_id: Option<AgencyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agency_id: Option<AgencyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_system_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_system_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agency_authentication: Option<String>,
}

/// Routing header of a response message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ResponseHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_agency_id: Option<AgencyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_agency_id: Option<AgencyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_system_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_system_id: Option<String>,
}

impl ResponseHeader {
    /// Build the response header by swapping the initiation's routing.
    ///
    /// Agency ids are copied only when both ends are known, system ids
    /// likewise. Agency authentication is never echoed back.
    pub fn reverse(initiation: &InitiationHeader) -> Self {
        let mut header = ResponseHeader::default();

        if let (Some(from), Some(to)) = (&initiation.from_agency_id, &initiation.to_agency_id) {
            header.from_agency_id = Some(to.clone());
            header.to_agency_id = Some(from.clone());
        }

        if let (Some(from), Some(to)) = (&initiation.from_system_id, &initiation.to_system_id) {
            header.from_system_id = Some(to.clone());
            header.to_system_id = Some(from.clone());
        }

        header
    }
}

// =============================================================================
// Money
// =============================================================================

/// ISO 4217 currency with the number of digits after the decimal point
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CurrencyCode {
    pub code: String,
    pub minor_unit: u32,
}

impl CurrencyCode {
    pub fn new(code: impl Into<String>, minor_unit: u32) -> Self {
        Self {
            code: code.into(),
            minor_unit,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD", 2)
    }
}

/// Monetary amount expressed in minor units of its currency
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Amount {
    pub currency_code: CurrencyCode,
    pub monetary_value: i64,
}

/// Current balance of a fiscal account
pub type AccountBalance = Amount;

// =============================================================================
// Fiscal accounts
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FiscalActionType {
    Assess,
    Pay,
    Waive,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FiscalTransactionInformation {
    pub fiscal_action_type: FiscalActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_transaction_type: Option<String>,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual_date: Option<DateTime<Utc>>,
    pub fiscal_transaction_information: FiscalTransactionInformation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserFiscalAccount {
    pub account_balance: AccountBalance,
    #[serde(default)]
    pub account_details: Vec<AccountDetails>,
}

// =============================================================================
// Items and requests
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LoanedItem {
    pub item_id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_due: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_checked_out: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Hold,
    Loan,
    Stack,
    Estimate,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RequestScopeType {
    Item,
    Bibliographic,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatusType {
    InProcess,
    AvailableForPickup,
    Cancelled,
    Expired,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RequestedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliographic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub request_type: RequestType,
    pub request_status_type: RequestStatusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_placed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_expiry_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_queue_position: Option<u32>,
}

// =============================================================================
// User optional fields
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BlockOrTrap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    pub block_or_trap_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct NameInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstructured_personal_user_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum UserAddressRoleType {
    Home,
    Mailing,
    Notice,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    Physical {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        lines: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        locality: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        postal_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        country: Option<String>,
    },
    Email(String),
    Phone(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserAddressInformation {
    pub user_address_role_type: UserAddressRoleType,
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserPrivilege {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    pub agency_user_privilege_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_privilege_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct UserOptionalFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks_or_traps: Option<Vec<BlockOrTrap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_information: Option<NameInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_address_informations: Option<Vec<UserAddressInformation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<UserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_privileges: Option<Vec<UserPrivilege>>,
}

// =============================================================================
// Lookup User
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationInputType {
    #[serde(rename = "User Id")]
    UserId,
    #[serde(rename = "Password")]
    Password,
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthenticationInput {
    pub authentication_input_type: AuthenticationInputType,
    pub authentication_input_data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct LookupUserInitiationData {
    #[serde(default)]
    pub initiation_header: Option<InitiationHeader>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub authentication_inputs: Vec<AuthenticationInput>,
    #[serde(default)]
    pub user_fiscal_account_desired: bool,
    #[serde(default)]
    pub loaned_items_desired: bool,
    #[serde(default)]
    pub requested_items_desired: bool,
    #[serde(default)]
    pub block_or_trap_desired: bool,
    #[serde(default)]
    pub name_information_desired: bool,
    #[serde(default)]
    pub user_address_information_desired: bool,
    #[serde(default)]
    pub user_id_desired: bool,
    #[serde(default)]
    pub user_privilege_desired: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct LookupUserResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_header: Option<ResponseHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_fiscal_accounts: Option<Vec<UserFiscalAccount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaned_items: Option<Vec<LoanedItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_items: Option<Vec<RequestedItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_optional_fields: Option<UserOptionalFields>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<Problem>,
}

// =============================================================================
// Lookup Request
// =============================================================================

/// Request elements a Lookup Request initiator may ask for
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestElementType {
    #[serde(rename = "Acknowledged Fee Amount")]
    AcknowledgedFeeAmount,
    #[serde(rename = "Date Available")]
    DateAvailable,
    #[serde(rename = "Date Of User Request")]
    DateOfUserRequest,
    #[serde(rename = "Earliest Date Needed")]
    EarliestDateNeeded,
    #[serde(rename = "Hold Queue Position")]
    HoldQueuePosition,
    #[serde(rename = "Need Before Date")]
    NeedBeforeDate,
    #[serde(rename = "Paid Fee Amount")]
    PaidFeeAmount,
    #[serde(rename = "Pickup Date")]
    PickupDate,
    #[serde(rename = "Pickup Expiry Date")]
    PickupExpiryDate,
    #[serde(rename = "Pickup Location")]
    PickupLocation,
    #[serde(rename = "Request Scope Type")]
    RequestScopeType,
    #[serde(rename = "Request Status Type")]
    RequestStatusType,
    #[serde(rename = "Request Type")]
    RequestType,
    #[serde(rename = "Shipping Information")]
    ShippingInformation,
    #[serde(rename = "User Id")]
    UserId,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ShippingInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct LookupRequestInitiationData {
    #[serde(default)]
    pub initiation_header: Option<InitiationHeader>,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub request_type: Option<RequestType>,
    #[serde(default)]
    pub request_element_types: Vec<RequestElementType>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct LookupRequestResponseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_header: Option<ResponseHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_scope_type: Option<RequestScopeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_status_type: Option<RequestStatusType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_queue_position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_user_request: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_available: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_date_needed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_before_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_expiry_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_fee_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_fee_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_information: Option<ShippingInformation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<Problem>,
}
