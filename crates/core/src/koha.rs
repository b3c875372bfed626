//! Transformation functions for Koha REST API responses

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ncip::{
    Address, AgencyId, BlockOrTrap, FiscalActionType, NameInformation, RequestStatusType,
    RequestType, UserAddressRoleType, UserPrivilege,
};
use crate::native::{
    to_minor_units, NativeAddress, NativeFiscalAccount, NativeHold, NativeLoan, NativeMoney,
    NativeRequest, NativeTransaction, NativeUser,
};
use crate::problem::GatewayError;

// =============================================================================
// API Response Types (Deserialization)
// =============================================================================

/// Patron from `GET /api/v1/patrons/{patron_id}`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct KohaPatron {
    pub patron_id: i64,
    #[serde(default)]
    pub cardnumber: Option<String>,
    #[serde(default)]
    pub userid: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub library_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub date_enrolled: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub restricted: bool,
}

/// Account line of a patron's account
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KohaAccountLine {
    #[serde(default)]
    pub account_line_id: Option<i64>,
    pub amount: serde_json::Number,
    #[serde(default)]
    pub amount_outstanding: Option<serde_json::Number>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub debit_type: Option<String>,
    #[serde(default)]
    pub credit_type: Option<String>,
    #[serde(default)]
    pub item_id: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct KohaAccountLines {
    #[serde(default)]
    pub total: Option<serde_json::Number>,
    #[serde(default)]
    pub lines: Vec<KohaAccountLine>,
}

/// Account summary from `GET /api/v1/patrons/{patron_id}/account`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KohaAccount {
    pub balance: serde_json::Number,
    #[serde(default)]
    pub outstanding_debits: KohaAccountLines,
    #[serde(default)]
    pub outstanding_credits: KohaAccountLines,
}

/// Checkout from `GET /api/v1/checkouts?patron_id=`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KohaCheckout {
    pub checkout_id: i64,
    pub item_id: i64,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub checkout_date: Option<String>,
    #[serde(default)]
    pub renewals_count: Option<u32>,
}

/// Hold from `GET /api/v1/holds`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct KohaHold {
    pub hold_id: i64,
    pub patron_id: i64,
    #[serde(default)]
    pub biblio_id: Option<i64>,
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub pickup_library_id: Option<String>,
    #[serde(default)]
    pub hold_date: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
    #[serde(default)]
    pub waiting_date: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Reply of `POST /api/v1/auth/password/validation`
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KohaPasswordValidation {
    #[serde(default)]
    pub cardnumber: Option<String>,
    pub patron_id: i64,
    #[serde(default)]
    pub userid: Option<String>,
}

/// Error body returned by the Koha REST API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KohaErrorBody {
    pub error: String,
}

// =============================================================================
// Field helpers
// =============================================================================

/// Parse a Koha date (`2024-03-01`) or date-time (RFC 3339)
pub fn parse_koha_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn date(value: &Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().and_then(parse_koha_date)
}

fn money(number: &serde_json::Number, minor_unit: u32) -> Result<NativeMoney, GatewayError> {
    to_minor_units(&number.to_string(), minor_unit)
        .map(NativeMoney::new)
        .ok_or_else(|| GatewayError::Parse(format!("Invalid Koha amount: {number}")))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Transformations
// =============================================================================

fn transform_name(patron: &KohaPatron) -> Option<NameInformation> {
    let given_name = non_empty(&patron.firstname);
    let surname = non_empty(&patron.surname);
    if given_name.is_none() && surname.is_none() {
        return None;
    }
    Some(NameInformation {
        given_name,
        surname,
        unstructured_personal_user_name: None,
    })
}

fn transform_addresses(patron: &KohaPatron) -> Vec<NativeAddress> {
    let mut addresses = Vec::new();

    let lines: Vec<String> = [&patron.address, &patron.address2]
        .into_iter()
        .filter_map(non_empty)
        .collect();
    let locality = non_empty(&patron.city);
    let postal_code = non_empty(&patron.postal_code);
    let country = non_empty(&patron.country);

    if !lines.is_empty() || locality.is_some() || postal_code.is_some() || country.is_some() {
        addresses.push(NativeAddress {
            role: UserAddressRoleType::Home,
            address: Address::Physical {
                lines,
                locality,
                postal_code,
                country,
            },
        });
    }

    if let Some(email) = non_empty(&patron.email) {
        addresses.push(NativeAddress {
            role: UserAddressRoleType::Notice,
            address: Address::Email(email),
        });
    }

    if let Some(phone) = non_empty(&patron.phone) {
        addresses.push(NativeAddress {
            role: UserAddressRoleType::Home,
            address: Address::Phone(phone),
        });
    }

    addresses
}

fn transform_privileges(patron: &KohaPatron) -> Vec<UserPrivilege> {
    non_empty(&patron.category_id)
        .map(|category| UserPrivilege {
            agency_id: non_empty(&patron.library_id).map(AgencyId::new),
            agency_user_privilege_type: category,
            valid_from_date: date(&patron.date_enrolled),
            valid_to_date: date(&patron.expiry_date),
            user_privilege_description: None,
        })
        .into_iter()
        .collect()
}

fn transform_blocks(patron: &KohaPatron) -> Vec<BlockOrTrap> {
    if !patron.restricted {
        return Vec::new();
    }
    vec![BlockOrTrap {
        agency_id: non_empty(&patron.library_id).map(AgencyId::new),
        block_or_trap_type: "Restricted".to_string(),
        valid_from_date: None,
        valid_to_date: None,
    }]
}

fn credit_action(credit_type: Option<&str>) -> FiscalActionType {
    match credit_type {
        Some("WRITEOFF") | Some("FORGIVEN") | Some("CANCELLATION") => FiscalActionType::Waive,
        _ => FiscalActionType::Pay,
    }
}

fn transform_account_line(
    line: &KohaAccountLine,
    action: FiscalActionType,
    minor_unit: u32,
) -> Result<NativeTransaction, GatewayError> {
    let amount = money(&line.amount, minor_unit)?;
    Ok(NativeTransaction {
        action,
        transaction_type: line.debit_type.clone().or_else(|| line.credit_type.clone()),
        amount: NativeMoney::new(amount.value.abs()),
        description: non_empty(&line.description),
        accrual_date: date(&line.date),
        item_id: line.item_id.map(|id| id.to_string()),
    })
}

/// Transform a Koha account summary into a fiscal account
///
/// Koha reports what the patron owes as a positive balance; the native
/// record stores money owed as a negative balance.
pub fn transform_account(
    account: &KohaAccount,
    minor_unit: u32,
) -> Result<NativeFiscalAccount, GatewayError> {
    let balance = money(&account.balance, minor_unit)?;

    let mut transactions = Vec::new();
    for line in &account.outstanding_debits.lines {
        transactions.push(transform_account_line(
            line,
            FiscalActionType::Assess,
            minor_unit,
        )?);
    }
    for line in &account.outstanding_credits.lines {
        transactions.push(transform_account_line(
            line,
            credit_action(line.credit_type.as_deref()),
            minor_unit,
        )?);
    }

    Ok(NativeFiscalAccount {
        balance: Some(NativeMoney::new(-balance.value)),
        transactions,
    })
}

fn transform_checkout(checkout: &KohaCheckout) -> NativeLoan {
    NativeLoan {
        item_id: non_empty(&checkout.external_id).unwrap_or_else(|| checkout.item_id.to_string()),
        title: None,
        due_date: date(&checkout.due_date),
        checkout_date: date(&checkout.checkout_date),
        reminder_level: None,
        fine: None,
    }
}

fn hold_status(hold: &KohaHold) -> RequestStatusType {
    match hold.status.as_deref() {
        Some("W") => RequestStatusType::AvailableForPickup,
        _ => RequestStatusType::InProcess,
    }
}

fn transform_hold(hold: &KohaHold) -> NativeHold {
    let status = hold_status(hold);
    NativeHold {
        request_id: Some(hold.hold_id.to_string()),
        item_id: hold.item_id.map(|id| id.to_string()),
        bibliographic_id: hold.biblio_id.map(|id| id.to_string()),
        title: None,
        request_type: RequestType::Hold,
        status,
        date_placed: date(&hold.hold_date),
        pickup_location: non_empty(&hold.pickup_library_id),
        pickup_expiry_date: if status == RequestStatusType::AvailableForPickup {
            date(&hold.expiration_date)
        } else {
            None
        },
        queue_position: hold.priority,
    }
}

/// Sections fetched from Koha for one patron lookup
///
/// A `None` field was not fetched because its section was not desired.
#[derive(Debug, Clone, Default)]
pub struct KohaPatronBundle {
    pub patron: KohaPatron,
    pub account: Option<KohaAccount>,
    pub checkouts: Option<Vec<KohaCheckout>>,
    pub holds: Option<Vec<KohaHold>>,
}

/// Transform the Koha patron resources into a native patron record
pub fn transform_patron(
    bundle: &KohaPatronBundle,
    minor_unit: u32,
) -> Result<NativeUser, GatewayError> {
    let patron = &bundle.patron;

    let fiscal_accounts = bundle
        .account
        .as_ref()
        .map(|account| transform_account(account, minor_unit).map(|a| vec![a]))
        .transpose()?;

    let alternate_ids: Vec<String> = [&patron.cardnumber, &patron.userid]
        .into_iter()
        .filter_map(non_empty)
        .collect();

    Ok(NativeUser {
        id: patron.patron_id.to_string(),
        fiscal_accounts,
        loans: bundle
            .checkouts
            .as_ref()
            .map(|checkouts| checkouts.iter().map(transform_checkout).collect()),
        holds: bundle
            .holds
            .as_ref()
            .map(|holds| holds.iter().map(transform_hold).collect()),
        blocks: Some(transform_blocks(patron)),
        name: transform_name(patron),
        addresses: Some(transform_addresses(patron)),
        alternate_ids: Some(alternate_ids),
        privileges: Some(transform_privileges(patron)),
    })
}

/// Transform a Koha hold into a native request record
pub fn transform_request(hold: &KohaHold) -> NativeRequest {
    let status = hold_status(hold);
    NativeRequest {
        request_id: hold.hold_id.to_string(),
        item_id: hold.item_id.map(|id| id.to_string()),
        user_id: Some(hold.patron_id.to_string()),
        request_type: Some(RequestType::Hold),
        status: Some(status),
        date_placed: date(&hold.hold_date),
        date_available: date(&hold.waiting_date),
        earliest_date_needed: None,
        need_before_date: date(&hold.expiration_date),
        pickup_date: None,
        pickup_expiry_date: if status == RequestStatusType::AvailableForPickup {
            date(&hold.expiration_date)
        } else {
            None
        },
        pickup_location: non_empty(&hold.pickup_library_id),
        queue_position: hold.priority,
        acknowledged_fee: None,
        paid_fee: None,
        shipping: None,
    }
}

/// Pick the hold record out of a `GET /api/v1/holds` search result
pub fn first_hold(holds: Vec<KohaHold>) -> Option<NativeRequest> {
    holds.first().map(transform_request)
}
