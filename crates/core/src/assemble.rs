//! Response assembly
//!
//! Copies native record data into canonical responses, one optional section
//! at a time, as dictated by the field selector. Every amount is stamped with
//! the configured currency; whatever currency the backend reported is dropped.

use crate::ncip::{
    AccountDetails, AgencyId, Amount, CurrencyCode, FiscalTransactionInformation, ItemId,
    LoanedItem, LookupRequestInitiationData, LookupRequestResponseData, LookupUserResponseData,
    RequestElementType, RequestId, RequestScopeType, RequestedItem, UserAddressInformation,
    UserFiscalAccount, UserId, UserOptionalFields,
};
use crate::native::{
    NativeFiscalAccount, NativeHold, NativeLoan, NativeMoney, NativeRequest, NativeUser,
};
use crate::selector::UserSections;

/// Read-only configuration applied while assembling responses
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssemblyConfig {
    pub default_agency_id: AgencyId,
    pub currency: CurrencyCode,
}

/// Rewrite a backend amount with the configured currency
pub fn stamp_amount(money: &NativeMoney, config: &AssemblyConfig) -> Amount {
    Amount {
        currency_code: config.currency.clone(),
        monetary_value: money.value,
    }
}

fn item_id(value: &str, config: &AssemblyConfig) -> ItemId {
    ItemId {
        agency_id: Some(config.default_agency_id.clone()),
        item_identifier_value: value.to_string(),
    }
}

fn request_id(value: &str, config: &AssemblyConfig) -> RequestId {
    RequestId {
        agency_id: Some(config.default_agency_id.clone()),
        request_identifier_value: value.to_string(),
    }
}

fn user_id(value: &str, config: &AssemblyConfig) -> UserId {
    UserId {
        agency_id: Some(config.default_agency_id.clone()),
        user_identifier_type: None,
        user_identifier_value: value.to_string(),
    }
}

fn transform_fiscal_account(
    account: &NativeFiscalAccount,
    config: &AssemblyConfig,
) -> UserFiscalAccount {
    let balance = account
        .balance
        .as_ref()
        .map(|money| stamp_amount(money, config))
        .unwrap_or_else(|| stamp_amount(&NativeMoney::default(), config));

    let account_details = account
        .transactions
        .iter()
        .map(|transaction| AccountDetails {
            accrual_date: transaction.accrual_date,
            fiscal_transaction_information: FiscalTransactionInformation {
                fiscal_action_type: transaction.action,
                fiscal_transaction_type: transaction.transaction_type.clone(),
                amount: stamp_amount(&transaction.amount, config),
                description: transaction.description.clone(),
                item_id: transaction.item_id.as_deref().map(|id| item_id(id, config)),
            },
        })
        .collect();

    UserFiscalAccount {
        account_balance: balance,
        account_details,
    }
}

fn transform_loan(loan: &NativeLoan, config: &AssemblyConfig) -> LoanedItem {
    LoanedItem {
        item_id: item_id(&loan.item_id, config),
        title: loan.title.clone(),
        date_due: loan.due_date,
        date_checked_out: loan.checkout_date,
        reminder_level: loan.reminder_level,
        amount: loan.fine.as_ref().map(|fine| stamp_amount(fine, config)),
    }
}

fn transform_hold(hold: &NativeHold, config: &AssemblyConfig) -> RequestedItem {
    RequestedItem {
        request_id: hold.request_id.as_deref().map(|id| request_id(id, config)),
        item_id: hold.item_id.as_deref().map(|id| item_id(id, config)),
        bibliographic_id: hold.bibliographic_id.clone(),
        title: hold.title.clone(),
        request_type: hold.request_type,
        request_status_type: hold.status,
        date_placed: hold.date_placed,
        pickup_location: hold.pickup_location.clone(),
        pickup_expiry_date: hold.pickup_expiry_date,
        hold_queue_position: hold.queue_position,
    }
}

/// Build the user optional fields bundle, or `None` if no bundle section was desired
fn transform_optional_fields(
    native: &NativeUser,
    sections: UserSections,
    config: &AssemblyConfig,
) -> Option<UserOptionalFields> {
    if !sections.has_optional_fields() {
        return None;
    }

    let mut fields = UserOptionalFields::default();

    if sections.contains(UserSections::BLOCKS_OR_TRAPS) {
        fields.blocks_or_traps = Some(native.blocks.clone().unwrap_or_default());
    }

    if sections.contains(UserSections::NAME_INFORMATION) {
        fields.name_information = Some(native.name.clone().unwrap_or_default());
    }

    if sections.contains(UserSections::ADDRESSES) {
        fields.user_address_informations = Some(
            native
                .addresses
                .iter()
                .flatten()
                .map(|address| UserAddressInformation {
                    user_address_role_type: address.role,
                    address: address.address.clone(),
                })
                .collect(),
        );
    }

    if sections.contains(UserSections::USER_IDS) {
        fields.user_ids = Some(
            native
                .alternate_ids
                .iter()
                .flatten()
                .map(|id| user_id(id, config))
                .collect(),
        );
    }

    if sections.contains(UserSections::PRIVILEGES) {
        fields.user_privileges = Some(native.privileges.clone().unwrap_or_default());
    }

    Some(fields)
}

/// Populate a Lookup User response from a native patron record
///
/// `requested_user_id` is echoed as the response's user id. Sections that
/// were not selected are left untouched; selected sections the backend has
/// no data for become empty containers.
pub fn assemble_lookup_user(
    response: &mut LookupUserResponseData,
    native: &NativeUser,
    sections: UserSections,
    config: &AssemblyConfig,
    requested_user_id: &UserId,
) {
    response.user_id = Some(requested_user_id.clone());

    if sections.contains(UserSections::FISCAL_ACCOUNTS) {
        response.user_fiscal_accounts = Some(
            native
                .fiscal_accounts
                .iter()
                .flatten()
                .map(|account| transform_fiscal_account(account, config))
                .collect(),
        );
    }

    if sections.contains(UserSections::LOANED_ITEMS) {
        response.loaned_items = Some(
            native
                .loans
                .iter()
                .flatten()
                .map(|loan| transform_loan(loan, config))
                .collect(),
        );
    }

    if sections.contains(UserSections::REQUESTED_ITEMS) {
        response.requested_items = Some(
            native
                .holds
                .iter()
                .flatten()
                .map(|hold| transform_hold(hold, config))
                .collect(),
        );
    }

    if let Some(fields) = transform_optional_fields(native, sections, config) {
        response.user_optional_fields = Some(fields);
    }
}

/// Populate a Lookup Request response from a native hold record
///
/// `elements` must already be filtered by
/// [`select_request_elements`](crate::selector::select_request_elements).
pub fn assemble_lookup_request(
    response: &mut LookupRequestResponseData,
    native: &NativeRequest,
    elements: &[RequestElementType],
    init: &LookupRequestInitiationData,
    config: &AssemblyConfig,
) {
    response.request_id = Some(request_id(&native.request_id, config));
    response.item_id = native
        .item_id
        .as_deref()
        .map(|id| item_id(id, config))
        .or_else(|| init.item_id.clone());

    for element in elements {
        match element {
            RequestElementType::AcknowledgedFeeAmount => {
                response.acknowledged_fee_amount = native
                    .acknowledged_fee
                    .as_ref()
                    .map(|fee| stamp_amount(fee, config));
            }
            RequestElementType::DateAvailable => response.date_available = native.date_available,
            RequestElementType::DateOfUserRequest => {
                response.date_of_user_request = native.date_placed;
            }
            RequestElementType::EarliestDateNeeded => {
                response.earliest_date_needed = native.earliest_date_needed;
            }
            RequestElementType::HoldQueuePosition => {
                response.hold_queue_position = native.queue_position;
            }
            RequestElementType::NeedBeforeDate => {
                response.need_before_date = native.need_before_date;
            }
            RequestElementType::PaidFeeAmount => {
                response.paid_fee_amount =
                    native.paid_fee.as_ref().map(|fee| stamp_amount(fee, config));
            }
            RequestElementType::PickupDate => response.pickup_date = native.pickup_date,
            RequestElementType::PickupExpiryDate => {
                response.pickup_expiry_date = native.pickup_expiry_date;
            }
            RequestElementType::PickupLocation => {
                response.pickup_location = native.pickup_location.clone();
            }
            RequestElementType::RequestScopeType => {
                response.request_scope_type = Some(RequestScopeType::Item);
            }
            RequestElementType::RequestStatusType => {
                response.request_status_type = native.status;
            }
            RequestElementType::RequestType => {
                response.request_type = init.request_type.or(native.request_type);
            }
            RequestElementType::ShippingInformation => {
                response.shipping_information = native.shipping.clone();
            }
            RequestElementType::UserId => {
                response.user_id = native
                    .user_id
                    .as_deref()
                    .map(|id| user_id(id, config))
                    .or_else(|| init.user_id.clone());
            }
            RequestElementType::Unrecognized => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ncip::{
        Address, BlockOrTrap, FiscalActionType, NameInformation, RequestStatusType, RequestType,
        UserAddressRoleType,
    };
    use crate::native::{NativeAddress, NativeTransaction};
    use chrono::{TimeZone, Utc};

    fn config() -> AssemblyConfig {
        AssemblyConfig {
            default_agency_id: AgencyId::new("MAIN"),
            currency: CurrencyCode::new("USD", 2),
        }
    }

    fn create_native_user() -> NativeUser {
        NativeUser {
            id: "0001".to_string(),
            fiscal_accounts: Some(vec![NativeFiscalAccount {
                balance: Some(NativeMoney {
                    value: -750,
                    currency: Some("CZK".to_string()),
                }),
                transactions: vec![NativeTransaction {
                    action: FiscalActionType::Assess,
                    transaction_type: Some("Overdue Penalty".to_string()),
                    amount: NativeMoney {
                        value: 750,
                        currency: Some("EUR".to_string()),
                    },
                    description: Some("Late return".to_string()),
                    accrual_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
                    item_id: Some("B100".to_string()),
                }],
            }]),
            loans: Some(vec![NativeLoan {
                item_id: "B200".to_string(),
                title: Some("Dune".to_string()),
                due_date: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
                checkout_date: None,
                reminder_level: Some(1),
                fine: Some(NativeMoney {
                    value: 100,
                    currency: Some("GBP".to_string()),
                }),
            }]),
            holds: Some(vec![NativeHold {
                request_id: Some("H1".to_string()),
                item_id: None,
                bibliographic_id: Some("987".to_string()),
                title: Some("Emma".to_string()),
                request_type: RequestType::Hold,
                status: RequestStatusType::InProcess,
                date_placed: None,
                pickup_location: Some("CENTRAL".to_string()),
                pickup_expiry_date: None,
                queue_position: Some(2),
            }]),
            blocks: Some(vec![BlockOrTrap {
                agency_id: None,
                block_or_trap_type: "Debarred".to_string(),
                valid_from_date: None,
                valid_to_date: None,
            }]),
            name: Some(NameInformation {
                given_name: Some("Ada".to_string()),
                surname: Some("Lovelace".to_string()),
                unstructured_personal_user_name: None,
            }),
            addresses: Some(vec![NativeAddress {
                role: UserAddressRoleType::Home,
                address: Address::Email("ada@example.org".to_string()),
            }]),
            alternate_ids: Some(vec!["ADA01".to_string()]),
            privileges: None,
        }
    }

    // ============================================================================
    // assemble_lookup_user tests
    // ============================================================================

    #[test]
    fn test_assemble_lookup_user_nothing_desired() {
        let mut response = LookupUserResponseData::default();
        let requested = UserId::new("0001");

        assemble_lookup_user(
            &mut response,
            &create_native_user(),
            UserSections::empty(),
            &config(),
            &requested,
        );

        assert_eq!(response.user_id, Some(requested));
        assert_eq!(response.user_fiscal_accounts, None);
        assert_eq!(response.loaned_items, None);
        assert_eq!(response.requested_items, None);
        assert_eq!(response.user_optional_fields, None);
    }

    #[test]
    fn test_assemble_lookup_user_stamps_configured_currency() {
        let mut response = LookupUserResponseData::default();

        assemble_lookup_user(
            &mut response,
            &create_native_user(),
            UserSections::FISCAL_ACCOUNTS.union(UserSections::LOANED_ITEMS),
            &config(),
            &UserId::new("0001"),
        );

        let accounts = response.user_fiscal_accounts.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_balance.currency_code, CurrencyCode::new("USD", 2));
        assert_eq!(accounts[0].account_balance.monetary_value, -750);

        let details = &accounts[0].account_details[0];
        assert_eq!(
            details.fiscal_transaction_information.amount,
            Amount {
                currency_code: CurrencyCode::new("USD", 2),
                monetary_value: 750,
            }
        );
        assert_eq!(
            details.fiscal_transaction_information.item_id,
            Some(ItemId {
                agency_id: Some(AgencyId::new("MAIN")),
                item_identifier_value: "B100".to_string(),
            })
        );

        let loans = response.loaned_items.unwrap();
        assert_eq!(
            loans[0].amount.as_ref().map(|a| a.currency_code.code.as_str()),
            Some("USD")
        );
        assert_eq!(loans[0].title.as_deref(), Some("Dune"));
    }

    #[test]
    fn test_assemble_lookup_user_missing_balance_becomes_zero() {
        let native = NativeUser {
            fiscal_accounts: Some(vec![NativeFiscalAccount::default()]),
            ..Default::default()
        };
        let mut response = LookupUserResponseData::default();

        assemble_lookup_user(
            &mut response,
            &native,
            UserSections::FISCAL_ACCOUNTS,
            &config(),
            &UserId::new("0001"),
        );

        let accounts = response.user_fiscal_accounts.unwrap();
        assert_eq!(accounts[0].account_balance.monetary_value, 0);
        assert_eq!(accounts[0].account_balance.currency_code.code, "USD");
    }

    #[test]
    fn test_assemble_lookup_user_unsupported_section_is_empty_container() {
        let native = NativeUser {
            id: "0001".to_string(),
            ..Default::default()
        };
        let mut response = LookupUserResponseData::default();

        assemble_lookup_user(
            &mut response,
            &native,
            UserSections::REQUESTED_ITEMS.union(UserSections::NAME_INFORMATION),
            &config(),
            &UserId::new("0001"),
        );

        assert_eq!(response.requested_items, Some(Vec::new()));
        let fields = response.user_optional_fields.unwrap();
        assert_eq!(fields.name_information, Some(NameInformation::default()));
        assert_eq!(fields.blocks_or_traps, None);
        assert!(response.problems.is_empty());
    }

    #[test]
    fn test_assemble_lookup_user_optional_fields_bundle() {
        let mut response = LookupUserResponseData::default();
        let sections = UserSections::BLOCKS_OR_TRAPS
            .union(UserSections::ADDRESSES)
            .union(UserSections::USER_IDS)
            .union(UserSections::PRIVILEGES);

        assemble_lookup_user(
            &mut response,
            &create_native_user(),
            sections,
            &config(),
            &UserId::new("0001"),
        );

        let fields = response.user_optional_fields.unwrap();
        assert_eq!(fields.blocks_or_traps.unwrap()[0].block_or_trap_type, "Debarred");
        assert_eq!(fields.name_information, None);
        assert_eq!(
            fields.user_address_informations.unwrap()[0].address,
            Address::Email("ada@example.org".to_string())
        );
        assert_eq!(fields.user_ids.unwrap()[0].user_identifier_value, "ADA01");
        assert_eq!(fields.user_privileges, Some(Vec::new()));
    }

    #[test]
    fn test_assemble_lookup_user_requested_items() {
        let mut response = LookupUserResponseData::default();

        assemble_lookup_user(
            &mut response,
            &create_native_user(),
            UserSections::REQUESTED_ITEMS,
            &config(),
            &UserId::new("0001"),
        );

        let items = response.requested_items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].request_id.as_ref().map(|r| r.request_identifier_value.as_str()),
            Some("H1")
        );
        assert_eq!(items[0].hold_queue_position, Some(2));
        assert_eq!(items[0].item_id, None);
    }

    #[test]
    fn test_assemble_lookup_user_is_deterministic() {
        let native = create_native_user();
        let sections = UserSections::FISCAL_ACCOUNTS.union(UserSections::OPTIONAL_FIELDS);
        let mut first = LookupUserResponseData::default();
        let mut second = LookupUserResponseData::default();

        assemble_lookup_user(&mut first, &native, sections, &config(), &UserId::new("0001"));
        assemble_lookup_user(&mut second, &native, sections, &config(), &UserId::new("0001"));

        assert_eq!(first, second);
    }

    // ============================================================================
    // assemble_lookup_request tests
    // ============================================================================

    fn create_native_request() -> NativeRequest {
        NativeRequest {
            request_id: "77".to_string(),
            item_id: Some("B300".to_string()),
            user_id: Some("0001".to_string()),
            request_type: Some(RequestType::Hold),
            status: Some(RequestStatusType::AvailableForPickup),
            date_placed: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            pickup_location: Some("CENTRAL".to_string()),
            queue_position: Some(0),
            paid_fee: Some(NativeMoney {
                value: 200,
                currency: Some("EUR".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_assemble_lookup_request_always_sets_identifiers() {
        let mut response = LookupRequestResponseData::default();

        assemble_lookup_request(
            &mut response,
            &create_native_request(),
            &[],
            &LookupRequestInitiationData::default(),
            &config(),
        );

        assert_eq!(
            response.request_id.map(|r| r.request_identifier_value),
            Some("77".to_string())
        );
        assert_eq!(
            response.item_id.map(|i| i.item_identifier_value),
            Some("B300".to_string())
        );
        assert_eq!(response.user_id, None);
        assert_eq!(response.pickup_location, None);
    }

    #[test]
    fn test_assemble_lookup_request_elements() {
        let mut response = LookupRequestResponseData::default();
        let init = LookupRequestInitiationData {
            request_type: Some(RequestType::Loan),
            ..Default::default()
        };

        assemble_lookup_request(
            &mut response,
            &create_native_request(),
            &[
                RequestElementType::PickupLocation,
                RequestElementType::RequestScopeType,
                RequestElementType::RequestType,
                RequestElementType::RequestStatusType,
                RequestElementType::DateOfUserRequest,
                RequestElementType::PaidFeeAmount,
                RequestElementType::UserId,
                RequestElementType::PickupDate,
            ],
            &init,
            &config(),
        );

        assert_eq!(response.pickup_location.as_deref(), Some("CENTRAL"));
        assert_eq!(response.request_scope_type, Some(RequestScopeType::Item));
        assert_eq!(response.request_type, Some(RequestType::Loan));
        assert_eq!(
            response.request_status_type,
            Some(RequestStatusType::AvailableForPickup)
        );
        assert_eq!(
            response.date_of_user_request,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            response.paid_fee_amount,
            Some(Amount {
                currency_code: CurrencyCode::new("USD", 2),
                monetary_value: 200,
            })
        );
        assert_eq!(
            response.user_id.map(|u| u.user_identifier_value),
            Some("0001".to_string())
        );
        assert_eq!(response.pickup_date, None);
        assert_eq!(response.hold_queue_position, None);
    }

    #[test]
    fn test_assemble_lookup_request_falls_back_to_initiation() {
        let native = NativeRequest {
            request_id: "77".to_string(),
            ..Default::default()
        };
        let init = LookupRequestInitiationData {
            item_id: Some(ItemId::new("B300")),
            user_id: Some(UserId::new("0001")),
            ..Default::default()
        };
        let mut response = LookupRequestResponseData::default();

        assemble_lookup_request(
            &mut response,
            &native,
            &[RequestElementType::UserId, RequestElementType::RequestType],
            &init,
            &config(),
        );

        assert_eq!(response.item_id, Some(ItemId::new("B300")));
        assert_eq!(response.user_id, Some(UserId::new("0001")));
        assert_eq!(response.request_type, None);
    }
}
