//! Property tests for section selection and response assembly.

use ncip_core::assemble::{assemble_lookup_user, AssemblyConfig};
use ncip_core::native::{to_minor_units, NativeLoan, NativeUser};
use ncip_core::ncip::{
    LookupUserInitiationData, LookupUserResponseData, RequestElementType, UserId,
};
use ncip_core::selector::{select_request_elements, UserSections};
use proptest::prelude::*;

// Strategy: Generate arbitrary desired flags
fn arb_initiation() -> impl Strategy<Value = LookupUserInitiationData> {
    prop::collection::vec(any::<bool>(), 8).prop_map(|flags| LookupUserInitiationData {
        user_fiscal_account_desired: flags[0],
        loaned_items_desired: flags[1],
        requested_items_desired: flags[2],
        block_or_trap_desired: flags[3],
        name_information_desired: flags[4],
        user_address_information_desired: flags[5],
        user_id_desired: flags[6],
        user_privilege_desired: flags[7],
        ..Default::default()
    })
}

// Strategy: Generate a patron record with some loans and ids
fn arb_user() -> impl Strategy<Value = NativeUser> {
    (
        prop::string::string_regex("[0-9]{1,8}").unwrap(),
        prop::option::of(prop::collection::vec(
            prop::string::string_regex("B[0-9]{3,6}").unwrap(),
            0..4,
        )),
        prop::option::of(prop::collection::vec(
            prop::string::string_regex("[A-Z0-9]{4,8}").unwrap(),
            0..3,
        )),
    )
        .prop_map(|(id, loans, alternate_ids)| NativeUser {
            id,
            loans: loans.map(|items| {
                items
                    .into_iter()
                    .map(|item_id| NativeLoan {
                        item_id,
                        ..Default::default()
                    })
                    .collect()
            }),
            alternate_ids,
            ..Default::default()
        })
}

fn arb_element() -> impl Strategy<Value = RequestElementType> {
    prop_oneof![
        Just(RequestElementType::PickupLocation),
        Just(RequestElementType::RequestType),
        Just(RequestElementType::UserId),
        Just(RequestElementType::ShippingInformation),
        Just(RequestElementType::Unrecognized),
    ]
}

proptest! {
    /// Property: a section is present in the response exactly when it was desired
    #[test]
    fn proptest_sections_present_iff_desired(init in arb_initiation(), user in arb_user()) {
        let sections = UserSections::from_initiation(&init);
        let mut response = LookupUserResponseData::default();

        assemble_lookup_user(
            &mut response,
            &user,
            sections,
            &AssemblyConfig::default(),
            &UserId::new(user.id.clone()),
        );

        prop_assert_eq!(response.user_fiscal_accounts.is_some(), init.user_fiscal_account_desired);
        prop_assert_eq!(response.loaned_items.is_some(), init.loaned_items_desired);
        prop_assert_eq!(response.requested_items.is_some(), init.requested_items_desired);

        let bundle_desired = init.block_or_trap_desired
            || init.name_information_desired
            || init.user_address_information_desired
            || init.user_id_desired
            || init.user_privilege_desired;
        prop_assert_eq!(response.user_optional_fields.is_some(), bundle_desired);

        if let Some(fields) = &response.user_optional_fields {
            prop_assert_eq!(fields.blocks_or_traps.is_some(), init.block_or_trap_desired);
            prop_assert_eq!(fields.name_information.is_some(), init.name_information_desired);
            prop_assert_eq!(
                fields.user_address_informations.is_some(),
                init.user_address_information_desired
            );
            prop_assert_eq!(fields.user_ids.is_some(), init.user_id_desired);
            prop_assert_eq!(fields.user_privileges.is_some(), init.user_privilege_desired);
        }
    }

    /// Property: assembling the same record twice yields the same response
    #[test]
    fn proptest_assembly_is_idempotent(init in arb_initiation(), user in arb_user()) {
        let sections = UserSections::from_initiation(&init);
        let config = AssemblyConfig::default();
        let requested = UserId::new(user.id.clone());

        let mut once = LookupUserResponseData::default();
        assemble_lookup_user(&mut once, &user, sections, &config, &requested);

        let mut twice = once.clone();
        assemble_lookup_user(&mut twice, &user, sections, &config, &requested);

        prop_assert_eq!(once, twice);
    }

    /// Property: selected request elements never contain duplicates or unsupported tags
    #[test]
    fn proptest_selected_elements_are_unique_and_supported(
        requested in prop::collection::vec(arb_element(), 0..10)
    ) {
        let unsupported = [RequestElementType::ShippingInformation];
        let selected = select_request_elements(&requested, &unsupported);

        for (index, element) in selected.iter().enumerate() {
            prop_assert!(requested.contains(element));
            prop_assert!(!unsupported.contains(element));
            prop_assert_ne!(*element, RequestElementType::Unrecognized);
            prop_assert!(!selected[index + 1..].contains(element));
        }
    }

    /// Property: whole amounts scale by the minor unit
    #[test]
    fn proptest_whole_amounts_scale(value in -1_000_000i64..1_000_000, minor_unit in 0u32..4) {
        let expected = value * 10_i64.pow(minor_unit);
        prop_assert_eq!(to_minor_units(&value.to_string(), minor_unit), Some(expected));
    }
}
