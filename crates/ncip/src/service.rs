//! Lookup User and Lookup Request service operations
//!
//! Each operation validates the initiation, makes exactly one gateway call,
//! assembles the response and reports every failure as a problem on the
//! response. Nothing here returns an error.

use crate::backend::{LookupRequestBackend, LookupUserBackend, RequestLookup};
use ncip_core::assemble::{assemble_lookup_request, assemble_lookup_user, AssemblyConfig};
use ncip_core::ncip::{
    is_blank, AuthenticationInputType, LookupRequestInitiationData, LookupRequestResponseData,
    LookupUserInitiationData, LookupUserResponseData, ResponseHeader, UserId,
    INSTITUTION_ID_NUMBER,
};
use ncip_core::problem::{element, report, Problem, ProblemCause};
use ncip_core::selector::{select_request_elements, UserSections};

fn non_blank(value: Option<&str>) -> Option<&str> {
    if is_blank(value) {
        None
    } else {
        value.map(str::trim)
    }
}

fn authentication_input(
    init: &LookupUserInitiationData,
    input_type: AuthenticationInputType,
) -> Option<&str> {
    init.authentication_inputs
        .iter()
        .filter(|input| input.authentication_input_type == input_type)
        .find_map(|input| non_blank(Some(input.authentication_input_data.as_str())))
}

fn missing(element: &str, description: &str) -> Problem {
    report(&ProblemCause::MissingField {
        element,
        description,
    })
}

/// Look up a patron, or only verify their credentials
///
/// A non-blank user id selects the full record lookup and any
/// authentication inputs are ignored. Otherwise the `User Id` and
/// `Password` authentication inputs select the authenticate-only path,
/// whose response carries just the verified user id.
pub async fn lookup_user(
    init: &LookupUserInitiationData,
    backend: &dyn LookupUserBackend,
    config: &AssemblyConfig,
) -> LookupUserResponseData {
    let mut response = LookupUserResponseData {
        response_header: init.initiation_header.as_ref().map(ResponseHeader::reverse),
        ..Default::default()
    };

    let direct_id = init
        .user_id
        .as_ref()
        .filter(|id| !is_blank(Some(id.user_identifier_value.as_str())));

    if let Some(user_id) = direct_id {
        let sections = UserSections::from_initiation(init);
        let value = user_id.user_identifier_value.trim();
        log::debug!("{}: fetching user {value}", backend.name());

        // Echo the identifier that was actually looked up
        let requested = UserId {
            user_identifier_value: value.to_string(),
            ..user_id.clone()
        };

        match backend.fetch_user_record(value, sections).await {
            Ok(Some(user)) => {
                assemble_lookup_user(&mut response, &user, sections, config, &requested)
            }
            Ok(None) => response.problems.push(report(&ProblemCause::NotFound {
                element: element::USER_ID,
                value,
            })),
            Err(error) => {
                log::warn!("{}: user lookup failed: {error}", backend.name());
                response.problems.push(Problem::from(&error));
            }
        }

        return response;
    }

    if init.authentication_inputs.is_empty() {
        response.problems.push(missing(
            element::USER_ID,
            "A user id or authentication inputs are required",
        ));
        return response;
    }

    let user = authentication_input(init, AuthenticationInputType::UserId);
    let password = authentication_input(init, AuthenticationInputType::Password);

    let (Some(user), Some(password)) = (user, password) else {
        if user.is_none() {
            response.problems.push(missing(
                element::USER_ID,
                "User Id authentication input is missing",
            ));
        }
        if password.is_none() {
            response.problems.push(missing(
                element::PASSWORD,
                "Password authentication input is missing",
            ));
        }
        return response;
    };

    let agency = init
        .initiation_header
        .as_ref()
        .and_then(|header| header.to_agency_id.clone())
        .unwrap_or_else(|| config.default_agency_id.clone());

    log::debug!("{}: authenticating user {user}", backend.name());

    match backend.authenticate(&agency, user, password).await {
        Ok(verified) => {
            response.user_id = Some(UserId {
                agency_id: Some(agency),
                user_identifier_type: Some(INSTITUTION_ID_NUMBER.to_string()),
                user_identifier_value: verified,
            });
        }
        Err(error) => {
            log::warn!("{}: authentication failed: {error}", backend.name());
            response.problems.push(Problem::from(&error));
        }
    }

    response
}

/// Look up a hold by request id, or by item id and user id
pub async fn lookup_request(
    init: &LookupRequestInitiationData,
    backend: &dyn LookupRequestBackend,
    config: &AssemblyConfig,
) -> LookupRequestResponseData {
    let mut response = LookupRequestResponseData {
        response_header: init.initiation_header.as_ref().map(ResponseHeader::reverse),
        ..Default::default()
    };

    let request_id = non_blank(
        init.request_id
            .as_ref()
            .map(|id| id.request_identifier_value.as_str()),
    );
    let item_id = non_blank(
        init.item_id
            .as_ref()
            .map(|id| id.item_identifier_value.as_str()),
    );
    let user_id = non_blank(
        init.user_id
            .as_ref()
            .map(|id| id.user_identifier_value.as_str()),
    );

    let lookup = match (request_id, item_id, user_id) {
        (Some(request_id), _, _) => RequestLookup::ById(request_id.to_string()),
        (None, Some(item_id), Some(user_id)) => RequestLookup::ByItemAndUser {
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
        },
        (None, item_id, user_id) => {
            let group = match (item_id, user_id) {
                (None, Some(_)) => element::ITEM_ID,
                (Some(_), None) => element::USER_ID,
                _ => element::ITEM_ID_AND_USER_ID,
            };
            response.problems.push(missing(
                element::REQUEST_ID,
                "Request id is missing",
            ));
            response.problems.push(missing(
                group,
                "Item id and user id are required when the request id is missing",
            ));
            return response;
        }
    };

    let elements = select_request_elements(
        &init.request_element_types,
        backend.unsupported_request_elements(),
    );

    log::debug!("{}: fetching request {lookup:?}", backend.name());

    match backend.fetch_request_record(&lookup).await {
        Ok(Some(request)) => {
            assemble_lookup_request(&mut response, &request, &elements, init, config)
        }
        Ok(None) => {
            let problem = match &lookup {
                RequestLookup::ById(id) => report(&ProblemCause::NotFound {
                    element: element::REQUEST_ID,
                    value: id,
                }),
                RequestLookup::ByItemAndUser { item_id, user_id } => {
                    report(&ProblemCause::NotFound {
                        element: element::ITEM_ID_AND_USER_ID,
                        value: &format!("{item_id},{user_id}"),
                    })
                }
            };
            response.problems.push(problem);
        }
        Err(error) => {
            log::warn!("{}: request lookup failed: {error}", backend.name());
            response.problems.push(Problem::from(&error));
        }
    }

    response
}
