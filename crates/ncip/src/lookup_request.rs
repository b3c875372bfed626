use crate::backend::Connector;
use crate::lookup_user::{format_amount, print_problems};
use crate::prelude::{eprintln, println, *};
use chrono::{DateTime, Utc};
use ncip_core::ncip::{
    ItemId, LookupRequestInitiationData, LookupRequestResponseData, RequestElementType,
    RequestId, RequestType, UserId,
};
use serde::{Deserialize, Serialize};

/// Request elements a command line caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ElementArg {
    AcknowledgedFee,
    DateAvailable,
    DateOfUserRequest,
    EarliestDateNeeded,
    QueuePosition,
    NeedBeforeDate,
    PaidFee,
    PickupDate,
    PickupExpiryDate,
    PickupLocation,
    ScopeType,
    Status,
    RequestType,
    Shipping,
    UserId,
}

impl From<ElementArg> for RequestElementType {
    fn from(arg: ElementArg) -> Self {
        match arg {
            ElementArg::AcknowledgedFee => RequestElementType::AcknowledgedFeeAmount,
            ElementArg::DateAvailable => RequestElementType::DateAvailable,
            ElementArg::DateOfUserRequest => RequestElementType::DateOfUserRequest,
            ElementArg::EarliestDateNeeded => RequestElementType::EarliestDateNeeded,
            ElementArg::QueuePosition => RequestElementType::HoldQueuePosition,
            ElementArg::NeedBeforeDate => RequestElementType::NeedBeforeDate,
            ElementArg::PaidFee => RequestElementType::PaidFeeAmount,
            ElementArg::PickupDate => RequestElementType::PickupDate,
            ElementArg::PickupExpiryDate => RequestElementType::PickupExpiryDate,
            ElementArg::PickupLocation => RequestElementType::PickupLocation,
            ElementArg::ScopeType => RequestElementType::RequestScopeType,
            ElementArg::Status => RequestElementType::RequestStatusType,
            ElementArg::RequestType => RequestElementType::RequestType,
            ElementArg::Shipping => RequestElementType::ShippingInformation,
            ElementArg::UserId => RequestElementType::UserId,
        }
    }
}

const ALL_ELEMENTS: [ElementArg; 15] = [
    ElementArg::AcknowledgedFee,
    ElementArg::DateAvailable,
    ElementArg::DateOfUserRequest,
    ElementArg::EarliestDateNeeded,
    ElementArg::QueuePosition,
    ElementArg::NeedBeforeDate,
    ElementArg::PaidFee,
    ElementArg::PickupDate,
    ElementArg::PickupExpiryDate,
    ElementArg::PickupLocation,
    ElementArg::ScopeType,
    ElementArg::Status,
    ElementArg::RequestType,
    ElementArg::Shipping,
    ElementArg::UserId,
];

/// Options for the lookup-request command
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone, Default)]
pub struct LookupRequestOptions {
    /// Request (hold) identifier
    #[clap(value_name = "REQUEST_ID")]
    pub request_id: Option<String>,

    /// Item identifier, used with --user when the request id is unknown
    #[arg(long)]
    pub item: Option<String>,

    /// User identifier, used with --item when the request id is unknown
    #[arg(long)]
    pub user: Option<String>,

    /// Request element to include (repeatable)
    #[arg(long = "element", short = 'e', value_enum)]
    pub elements: Vec<ElementArg>,

    /// Include every request element
    #[arg(long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LookupRequestOptions {
    pub fn to_initiation(&self) -> LookupRequestInitiationData {
        let elements: &[ElementArg] = if self.all {
            &ALL_ELEMENTS
        } else {
            &self.elements
        };

        LookupRequestInitiationData {
            initiation_header: None,
            request_id: self.request_id.as_ref().map(RequestId::new),
            item_id: self.item.as_ref().map(ItemId::new),
            user_id: self.user.as_ref().map(UserId::new),
            request_type: None,
            request_element_types: elements.iter().copied().map(Into::into).collect(),
        }
    }
}

fn date(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

fn print_request(response: &LookupRequestResponseData) {
    let rows: Vec<(&str, Option<String>)> = vec![
        (
            "Request Id",
            response
                .request_id
                .as_ref()
                .map(|id| id.request_identifier_value.clone()),
        ),
        (
            "Item Id",
            response
                .item_id
                .as_ref()
                .map(|id| id.item_identifier_value.clone()),
        ),
        (
            "User Id",
            response
                .user_id
                .as_ref()
                .map(|id| id.user_identifier_value.clone()),
        ),
        (
            "Request Type",
            response.request_type.map(|t: RequestType| f!("{t:?}")),
        ),
        ("Scope", response.request_scope_type.map(|s| f!("{s:?}"))),
        ("Status", response.request_status_type.map(|s| f!("{s:?}"))),
        (
            "Queue Position",
            response.hold_queue_position.map(|p| p.to_string()),
        ),
        ("Placed", date(&response.date_of_user_request)),
        ("Available", date(&response.date_available)),
        ("Earliest Needed", date(&response.earliest_date_needed)),
        ("Need Before", date(&response.need_before_date)),
        ("Pickup Date", date(&response.pickup_date)),
        ("Pickup Expiry", date(&response.pickup_expiry_date)),
        ("Pickup Location", response.pickup_location.clone()),
        (
            "Acknowledged Fee",
            response.acknowledged_fee_amount.as_ref().map(format_amount),
        ),
        (
            "Paid Fee",
            response.paid_fee_amount.as_ref().map(format_amount),
        ),
    ];

    let rows: Vec<(&str, String)> = rows
        .into_iter()
        .filter_map(|(label, value)| value.map(|value| (label, value)))
        .collect();

    if !rows.is_empty() {
        let mut table = new_table();
        for (label, value) in rows {
            table.add_row(prettytable::row![label, value]);
        }
        table.printstd();
    }

    print_problems(&response.problems);
}

/// Handle the lookup-request command
pub async fn run(options: LookupRequestOptions, global: crate::Global) -> Result<()> {
    let config = global.load_config()?;
    let connector = Connector::from_config(&config)?;

    if global.verbose {
        eprintln!(
            "Looking up request with the {} connector...",
            connector.name()
        );
    }

    let init = options.to_initiation();
    let response = connector
        .lookup_request(&init, &config.assembly_config())
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_request(&response);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_initiation_by_item_and_user() {
        let options = LookupRequestOptions {
            item: Some("300".to_string()),
            user: Some("42".to_string()),
            elements: vec![ElementArg::PickupLocation, ElementArg::QueuePosition],
            ..Default::default()
        };

        let init = options.to_initiation();

        assert_eq!(init.request_id, None);
        assert_eq!(init.item_id, Some(ItemId::new("300")));
        assert_eq!(
            init.request_element_types,
            vec![
                RequestElementType::PickupLocation,
                RequestElementType::HoldQueuePosition
            ]
        );
    }

    #[test]
    fn test_to_initiation_all_elements() {
        let options = LookupRequestOptions {
            request_id: Some("77".to_string()),
            all: true,
            ..Default::default()
        };

        let init = options.to_initiation();

        assert_eq!(init.request_element_types.len(), 15);
        assert!(!init
            .request_element_types
            .contains(&RequestElementType::Unrecognized));
    }
}
