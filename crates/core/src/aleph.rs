//! Transformation functions for Aleph X-Services responses
//!
//! Aleph answers `bor-info` and `bor-auth` with XML documents whose elements
//! are named after the underlying Oracle tables (`z303` patron, `z304`
//! address, `z305` privileges, `z36` loan, `z37` hold, `z31` cash). Every
//! reply may carry an `<error>` element instead of data.

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::ncip::{
    Address, AgencyId, BlockOrTrap, FiscalActionType, NameInformation, RequestStatusType,
    RequestType, UserAddressRoleType, UserPrivilege,
};
use crate::native::{
    to_minor_units, NativeAddress, NativeFiscalAccount, NativeHold, NativeLoan, NativeMoney,
    NativeTransaction, NativeUser,
};
use crate::problem::GatewayError;

// =============================================================================
// Minimal XML tree
// =============================================================================

/// Element node of a parsed X-Services reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed, non-empty text of a direct child
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    /// Text of a grandchild, e.g. `("z303", "z303-id")`
    pub fn nested_text(&self, parent: &str, name: &str) -> Option<&str> {
        self.child(parent).and_then(|p| p.child_text(name))
    }
}

/// Parse an XML document into an element tree rooted at the document element
pub fn parse_xml(xml: &str) -> Result<XmlNode, GatewayError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push(XmlNode {
                    name,
                    ..Default::default()
                });
            }
            Ok(Event::Empty(e)) => {
                let node = XmlNode {
                    name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                    ..Default::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| GatewayError::Parse(format!("XML text error: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| GatewayError::Parse("Unbalanced XML end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GatewayError::Parse(format!("XML Parse Error: {e}"))),
            _ => (),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(GatewayError::Parse("Unexpected end of XML document".to_string()));
    }

    root.ok_or_else(|| GatewayError::Parse("Empty XML document".to_string()))
}

// =============================================================================
// Field helpers
// =============================================================================

/// Parse an Aleph `YYYYMMDD` date; `00000000` and `99999999` mean "no date"
pub fn parse_aleph_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || value == "00000000" || value == "99999999" {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn date_field(node: &XmlNode, name: &str) -> Option<DateTime<Utc>> {
    node.child_text(name).and_then(parse_aleph_date)
}

/// Split "Surname, Given" into its parts
fn parse_name(full: &str) -> NameInformation {
    match full.split_once(',') {
        Some((surname, given)) => NameInformation {
            given_name: Some(given.trim().to_string()).filter(|s| !s.is_empty()),
            surname: Some(surname.trim().to_string()).filter(|s| !s.is_empty()),
            unstructured_personal_user_name: Some(full.trim().to_string()),
        },
        None => NameInformation {
            given_name: None,
            surname: None,
            unstructured_personal_user_name: Some(full.trim().to_string()),
        },
    }
}

fn error_text(root: &XmlNode) -> Option<&str> {
    root.child_text("error")
}

/// X-Server messages that mean the patron itself is unknown
const PATRON_NOT_FOUND: [&str; 3] = [
    "error retrieving patron system key",
    "patron not found",
    "borrower not found",
];

fn is_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();
    PATRON_NOT_FOUND.iter().any(|pattern| lower.contains(pattern))
}

// =============================================================================
// bor-info
// =============================================================================

fn transform_blocks(z303: &XmlNode) -> Vec<BlockOrTrap> {
    (1..=3)
        .filter_map(|n| {
            let code = z303.child_text(&format!("z303-delinq-{n}"))?;
            if code == "00" || code == "0" {
                return None;
            }
            let note = z303
                .child_text(&format!("z303-delinq-n-{n}"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("Delinquency {code}"));
            Some(BlockOrTrap {
                agency_id: None,
                block_or_trap_type: note,
                valid_from_date: None,
                valid_to_date: None,
            })
        })
        .collect()
}

fn transform_addresses(z304: &XmlNode) -> Vec<NativeAddress> {
    let mut addresses = Vec::new();

    // address-1 repeats the patron name
    let lines: Vec<String> = (2..=5)
        .filter_map(|n| z304.child_text(&format!("z304-address-{n}")))
        .map(str::to_string)
        .collect();
    let postal_code = z304.child_text("z304-zip").map(str::to_string);

    if !lines.is_empty() || postal_code.is_some() {
        addresses.push(NativeAddress {
            role: UserAddressRoleType::Home,
            address: Address::Physical {
                lines,
                locality: None,
                postal_code,
                country: None,
            },
        });
    }

    if let Some(email) = z304.child_text("z304-email-address") {
        addresses.push(NativeAddress {
            role: UserAddressRoleType::Notice,
            address: Address::Email(email.to_string()),
        });
    }

    if let Some(phone) = z304.child_text("z304-telephone") {
        addresses.push(NativeAddress {
            role: UserAddressRoleType::Home,
            address: Address::Phone(phone.to_string()),
        });
    }

    addresses
}

fn transform_privileges(root: &XmlNode) -> Vec<UserPrivilege> {
    root.children_named("z305")
        .filter_map(|z305| {
            let status = z305.child_text("z305-bor-status")?;
            Some(UserPrivilege {
                agency_id: z305.child_text("z305-sub-library").map(AgencyId::new),
                agency_user_privilege_type: status.to_string(),
                valid_from_date: date_field(z305, "z305-registration-date"),
                valid_to_date: date_field(z305, "z305-expiry-date"),
                user_privilege_description: z305.child_text("z305-bor-type").map(str::to_string),
            })
        })
        .collect()
}

fn transform_loans(root: &XmlNode) -> Vec<NativeLoan> {
    root.children_named("item-l")
        .filter_map(|entry| {
            let z36 = entry.child("z36")?;
            let item_id = entry
                .nested_text("z30", "z30-barcode")
                .or_else(|| z36.child_text("z36-rec-key"))?;
            Some(NativeLoan {
                item_id: item_id.to_string(),
                title: entry.nested_text("z13", "z13-title").map(str::to_string),
                due_date: date_field(z36, "z36-due-date"),
                checkout_date: date_field(z36, "z36-loan-date"),
                reminder_level: z36
                    .child_text("z36-letter-number")
                    .and_then(|n| n.parse::<u32>().ok()),
                fine: None,
            })
        })
        .collect()
}

fn hold_status(code: Option<&str>) -> RequestStatusType {
    match code {
        Some("S") => RequestStatusType::AvailableForPickup,
        _ => RequestStatusType::InProcess,
    }
}

fn transform_holds(root: &XmlNode) -> Vec<NativeHold> {
    root.children_named("item-h")
        .filter_map(|entry| {
            let z37 = entry.child("z37")?;
            let request_key: String = ["z37-doc-number", "z37-item-sequence", "z37-request-sequence"]
                .iter()
                .filter_map(|name| z37.child_text(name))
                .collect();
            Some(NativeHold {
                request_id: Some(request_key).filter(|k| !k.is_empty()),
                item_id: entry.nested_text("z30", "z30-barcode").map(str::to_string),
                bibliographic_id: entry.nested_text("z13", "z13-doc-number").map(str::to_string),
                title: entry.nested_text("z13", "z13-title").map(str::to_string),
                request_type: RequestType::Hold,
                status: hold_status(z37.child_text("z37-status")),
                date_placed: date_field(z37, "z37-open-date"),
                pickup_location: z37.child_text("z37-pickup-location").map(str::to_string),
                pickup_expiry_date: date_field(z37, "z37-end-hold-date"),
                queue_position: z37
                    .child_text("z37-hold-sequence")
                    .and_then(|n| n.parse::<u32>().ok()),
            })
        })
        .collect()
}

fn amount(value: &str, minor_unit: u32) -> Result<i64, GatewayError> {
    to_minor_units(value, minor_unit)
        .map(i64::abs)
        .ok_or_else(|| GatewayError::Parse(format!("Invalid Aleph amount: {value}")))
}

fn transform_fiscal_account(
    root: &XmlNode,
    minor_unit: u32,
) -> Result<NativeFiscalAccount, GatewayError> {
    let balance = match root.child_text("balance") {
        Some(b) => {
            let value = amount(b, minor_unit)?;
            // D(ebit) means the patron owes the library
            let signed = match root.child_text("sign") {
                Some("D") => -value,
                _ => value,
            };
            Some(NativeMoney::new(signed))
        }
        None => None,
    };

    let mut transactions = Vec::new();
    for fine in root.children_named("fine") {
        let Some(z31) = fine.child("z31") else {
            continue;
        };
        let Some(sum) = z31.child_text("z31-sum") else {
            continue;
        };
        let action = match z31.child_text("z31-credit-debit") {
            Some("C") => FiscalActionType::Pay,
            _ => FiscalActionType::Assess,
        };
        transactions.push(NativeTransaction {
            action,
            transaction_type: z31.child_text("z31-type").map(str::to_string),
            amount: NativeMoney::new(amount(sum, minor_unit)?),
            description: z31
                .child_text("z31-description")
                .or_else(|| fine.nested_text("z13", "z13-title"))
                .map(str::to_string),
            accrual_date: date_field(z31, "z31-date"),
            item_id: fine.nested_text("z30", "z30-barcode").map(str::to_string),
        });
    }

    Ok(NativeFiscalAccount {
        balance,
        transactions,
    })
}

/// Transform a `bor-info` reply into a native patron record
///
/// Returns `Ok(None)` when Aleph reports that the patron does not exist.
pub fn transform_bor_info(xml: &str, minor_unit: u32) -> Result<Option<NativeUser>, GatewayError> {
    let root = parse_xml(xml)?;

    if let Some(message) = error_text(&root) {
        if is_not_found(message) {
            return Ok(None);
        }
        return Err(GatewayError::Backend {
            code: "bor-info".to_string(),
            message: message.to_string(),
        });
    }

    let z303 = root
        .child("z303")
        .ok_or_else(|| GatewayError::Parse("bor-info reply has no z303 record".to_string()))?;
    let id = z303
        .child_text("z303-id")
        .ok_or_else(|| GatewayError::Parse("z303 record has no z303-id".to_string()))?;

    Ok(Some(NativeUser {
        id: id.to_string(),
        fiscal_accounts: Some(vec![transform_fiscal_account(&root, minor_unit)?]),
        loans: Some(transform_loans(&root)),
        holds: Some(transform_holds(&root)),
        blocks: Some(transform_blocks(z303)),
        name: z303.child_text("z303-name").map(parse_name),
        addresses: root.child("z304").map(transform_addresses),
        alternate_ids: None,
        privileges: Some(transform_privileges(&root)),
    }))
}

// =============================================================================
// bor-auth
// =============================================================================

/// Extract the verified patron id from a `bor-auth` reply
pub fn transform_bor_auth(xml: &str) -> Result<String, GatewayError> {
    let root = parse_xml(xml)?;

    if let Some(message) = error_text(&root) {
        let lower = message.to_lowercase();
        if lower.contains("verification") || is_not_found(message) {
            return Err(GatewayError::InvalidCredentials(message.to_string()));
        }
        return Err(GatewayError::Backend {
            code: "bor-auth".to_string(),
            message: message.to_string(),
        });
    }

    root.nested_text("z303", "z303-id")
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Parse("bor-auth reply has no z303-id".to_string()))
}
