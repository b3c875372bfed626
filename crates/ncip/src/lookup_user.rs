use crate::backend::Connector;
use crate::prelude::{eprintln, println, *};
use color_eyre::owo_colors::OwoColorize;
use ncip_core::ncip::{
    Address, Amount, AuthenticationInput, AuthenticationInputType, InitiationHeader, AgencyId,
    LookupUserInitiationData, LookupUserResponseData, UserId,
};
use ncip_core::problem::Problem;
use serde::{Deserialize, Serialize};

/// Options for the lookup-user command
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone, Default)]
pub struct LookupUserOptions {
    /// Patron identifier; omit it to only verify --auth-user and --auth-password
    #[clap(value_name = "USER_ID")]
    pub user_id: Option<String>,

    /// User Id authentication input
    #[arg(long)]
    pub auth_user: Option<String>,

    /// Password authentication input
    #[arg(long)]
    pub auth_password: Option<String>,

    /// Agency the initiation is addressed to
    #[arg(long)]
    pub to_agency: Option<String>,

    /// Include fiscal accounts
    #[arg(long)]
    pub fiscal: bool,

    /// Include loaned items
    #[arg(long)]
    pub loans: bool,

    /// Include requested items
    #[arg(long)]
    pub requests: bool,

    /// Include blocks and traps
    #[arg(long)]
    pub blocks: bool,

    /// Include name information
    #[arg(long)]
    pub name: bool,

    /// Include address information
    #[arg(long)]
    pub addresses: bool,

    /// Include alternate user ids
    #[arg(long)]
    pub user_ids: bool,

    /// Include user privileges
    #[arg(long)]
    pub privileges: bool,

    /// Include every optional section
    #[arg(long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LookupUserOptions {
    pub fn to_initiation(&self) -> LookupUserInitiationData {
        let mut authentication_inputs = Vec::new();
        if let Some(user) = &self.auth_user {
            authentication_inputs.push(AuthenticationInput {
                authentication_input_type: AuthenticationInputType::UserId,
                authentication_input_data: user.clone(),
            });
        }
        if let Some(password) = &self.auth_password {
            authentication_inputs.push(AuthenticationInput {
                authentication_input_type: AuthenticationInputType::Password,
                authentication_input_data: password.clone(),
            });
        }

        LookupUserInitiationData {
            initiation_header: self.to_agency.as_ref().map(|agency| InitiationHeader {
                to_agency_id: Some(AgencyId::new(agency.clone())),
                ..Default::default()
            }),
            user_id: self.user_id.as_ref().map(UserId::new),
            authentication_inputs,
            user_fiscal_account_desired: self.all || self.fiscal,
            loaned_items_desired: self.all || self.loans,
            requested_items_desired: self.all || self.requests,
            block_or_trap_desired: self.all || self.blocks,
            name_information_desired: self.all || self.name,
            user_address_information_desired: self.all || self.addresses,
            user_id_desired: self.all || self.user_ids,
            user_privilege_desired: self.all || self.privileges,
        }
    }
}

/// Render minor units with the currency's decimal places
pub fn format_amount(amount: &Amount) -> String {
    let minor_unit = amount.currency_code.minor_unit;
    let value = amount.monetary_value;
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs();

    let scale = match 10_u64.checked_pow(minor_unit) {
        Some(scale) if minor_unit > 0 => scale,
        _ => return format!("{sign}{digits} {}", amount.currency_code.code),
    };
    format!(
        "{sign}{}.{:0width$} {}",
        digits / scale,
        digits % scale,
        amount.currency_code.code,
        width = minor_unit as usize
    )
}

fn format_address(address: &Address) -> String {
    match address {
        Address::Physical {
            lines,
            locality,
            postal_code,
            country,
        } => {
            let mut parts: Vec<&str> = lines.iter().map(String::as_str).collect();
            parts.extend(
                [locality, postal_code, country]
                    .into_iter()
                    .flatten()
                    .map(String::as_str),
            );
            parts.join(", ")
        }
        Address::Email(email) => email.clone(),
        Address::Phone(phone) => phone.clone(),
    }
}

pub fn print_problems(problems: &[Problem]) {
    if problems.is_empty() {
        return;
    }

    println!("\n{}", "Problems".bold().red());
    let mut table = new_table();
    table.add_row(prettytable::row![
        "Type".bold().cyan(),
        "Element".bold().cyan(),
        "Value".bold().cyan(),
        "Detail".bold().cyan()
    ]);
    for problem in problems {
        table.add_row(prettytable::row![
            problem.problem_type(),
            problem.element.as_deref().unwrap_or("-"),
            problem.value.as_deref().unwrap_or("-"),
            problem.detail.as_deref().unwrap_or("-")
        ]);
    }
    table.printstd();
}

fn print_user(response: &LookupUserResponseData) {
    if let Some(user_id) = &response.user_id {
        let mut table = new_table();
        table.add_row(prettytable::row!["User Id", user_id.user_identifier_value]);
        if let Some(agency) = &user_id.agency_id {
            table.add_row(prettytable::row!["Agency", agency.as_str()]);
        }
        if let Some(kind) = &user_id.user_identifier_type {
            table.add_row(prettytable::row!["Type", kind]);
        }
        table.printstd();
    }

    if let Some(accounts) = &response.user_fiscal_accounts {
        println!("\n{}", "Fiscal Accounts".bold());
        let mut table = new_table();
        table.add_row(prettytable::row![
            "Action".bold().cyan(),
            "Type".bold().cyan(),
            "Amount".bold().cyan(),
            "Description".bold().cyan()
        ]);
        for account in accounts {
            table.add_row(prettytable::row![
                "Balance".bright_white(),
                "-",
                format_amount(&account.account_balance).bright_yellow(),
                "-"
            ]);
            for detail in &account.account_details {
                let info = &detail.fiscal_transaction_information;
                table.add_row(prettytable::row![
                    f!("{:?}", info.fiscal_action_type),
                    info.fiscal_transaction_type.as_deref().unwrap_or("-"),
                    format_amount(&info.amount),
                    info.description.as_deref().unwrap_or("-")
                ]);
            }
        }
        table.printstd();
    }

    if let Some(loans) = &response.loaned_items {
        println!("\n{} ({})", "Loaned Items".bold(), loans.len());
        let mut table = new_table();
        table.add_row(prettytable::row![
            "Item".bold().cyan(),
            "Title".bold().cyan(),
            "Due".bold().cyan()
        ]);
        for loan in loans {
            table.add_row(prettytable::row![
                loan.item_id.item_identifier_value.green(),
                loan.title.as_deref().unwrap_or("-"),
                loan.date_due
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string())
            ]);
        }
        table.printstd();
    }

    if let Some(requests) = &response.requested_items {
        println!("\n{} ({})", "Requested Items".bold(), requests.len());
        let mut table = new_table();
        table.add_row(prettytable::row![
            "Request".bold().cyan(),
            "Title".bold().cyan(),
            "Status".bold().cyan(),
            "Pickup".bold().cyan()
        ]);
        for request in requests {
            table.add_row(prettytable::row![
                request
                    .request_id
                    .as_ref()
                    .map(|id| id.request_identifier_value.as_str())
                    .unwrap_or("-")
                    .green(),
                request.title.as_deref().unwrap_or("-"),
                f!("{:?}", request.request_status_type),
                request.pickup_location.as_deref().unwrap_or("-")
            ]);
        }
        table.printstd();
    }

    if let Some(fields) = &response.user_optional_fields {
        println!("\n{}", "User Details".bold());
        let mut table = new_table();

        if let Some(name) = &fields.name_information {
            let full = [name.given_name.as_deref(), name.surname.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            table.add_row(prettytable::row!["Name", full]);
        }
        for address in fields.user_address_informations.iter().flatten() {
            table.add_row(prettytable::row![
                f!("Address ({:?})", address.user_address_role_type),
                format_address(&address.address)
            ]);
        }
        for user_id in fields.user_ids.iter().flatten() {
            table.add_row(prettytable::row!["Alternate Id", user_id.user_identifier_value]);
        }
        for privilege in fields.user_privileges.iter().flatten() {
            table.add_row(prettytable::row![
                "Privilege",
                privilege.agency_user_privilege_type
            ]);
        }
        for block in fields.blocks_or_traps.iter().flatten() {
            table.add_row(prettytable::row!["Block", block.block_or_trap_type.red()]);
        }
        table.printstd();
    }

    print_problems(&response.problems);
}

/// Handle the lookup-user command
pub async fn run(options: LookupUserOptions, global: crate::Global) -> Result<()> {
    let config = global.load_config()?;
    let connector = Connector::from_config(&config)?;

    if global.verbose {
        eprintln!("Looking up user with the {} connector...", connector.name());
    }

    let init = options.to_initiation();
    let response = connector
        .lookup_user(&init, &config.assembly_config())
        .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_user(&response);
    }

    Ok(())
}
