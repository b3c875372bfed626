//! Core library for the NCIP connector
//!
//! This crate implements the **Functional Core** of the connector, following
//! the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`ncip_core`** (this crate): NCIP message types and pure transformations with zero I/O
//! - **`ncip`**: Backend gateways, service dispatch and the CLI (the Imperative Shell)
//!
//! Every function in this crate is deterministic and is tested with plain
//! fixture data. Anything that talks to an ILS lives in the shell.
//!
//! # Module Organization
//!
//! - [`ncip`]: Canonical NCIP message types for Lookup User and Lookup Request
//! - [`native`]: Backend-neutral records produced by the ILS decoders
//! - [`selector`]: Which optional sections and request elements to populate
//! - [`assemble`]: Fills response messages from native records
//! - [`problem`]: Gateway errors and the Problem elements they become
//! - [`aleph`]: Decoders for Aleph X-Services XML replies
//! - [`koha`]: Decoders for Koha REST API JSON replies
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use ncip_core::aleph::transform_bor_info;
//! use ncip_core::assemble::{assemble_lookup_user, AssemblyConfig};
//! use ncip_core::selector::UserSections;
//!
//! let sections = UserSections::from_initiation(&initiation);
//! if let Some(user) = transform_bor_info(&xml, 2)? {
//!     assemble_lookup_user(&mut response, &user, sections, &AssemblyConfig::default(), &user_id);
//! }
//! ```

pub mod aleph;
pub mod assemble;
pub mod koha;
pub mod native;
pub mod ncip;
pub mod problem;
pub mod selector;
