//! API-friendly types.
//!
//! The types in this module are serialised for the frontend: IDs are hex
//! strings, datetimes are RFC 3339 and field names are camelCase.

pub mod candidate;
pub mod mail;
pub mod reply;
pub mod vote;
