//! This crate implements the core of a calendar feed for the Ogrodje event timeline.
//! The server and the CLI are thin wrappers around it.
//!
//! The events are read from <https://goo.ogrodje.si/timeline>, kept in a short-lived cache and
//! rendered as an iCalendar document.

pub mod cache;
pub mod calendar;
pub mod error;
pub mod event;
pub mod logging;
pub mod source;
