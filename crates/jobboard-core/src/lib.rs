//! Domain types, rules and trait definitions for the job-board backend.
//!
//! This crate has no HTTP or database dependencies. Storage, mail delivery
//! and session tokens are reached through the [`store::AccountStore`],
//! [`mail::Mailer`] and [`session::SessionIssuer`] traits.

// Native `async fn` / `impl Future` in traits; the store and mailer traits
// spell out their `Send` bounds explicitly.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod mail;
pub mod session;
pub mod steps;
pub mod store;
pub mod trust;
pub mod verification;

pub use error::{Error, Result};
