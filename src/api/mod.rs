//! Remote API clients
//!
//! [`AndroidPublisherClient`] implements [`crate::core::traits::EditsApi`]
//! over the Android Publisher v3 REST API.

pub mod android_publisher;

pub use android_publisher::AndroidPublisherClient;
