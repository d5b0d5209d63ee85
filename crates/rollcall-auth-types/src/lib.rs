//! Auth types shared across Rollcall services.
//!
//! Provides the `IdentityHeaders` extractor for gateway-authenticated callers.

pub mod identity;
