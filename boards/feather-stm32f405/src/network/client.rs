#![deny(unsafe_code)]
#![deny(warnings)]
//! Network client trait
//!
//! Protocol clients that run one request/response exchange against the
//! embassy-net stack implement `NetworkClient`.

use super::error::NetworkError;

/// Trait for network protocol clients
///
/// Implementors handle their own errors gracefully (log and continue)
/// rather than panicking.
pub trait NetworkClient {
    /// Output type for successful client operation
    type Output;

    /// Run the client operation once
    ///
    /// For periodic operations the caller invokes this on a schedule.
    fn run(
        &mut self,
        stack: &embassy_net::Stack<'static>,
    ) -> impl core::future::Future<Output = Result<Self::Output, NetworkError>>;
}
