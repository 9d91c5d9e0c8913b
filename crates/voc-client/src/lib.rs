//! Volvo On Call Client Library
//!
//! Provides a typed HTTP client for the Volvo On Call customer API, including
//! remote commands that run asynchronously on the vendor backend.
//!
//! # Example
//!
//! ```rust,no_run
//! use voc_client::{ClientConfig, RemoteCommand, VocClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VocClient::new(ClientConfig::default())?
//!         .authenticate("driver@example.com", "secret");
//!
//!     // Verify the credential and list linked vehicles
//!     let account = client.login().await?;
//!     let vehicle = client.vehicle_by_relation(account.account_vehicle_relations[0]).await?;
//!
//!     // Ask the car for fresh status; resolves once the server confirms it
//!     client.submit(&vehicle, RemoteCommand::UpdateStatus).await?;
//!     let status = client.vehicle_status(&vehicle.id).await?;
//!     println!("locked: {:?}", status.car_locked);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Remote operations
//!
//! [`OperationOrchestrator`] sends a command, then polls the operation until
//! the server reports a terminal state. Concurrent submissions for the same
//! vehicle share one operation. Polling is bounded by
//! [`PollPolicy::timeout`] and can be cancelled with
//! [`OperationOrchestrator::cancel`].
//!
//! # Testing
//!
//! The `testing` module serves an axum router as a stand-in for the vendor
//! API and provides a [`testing::RecordingSleeper`] so polling runs without
//! real delays:
//!
//! ```rust,ignore
//! use voc_client::testing::{RecordingSleeper, TestServer};
//!
//! let server = TestServer::start(mock_router).await?;
//! let client = VocClient::with_sleeper(server.config(), Arc::new(RecordingSleeper::new()))?
//!     .authenticate("user", "pass");
//! ```

mod client;
pub mod config;
mod error;
pub mod operation;
pub mod session;
pub mod sleep;
pub mod testing;
mod types;

pub use client::VocClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{Result, VocError};
pub use operation::{OperationOrchestrator, PollPolicy};
pub use session::{Credential, Session};
pub use sleep::{Sleeper, TokioSleeper};
pub use types::*;
