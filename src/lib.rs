// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Halldyll Pod Manager
//!
//! Lifecycle control for a single `RunPod` GPU pod: create, start, stop,
//! inspect, and wait until it can be reached over SSH.
//!
//! ## Overview
//!
//! Every operation is one GraphQL call to `RunPod`, decoded into typed
//! results. Nothing is cached between calls, so the pod's state on the
//! provider is always the source of truth.
//!
//! ## Modules
//!
//! - [`config`]: Credential resolution, env files and typed settings
//! - [`runpod`]: GraphQL transport, pod controller and reachability wait
//! - [`error`]: Error taxonomy and exit codes
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use halldyll_pod_manager::config::{ConfigSource, ControllerSettings, CredentialResolver};
//! use halldyll_pod_manager::runpod::PodController;
//!
//! # async fn example() -> halldyll_pod_manager::Result<()> {
//! let source = ConfigSource::new().with_process_env();
//! let (credentials, pod_id) = CredentialResolver::new(source.clone()).resolve()?;
//! let settings = ControllerSettings::from_source(&source)?;
//!
//! let controller = PodController::connect(credentials, settings)?;
//! if let Some(endpoint) = controller.ssh_endpoint(&pod_id).await? {
//!     println!("{}", endpoint.ssh_command());
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod runpod;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigSource, ControllerSettings, CredentialResolver, Credentials};
pub use error::{ErrorKind, HalldyllError, Result};
pub use runpod::{
    CreatePodRequest, HttpTransport, PodController, PodStatus, Reachability, SshEndpoint,
    Transport,
};
