//! Runtime boundary for the Kiln harness: the adapter trait the black-box
//! runtime is driven through, the key-rebinding provisioning session, and
//! an in-memory reference runtime for tests and demos.

pub mod adapter;
pub mod embedded;
pub mod session;

pub use adapter::{check_rc, RuntimeAdapter};
pub use embedded::EmbeddedRuntime;
pub use session::{BindingPhase, ProvisioningSession};
