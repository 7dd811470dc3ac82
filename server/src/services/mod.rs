//! Service layer: shed allocation, gateway client, staged registration,
//! and webhook reconciliation.

pub mod allocator;
pub mod paystack;
pub mod reconciliation;
pub mod registration;

pub use allocator::{allocate_shed, AllocationError, SHEDS_PER_DOMAIN};
pub use paystack::{GatewayEvent, InitializeData, PaystackClient, VerifyData};
pub use reconciliation::{apply_gateway_event, ReconcileOutcome};
pub use registration::{complete_vendor_registration, StagedRegistration};
