//! Request Domain
//!
//! A request asks the company to advance money to an employee. It passes two
//! named approvers before finance pays it out:
//!
//! ```text
//! WAITING -> VALIDATES -> AUTHORIZES -> ACCEPTS -> COMPLETED
//!    \___________\____________\___________\-> DENIED
//! ```
//!
//! Entering ACCEPTS or COMPLETED draws on the requester's ledger balance. The
//! aggregate only records the draw; locking the ledger row and opening the
//! accounting block happen in the lifecycle services.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_request::{Request, Transition};
//!
//! let mut request = Request::new(new_request, ledger_snapshot, now)?;
//! let outcome = request.apply_transition(&validator, Transition::Validate { authorizer_id }, now)?;
//! ```

pub mod request;
pub mod authority;
pub mod transition;
pub mod notification;
pub mod error;

pub use request::{
    Request, NewRequest, RequestStatus, RequestType, PayoutDetails, PixKeyType,
    NotificationRecord, NotificationStatus,
};
pub use authority::{Actor, Role};
pub use transition::{Transition, TransitionOutcome};
pub use notification::{Notice, creation_notice, transition_notice};
pub use error::RequestError;
