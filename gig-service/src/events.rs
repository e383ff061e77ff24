//! Event contracts shared between feature modules of this service.
//!
//! The kernel owns `user:get-by-id`; everything here is local to the gig
//! marketplace. Payloads are plain ids so a module can dispatch without
//! importing the module that answers.

use serde_json::Value;
use service_core::events::Event;

/// Creates the talent profile of a user that just became a talent. Output
/// is the new profile in camelCase.
pub struct TalentCreate;

impl Event for TalentCreate {
    const NAME: &'static str = "talent:create-talent";
    type Payload = String;
    type Output = Value;
}

/// Talent profile of a user with its rating summary and latest review.
pub struct TalentProfileByUser;

impl Event for TalentProfileByUser {
    const NAME: &'static str = "talent:get-by-user-id";
    type Payload = String;
    type Output = Value;
}

/// The listener socket is bound and serving. Payload is the port.
pub struct AppUp;

impl Event for AppUp {
    const NAME: &'static str = "app:up";
    type Payload = u16;
    type Output = ();
}

/// Every feature module has registered its listeners.
pub struct RegistrationSuccessful;

impl Event for RegistrationSuccessful {
    const NAME: &'static str = "event:registration:successful";
    type Payload = ();
    type Output = ();
}
