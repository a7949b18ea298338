mod authenticate;
mod authorize;

pub use authenticate::{AuthnOutcome, Authenticator, BindFailure};
pub use authorize::{AccessRequirement, AuthorizationEvaluator, AuthzDecision, parse_requirements};
