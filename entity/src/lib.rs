pub mod activity_event;
pub mod approver;
pub mod document;
pub mod external_signer;
pub mod user;
pub mod user_identity;
pub mod user_role;
pub mod user_secret;
