pub mod recovery_service;
pub mod sms_service;
