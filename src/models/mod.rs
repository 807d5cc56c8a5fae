pub mod account;
pub mod otp_code;
