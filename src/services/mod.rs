pub mod mail;
pub mod notify;
pub mod otp;
