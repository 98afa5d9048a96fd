pub mod insights;
pub mod question;
