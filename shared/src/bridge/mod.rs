pub mod dispatch;
pub mod waitlist;
