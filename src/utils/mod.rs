pub mod clock;
pub mod key_lock;
