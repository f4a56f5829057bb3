pub mod daily_stat;
pub mod message;
pub mod ooo;
pub mod pair;
pub mod user;
