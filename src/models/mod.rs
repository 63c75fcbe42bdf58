pub mod follow;
pub mod media;
pub mod notification;
pub mod response;
pub mod user;
