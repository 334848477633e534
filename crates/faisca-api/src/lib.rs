pub mod chats;
pub mod error;
pub mod likes;
pub mod matches;
pub mod middleware;
pub mod notifications;
pub mod state;
