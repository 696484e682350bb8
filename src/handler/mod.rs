pub mod admin;
pub mod auth;
pub mod bookings;
pub mod bookmarks;
pub mod chat;
pub mod companies;
pub mod complaints;
pub mod services;
pub mod upload;
pub mod users;
