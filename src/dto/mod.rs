pub mod auth;
pub mod catalog;
pub mod inquiries;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
pub mod widgets;
