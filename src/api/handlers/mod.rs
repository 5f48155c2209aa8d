pub mod claims;
pub mod health;
pub mod social;
pub mod widget;
