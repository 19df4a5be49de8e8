pub mod accounts;
pub mod connectivity;
pub mod events;
pub mod feed;
pub mod tasks;
