pub mod message;
pub mod ticket;
pub mod verdict;
