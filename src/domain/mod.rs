pub mod conversation;
pub mod events;
pub mod models;
pub mod ports;
pub mod session;
pub mod stream;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;
