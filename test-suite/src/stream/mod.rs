pub mod client;
pub mod server;

#[cfg(test)]
mod basic;
