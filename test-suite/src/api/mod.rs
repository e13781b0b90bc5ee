pub mod client;
pub mod server;
pub mod service;

#[cfg(test)]
mod test_call;
#[cfg(test)]
mod test_concurrent;
